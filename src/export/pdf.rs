//! Lines of text laid out on US Letter pages with printpdf. Text is drawn
//! with an embedded DejaVu Sans so any script the font covers survives.

use printpdf::{Mm, PdfDocument, Pt};

use crate::error::Error;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

pub const FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const DOCUMENT_TITLE: &str = "Foodgram";
const LAYER: &str = "Text";

/// A line of text placed at `(x, y)` in points from the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

impl TextLine {
    /// Horizontally centred on the page, assuming an average glyph width of
    /// roughly half an em.
    pub fn centered(y: f32, size: f32, text: &str) -> Self {
        let width = text.chars().count() as f32 * size * 0.5;
        Self {
            x: ((PAGE_WIDTH - width) / 2.0).max(0.0),
            y,
            size,
            text: text.to_string(),
        }
    }
}

fn mm(points: f32) -> Mm {
    Pt(points).into()
}

/// Renders one PDF page per entry of `pages`.
pub fn render(pages: &[Vec<TextLine>]) -> Result<Vec<u8>, Error> {
    let (document, first_page, first_layer) =
        PdfDocument::new(DOCUMENT_TITLE, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
    let font = document.add_external_font(FONT)?;

    for (i, lines) in pages.iter().enumerate() {
        let (page, layer) = match i {
            0 => (first_page, first_layer),
            _ => document.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER),
        };
        let layer = document.get_page(page).get_layer(layer);
        for line in lines {
            layer.use_text(line.text.as_str(), line.size, mm(line.x), mm(line.y), &font);
        }
    }

    Ok(document.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use printpdf::lopdf::{content::Content, Document, Object};

    use super::*;

    /// Glyph runs drawn on each page, as two-byte glyph ids.
    fn glyph_runs(pdf: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let document = Document::load_mem(pdf).unwrap();
        document
            .get_pages()
            .into_values()
            .map(|page| {
                let content = document.get_page_content(page).unwrap();
                Content::decode(&content)
                    .unwrap()
                    .operations
                    .into_iter()
                    .filter(|operation| operation.operator == "Tj")
                    .filter_map(|operation| match operation.operands.first() {
                        Some(Object::String(bytes, _)) => Some(bytes.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn page_count_matches() {
        let pdf = render(&[vec![], vec![], vec![]]).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(Document::load_mem(&pdf).unwrap().get_pages().len(), 3);
    }

    #[test]
    fn font_is_embedded_as_unicode() {
        let pdf = render(&[vec![TextLine::centered(770.0, 24.0, "Title")]]).unwrap();
        let document = Document::load_mem(&pdf).unwrap();

        let encodings: Vec<&[u8]> = document
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .filter_map(|dict| dict.get(b"Encoding").ok())
            .filter_map(|encoding| encoding.as_name().ok())
            .collect();
        assert!(encodings.contains(&b"Identity-H".as_slice()));
    }

    #[test]
    fn cyrillic_text_keeps_every_glyph() {
        let lines = ["Соль", "Сода", "Смесь «Ёжик» №5"];
        let pdf = render(&[lines
            .iter()
            .enumerate()
            .map(|(i, text)| TextLine {
                x: 60.0,
                y: 700.0 - i as f32 * 25.0,
                size: 16.0,
                text: text.to_string(),
            })
            .collect()])
        .unwrap();

        let runs = glyph_runs(&pdf);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), lines.len());
        for (run, text) in runs[0].iter().zip(lines) {
            assert_eq!(run.len(), 2 * text.chars().count(), "{text}");
            assert!(run.chunks(2).all(|id| id != [0, 0]), "{text}");
        }
        assert_ne!(runs[0][0], runs[0][1]);
    }
}
