use crate::{
    actions::shopping_list::ShoppingListItem,
    constants::{SHOPPING_LIST_LINES_PER_PAGE, SHOPPING_LIST_TITLE},
    error::Error,
};

use super::pdf::{self, TextLine};

const TITLE_Y: f32 = 770.0;
const TITLE_SIZE: f32 = 24.0;
const FIRST_LINE_Y: f32 = 700.0;
const LINE_SPACING: f32 = 25.0;
const LINE_SIZE: f32 = 16.0;
const LINE_X: f32 = 60.0;

/// Numbered shopping list split into pages. The title opens the first page
/// only.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingListDocument {
    pub title: String,
    pub pages: Vec<Vec<String>>,
}

pub fn format_line(position: usize, item: &ShoppingListItem) -> String {
    format!(
        "{position}. {} - {} {}",
        item.name, item.amount, item.measurement_unit
    )
}

impl ShoppingListDocument {
    pub fn new(items: &[ShoppingListItem]) -> Self {
        let lines: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, item)| format_line(i + 1, item))
            .collect();

        let mut pages: Vec<Vec<String>> = lines
            .chunks(SHOPPING_LIST_LINES_PER_PAGE)
            .map(<[String]>::to_vec)
            .collect();
        if pages.is_empty() {
            pages.push(vec![]);
        }

        Self {
            title: SHOPPING_LIST_TITLE.to_string(),
            pages,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.pages.iter().flatten()
    }

    /// Plain text rendition, pages separated by a form feed.
    pub fn to_text(&self) -> String {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let mut text = String::new();
                if i == 0 {
                    text.push_str(&self.title);
                    text.push_str("\n\n");
                }
                for line in page {
                    text.push_str(line);
                    text.push('\n');
                }
                text
            })
            .collect::<Vec<String>>()
            .join("\x0c")
    }

    pub fn to_pdf(&self) -> Result<Vec<u8>, Error> {
        let pages: Vec<Vec<TextLine>> = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let mut lines = Vec::with_capacity(page.len() + 1);
                if i == 0 {
                    lines.push(TextLine::centered(TITLE_Y, TITLE_SIZE, &self.title));
                }
                lines.extend(page.iter().enumerate().map(|(row, line)| TextLine {
                    x: LINE_X,
                    y: FIRST_LINE_Y - row as f32 * LINE_SPACING,
                    size: LINE_SIZE,
                    text: line.to_owned(),
                }));
                lines
            })
            .collect();

        pdf::render(&pages)
    }
}

#[cfg(test)]
mod tests {
    use printpdf::lopdf::Document;

    use super::*;

    fn items(count: usize) -> Vec<ShoppingListItem> {
        (0..count)
            .map(|i| ShoppingListItem {
                name: format!("Item {i}"),
                measurement_unit: String::from("g"),
                amount: i as i64 + 1,
            })
            .collect()
    }

    fn page_count(pdf: &[u8]) -> usize {
        Document::load_mem(pdf).unwrap().get_pages().len()
    }

    #[test]
    fn line_format() {
        let item = ShoppingListItem {
            name: String::from("Salt"),
            measurement_unit: String::from("g"),
            amount: 5,
        };
        assert_eq!(format_line(1, &item), "1. Salt - 5 g");
    }

    #[test]
    fn empty_list_has_a_title_page() {
        let document = ShoppingListDocument::new(&[]);
        assert_eq!(document.pages, vec![Vec::<String>::new()]);
        assert_eq!(document.to_text(), "Shopping list\n\n");

        let pdf = document.to_pdf().unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn pages_hold_26_lines() {
        let document = ShoppingListDocument::new(&items(27));
        assert_eq!(document.pages.len(), 2);
        assert_eq!(document.pages[0].len(), 26);
        assert_eq!(document.pages[1], vec![String::from("27. Item 26 - 27 g")]);

        let text = document.to_text();
        assert_eq!(text.matches('\x0c').count(), 1);
        assert_eq!(text.matches("Shopping list").count(), 1);

        assert_eq!(page_count(&document.to_pdf().unwrap()), 2);
    }

    #[test]
    fn cyrillic_names_are_kept() {
        let items = [("соль", "г", 5), ("сода", "ч. л.", 1)].map(|(name, unit, amount)| {
            ShoppingListItem {
                name: String::from(name),
                measurement_unit: String::from(unit),
                amount,
            }
        });
        let document = ShoppingListDocument::new(&items);

        let lines: Vec<&String> = document.lines().collect();
        assert_eq!(lines, ["1. соль - 5 г", "2. сода - 1 ч. л."]);
        assert!(document.to_text().contains("2. сода - 1 ч. л.\n"));

        let face = ttf_parser::Face::parse(pdf::FONT, 0).unwrap();
        for line in &lines {
            assert!(line.chars().all(|c| face.glyph_index(c).is_some()), "{line}");
        }

        let pdf = document.to_pdf().unwrap();
        assert_eq!(page_count(&pdf), 1);
    }
}
