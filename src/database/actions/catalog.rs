use std::path::Path;

use redis::aio::MultiplexedConnection;
use serde::Deserialize;

use crate::{
    cache::invalidate_catalog_cache,
    error::{Error, ErrorKind, TypeError},
    store::Store,
};

#[derive(Deserialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

/// Seed file for the tag and ingredient catalog.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CatalogFile {
    #[serde(default)]
    pub tags: Vec<TagForm>,
    #[serde(default)]
    pub ingredients: Vec<IngredientForm>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub tags: usize,
    pub ingredients: usize,
    pub skipped: usize,
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub async fn read_catalog_file(path: &Path) -> Result<CatalogFile, Error> {
    let data = tokio::fs::read_to_string(path).await.map_err(|e| {
        ErrorKind::InternalServerError.new(&format!("Failed to read {}: {e}", path.display()))
    })?;

    serde_json::from_str(&data)
        .map_err(|e| TypeError::new(&format!("Malformed catalog file: {e}")).into())
}

/// Inserts the catalog entries that are not present yet. Entries that
/// already exist are skipped, malformed ones abort the import.
pub async fn import_catalog(
    store: &dyn Store,
    cache: Option<MultiplexedConnection>,
    catalog: CatalogFile,
) -> Result<ImportReport, Error> {
    let mut report = ImportReport::default();

    for tag in catalog.tags {
        if !is_hex_color(&tag.color) || !is_slug(&tag.slug) || tag.name.trim().is_empty() {
            return Err(TypeError::new(&format!("Invalid tag '{}'", tag.name)).into());
        }
        match store
            .create_tag(tag.name.trim(), &tag.color.to_uppercase(), &tag.slug)
            .await
        {
            Ok(_) => report.tags += 1,
            Err(e) if e.kind == ErrorKind::AlreadyExists => report.skipped += 1,
            Err(e) => return Err(e),
        }
    }

    for ingredient in catalog.ingredients {
        if ingredient.name.trim().is_empty() || ingredient.measurement_unit.trim().is_empty() {
            return Err(TypeError::new(&format!("Invalid ingredient '{}'", ingredient.name)).into());
        }
        match store
            .create_ingredient(ingredient.name.trim(), ingredient.measurement_unit.trim())
            .await
        {
            Ok(_) => report.ingredients += 1,
            Err(e) if e.kind == ErrorKind::AlreadyExists => report.skipped += 1,
            Err(e) => return Err(e),
        }
    }

    if let Some(mut cache) = cache {
        if let Err(e) = invalidate_catalog_cache(&mut cache).await {
            log::error!("Failed to invalidate catalog cache: {e}");
        }
    }

    log::info!(
        "Imported {} tags and {} ingredients ({} skipped)",
        report.tags,
        report.ingredients,
        report.skipped
    );

    Ok(report)
}
