use redis::aio::MultiplexedConnection;

use crate::{
    cache::{CacheEntry, CacheKeyType},
    error::{Error, ErrorKind},
    schema::{Ingredient, Uuid},
    store::Store,
};

/// Catalog ingredients ordered by name, optionally narrowed to names
/// starting with `name` (case-insensitive).
pub async fn list_ingredients(
    store: &dyn Store,
    cache: Option<MultiplexedConnection>,
    name: Option<&str>,
) -> Result<Vec<Ingredient>, Error> {
    let name = name.map(str::trim).filter(|name| !name.is_empty());

    let Some(mut cache) = cache else {
        return store.list_ingredients(name).await;
    };

    let key = CacheKeyType::Ingredients.new(name.unwrap_or("").to_lowercase());
    match CacheEntry::get_or(key, &mut cache, || store.list_ingredients(name)).await {
        Ok(ingredients) => Ok(ingredients),
        Err(e) => {
            log::error!("Ingredient cache unavailable: {e}");
            store.list_ingredients(name).await
        }
    }
}

pub async fn get_ingredient(store: &dyn Store, id: Uuid) -> Result<Ingredient, Error> {
    store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("Ingredient not found"))
}
