use redis::aio::MultiplexedConnection;

use crate::{
    cache::{CacheEntry, CacheKeyType},
    error::{Error, ErrorKind},
    schema::{Tag, Uuid},
    store::Store,
};

pub async fn list_tags(
    store: &dyn Store,
    cache: Option<MultiplexedConnection>,
) -> Result<Vec<Tag>, Error> {
    let Some(mut cache) = cache else {
        return store.list_tags().await;
    };

    match CacheEntry::get_or(CacheKeyType::Tags.new("all"), &mut cache, || store.list_tags()).await
    {
        Ok(tags) => Ok(tags),
        Err(e) => {
            log::error!("Tag cache unavailable: {e}");
            store.list_tags().await
        }
    }
}

pub async fn get_tag(store: &dyn Store, id: Uuid) -> Result<Tag, Error> {
    store
        .get_tag(id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("Tag not found"))
}
