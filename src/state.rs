use std::sync::Arc;

use redis::aio::MultiplexedConnection;

use crate::{
    actions::catalog::{import_catalog, read_catalog_file},
    config::Config,
    error::{CacheError, Error},
    jwt::JwtKeys,
    memory::MemoryStore,
    postgres::PgStore,
    store::Store,
};

/// Everything a request handler needs, shared between requests.
#[derive(Clone)]
pub struct State {
    pub store: Arc<dyn Store>,
    pub keys: Arc<JwtKeys>,
    pub cache: Option<MultiplexedConnection>,
}

impl State {
    pub fn new(store: Arc<dyn Store>, keys: JwtKeys, cache: Option<MultiplexedConnection>) -> Self {
        Self {
            store,
            keys: Arc::new(keys),
            cache,
        }
    }

    /// Connects the store and the optional cache described by `config`, then
    /// imports the catalog seed file when one is configured.
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => {
                log::info!("Connecting to database...");
                Arc::new(PgStore::connect(url, config.database_max_connections).await?)
            }
            None => {
                log::warn!("DATABASE_URL not set, data is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let cache = match &config.redis_url {
            Some(url) => {
                log::info!("Connecting to redis...");
                Some(init_redis(url).await?)
            }
            None => None,
        };

        let keys = JwtKeys::new(&config.jwt_secret, config.jwt_lifetime_hours)?;
        let state = Self::new(store, keys, cache);

        if let Some(path) = &config.catalog_file {
            let catalog = read_catalog_file(path).await?;
            import_catalog(state.store.as_ref(), state.cache.clone(), catalog).await?;
        }

        Ok(state)
    }
}

async fn init_redis(url: &str) -> Result<MultiplexedConnection, Error> {
    let client = redis::Client::open(url).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    Ok(connection)
}
