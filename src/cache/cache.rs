use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CacheError, Error};

const CATALOG_CACHE_KEY: &str = "catalog-cache-key";

// Caching - keys

#[derive(Clone, Debug)]
pub struct CacheKey {
    value: String,
    r#type: CacheKeyType,
}

impl CacheKey {
    pub fn from<T: ToString>(r#type: CacheKeyType, key: T) -> Self {
        Self {
            value: key.to_string(),
            r#type,
        }
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match &self.r#type {
            CacheKeyType::Tags | CacheKeyType::Ingredients => CacheLifetime::BindCatalogCache,
            CacheKeyType::Custom(value) => CacheLifetime::Custom(value.to_owned()),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.r#type {
            CacheKeyType::Tags => write!(f, "tags-{}", self.value),
            CacheKeyType::Ingredients => write!(f, "ingredients-{}", self.value),
            CacheKeyType::Custom(_) => write!(f, "{}", self.value),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheLifetime {
    Infinite,
    Custom(String),
    /// Valid until the catalog generation changes, see
    /// [`invalidate_catalog_cache`].
    BindCatalogCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::Infinite => Ok(None),
            CacheLifetime::BindCatalogCache => {
                get_cache_value::<&str, String>(CATALOG_CACHE_KEY, cache).await
            }
            CacheLifetime::Custom(value) => Ok(Some(value.to_owned())),
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: &Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        if self != lifetime {
            log::error!("Found conflicting bindings");
            return Ok(false);
        }
        match self {
            CacheLifetime::Custom(value) => Ok(bind.as_deref() == Some(value.as_str())),
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }
}

/// JSON payload stored under a cache key, tagged with the binding it was
/// stored under.
#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    lifetime: CacheLifetime,
    bind: Option<String>,
}

impl CacheEntry {
    async fn new<T: Serialize>(
        value: &T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, Error> {
        let bind = lifetime.get_cache_bind(cache).await?;
        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::new(format!("Failed to serialize value: {e}")))?;

        Ok(Self {
            value,
            lifetime,
            bind,
        })
    }

    async fn validate(&self, key: &CacheKey, cache: &mut MultiplexedConnection) -> Result<bool, Error> {
        self.lifetime
            .validate_cache_bind(&self.bind, &key.lifetime(), cache)
            .await
    }

    /// Returns the cached value under `key` when it is still bound to the
    /// current generation, otherwise runs `callback` and caches its result.
    pub async fn get_or<T, F, Fut>(
        key: CacheKey,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let entry = match get_cache_value::<String, CacheEntry>(key.to_string(), cache).await {
            Ok(entry) => entry,
            Err(_) => {
                log::error!("> Failed to deserialize cached value. Deleting {key}");
                if let Err(e) = delete_cache_value(key.to_string(), cache).await {
                    log::error!("> Failed to delete cached value! {e}");
                }
                None
            }
        };

        // * Cannot use .map(|| {...}) due to async closures
        if let Some(entry) = entry {
            log::trace!("> Found {key}");
            if entry.validate(&key, cache).await? {
                if let Ok(value) = serde_json::from_value::<T>(entry.value) {
                    return Ok(value);
                }
                log::error!("> Cached value of {key} has an unexpected shape");
            } else {
                log::trace!("> Invalidated {key}");
            }
        }

        log::trace!("> Fetching {key}");
        let value = callback().await?;
        let entry = CacheEntry::new(&value, key.lifetime(), cache).await?;
        if let Err(e) = set_cache_value(key.to_string(), entry, cache).await {
            log::error!("{e:?}");
        }

        Ok(value)
    }
}

/// Starts a new catalog generation; every value bound to the previous one
/// is refetched on next access.
pub async fn invalidate_catalog_cache(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    let generation = uuid::Uuid::new_v4().to_string();
    log::info!("Catalog cache generation is now {generation}");
    set_cache_value(CATALOG_CACHE_KEY, generation, cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names() {
        assert_eq!(CacheKeyType::Tags.new("all").to_string(), "tags-all");
        assert_eq!(
            CacheKeyType::Ingredients.new("sal").to_string(),
            "ingredients-sal"
        );
        assert_eq!(
            CacheKeyType::Custom(String::from("x")).new("raw").to_string(),
            "raw"
        );
    }

    #[test]
    fn catalog_keys_bind_to_the_catalog_generation() {
        assert_eq!(
            CacheKeyType::Tags.new("all").lifetime(),
            CacheLifetime::BindCatalogCache
        );
        assert_eq!(
            CacheKeyType::Custom(String::from("v1")).new("raw").lifetime(),
            CacheLifetime::Custom(String::from("v1"))
        );
    }
}
