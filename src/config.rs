use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::{
    constants::DEFAULT_JWT_LIFETIME_HOURS,
    error::{Error, ErrorKind},
};

const DEFAULT_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_JWT_SECRET: &str = "foodgram-insecure-development-secret";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    /// Without a database the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_lifetime_hours: i64,
    /// Tag and ingredient seed file imported on startup.
    pub catalog_file: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env`
    /// when one exists.
    pub fn load() -> Result<Self, Error> {
        if dotenv::dotenv().is_ok() {
            log::info!("Loaded environment from .env");
        }

        Ok(Self {
            addr: try_load("FOODGRAM_ADDR", DEFAULT_ADDR)?,
            database_url: optional("DATABASE_URL"),
            database_max_connections: try_load(
                "DATABASE_MAX_CONNECTIONS",
                &DEFAULT_MAX_CONNECTIONS.to_string(),
            )?,
            redis_url: optional("REDIS_URL"),
            jwt_secret: optional("JWT_SECRET").unwrap_or_else(|| {
                log::warn!("JWT_SECRET not set, using an insecure development secret");
                DEFAULT_JWT_SECRET.to_string()
            }),
            jwt_lifetime_hours: try_load(
                "JWT_LIFETIME_HOURS",
                &DEFAULT_JWT_LIFETIME_HOURS.to_string(),
            )?,
            catalog_file: optional("FOODGRAM_CATALOG").map(PathBuf::from),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, Error>
where
    T::Err: Display,
{
    optional(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| ErrorKind::InternalServerError.new(&format!("Invalid {key} value: {e}")))
}
