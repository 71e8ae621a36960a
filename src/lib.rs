mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
    pub mod validation;
    pub mod views;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    #[allow(clippy::module_inception)]
    mod cache;
    pub use self::cache::*;
}
mod export {
    pub mod document;
    pub mod pdf;
}

pub mod config;
pub mod routes;
pub mod state;

pub use authentication::*;
pub use cache::*;
pub use constants::*;
pub use database::*;
pub use export::*;
