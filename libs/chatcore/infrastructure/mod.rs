//! Infrastructure Layer
//!
//! Implementations of external interfaces (REST client, local store,
//! configuration, logging). Depends on the domain layer only.

pub mod api;
pub mod config;
pub mod database;
pub mod logging;

pub use api::{ApiError, ChatApi, RestClient};
pub use config::{ChatConfig, ConfigError};
pub use database::{
    CacheHint, Database, DatabaseError, DatabaseSession, InMemoryDatabase,
};
pub use logging::init_tracing;
