//! MySQL Database Provider Library
//!
//! This library exposes a MySQL database behind a small provider interface:
//! pooled SQL execution with normalized results, schema introspection, and
//! registration into a host-owned registry driven by configuration.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;

pub use config::{DatabasesConfig, ProviderConfig};
pub use db::MySqlProvider;
pub use error::{DbError, DbResult};
pub use models::{QueryResult, SchemaMap};
pub use registry::{DatabaseProvider, ProviderRegistry, register_mysql_providers, spawn_registration};
