//! Data models for the MySQL provider.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod schema;

pub use connection::PoolStatus;
pub use query::{QueryResult, Row};
pub use schema::{CREATE_TABLE_UNAVAILABLE, SchemaMap};
