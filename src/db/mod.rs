//! Database access layer.
//!
//! This module provides the MySQL provider and its building blocks:
//! - Connection pool construction
//! - SQL execution and result normalization
//! - Schema introspection
//! - Type mappings
//! - The write guard for read-only providers

pub mod guard;
pub mod pool;
pub mod provider;
pub mod schema;
pub mod types;

pub use guard::{StatementKind, check_write_permission, classify_sql};
pub use provider::MySqlProvider;
