//! Schema introspection data models.

use std::collections::BTreeMap;

/// Placeholder stored for a table whose creation statement could not be read.
pub const CREATE_TABLE_UNAVAILABLE: &str = "Could not retrieve CREATE TABLE statement.";

/// Table name to its `CREATE TABLE` statement (or [`CREATE_TABLE_UNAVAILABLE`]).
pub type SchemaMap = BTreeMap<String, String>;
