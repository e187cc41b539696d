//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One result row: column name to decoded value, in column order.
pub type Row = serde_json::Map<String, JsonValue>;

/// Normalized result of executing one SQL statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Column names in the order reported by the server.
    pub fields: Vec<String>,
    /// Only set for statements that return no result set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in the first row, if any.
    pub fn first_value(&self, column: &str) -> Option<&JsonValue> {
        self.rows.first().and_then(|row| row.get(column))
    }
}
