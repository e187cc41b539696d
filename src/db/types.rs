//! MySQL type mappings.
//!
//! Converts driver rows into JSON maps in two phases:
//! 1. `TypeCategory` classifies the column's MySQL type name
//! 2. A per-category decoder extracts the value
//!
//! Values that cannot be decoded into their category fall back to text, and
//! finally to `null`, so a single odd column never fails a whole query.

use crate::models::Row as JsonRow;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlColumn, MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Text,
    Binary,
    Json,
    Unknown,
}

/// Classify a MySQL type name (as reported by the driver) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();
    // "INT UNSIGNED" -> "int"
    let base = lower.split_whitespace().next().unwrap_or_default();

    match base {
        "decimal" | "numeric" => TypeCategory::Decimal,
        "boolean" | "bool" => TypeCategory::Boolean,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" | "bit" => {
            TypeCategory::Integer
        }
        "float" | "double" | "real" => TypeCategory::Float,
        "date" | "time" | "datetime" | "timestamp" => TypeCategory::Temporal,
        "json" => TypeCategory::Json,
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
            TypeCategory::Binary
        }
        "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "enum" | "set" => {
            TypeCategory::Text
        }
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Custom Decode Types
// =============================================================================

/// Wrapper type for raw DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Encode binary data as a base64 JSON string.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    JsonValue::String(STANDARD.encode(bytes))
}

// =============================================================================
// Row to JSON
// =============================================================================

/// Conversion of driver rows into ordered JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
    fn column_names(&self) -> Vec<String>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> JsonRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let value = decode_column(self, idx, categorize_type(type_name));
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        column_names(self.columns())
    }
}

/// Names of the given columns, in order.
pub fn column_names(columns: &[MySqlColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

// =============================================================================
// Decoders
// =============================================================================

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Temporal => decode_temporal(row, idx),
        TypeCategory::Binary => decode_binary(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx),
    }
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::warn!(column = idx, error = %e, "DECIMAL not decodable as text");
            decode_text(row, idx)
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
    // Signed and unsigned columns are distinct types to the driver.
    match row.try_get::<Option<i64>, _>(idx) {
        Ok(Some(v)) => JsonValue::Number(v.into()),
        Ok(None) => JsonValue::Null,
        Err(_) => match row.try_get::<Option<u64>, _>(idx) {
            Ok(Some(v)) => JsonValue::Number(v.into()),
            Ok(None) => JsonValue::Null,
            Err(_) => decode_text(row, idx),
        },
    }
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<bool>, _>(idx) {
        Ok(Some(v)) => JsonValue::Bool(v),
        Ok(None) => JsonValue::Null,
        Err(_) => decode_integer(row, idx),
    }
}

fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<f64>, _>(idx) {
        // NaN and infinities have no JSON number form.
        Ok(Some(v)) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        Ok(None) => JsonValue::Null,
        Err(_) => decode_text(row, idx),
    }
}

/// Format a DATETIME value without inventing a UTC offset.
fn format_datetime(v: chrono::NaiveDateTime) -> String {
    v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn decode_temporal(row: &MySqlRow, idx: usize) -> JsonValue {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    // TIMESTAMP is stored in UTC; DATETIME carries no zone.
    let is_timestamp = row
        .column(idx)
        .type_info()
        .name()
        .eq_ignore_ascii_case("TIMESTAMP");
    if is_timestamp {
        if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return JsonValue::String(v.to_rfc3339());
        }
    }

    if let Ok(Some(v)) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return JsonValue::String(format_datetime(v));
    }
    if let Ok(Some(v)) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return JsonValue::String(v.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<NaiveTime>, _>(idx) {
        return JsonValue::String(v.format("%H:%M:%S%.f").to_string());
    }
    // Zero dates and negative TIME values have no chrono representation.
    decode_text(row, idx)
}

fn decode_binary(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(|v| encode_binary(&v))
        .unwrap_or(JsonValue::Null)
}

fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<JsonValue>, _>(idx) {
        Ok(Some(v)) => v,
        Ok(None) => JsonValue::Null,
        Err(_) => decode_text(row, idx),
    }
}

fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get_unchecked::<Option<String>, _>(idx) {
        return JsonValue::String(v);
    }
    // MySQL may report text as VARBINARY depending on charset configuration.
    match row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s),
            Err(e) => encode_binary(e.as_bytes()),
        },
        _ => JsonValue::Null,
    }
}
