//! Schema introspection.
//!
//! Lists the tables of the connected database and reads each table's
//! `CREATE TABLE` statement. All statements of one introspection run go over a
//! single connection, one after another.

use crate::error::DbResult;
use crate::models::{CREATE_TABLE_UNAVAILABLE, SchemaMap};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Executor, Row};
use tracing::{debug, warn};

mod queries {
    pub const LIST_TABLES: &str = "SHOW TABLES";
    pub const CREATE_TABLE_COLUMN: &str = "Create Table";
}

/// Quote a MySQL identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Statement that returns the creation DDL of `table`.
pub fn show_create_table_sql(table: &str) -> String {
    format!("SHOW CREATE TABLE {}", quote_identifier(table))
}

/// Safely get a string column from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string<I>(row: &MySqlRow, index: I) -> Option<String>
where
    I: sqlx::ColumnIndex<MySqlRow> + Copy,
{
    row.try_get::<String, _>(index).ok().or_else(|| {
        row.try_get::<Vec<u8>, _>(index)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    })
}

/// Where introspection reads table names and DDL from.
#[async_trait]
pub trait SchemaSource: Send {
    async fn list_tables(&mut self) -> DbResult<Vec<String>>;

    /// `Ok(None)` when the statement succeeds but yields no row or no
    /// `Create Table` column (e.g. for a view).
    async fn create_table_statement(&mut self, table: &str) -> DbResult<Option<String>>;
}

#[async_trait]
impl SchemaSource for MySqlConnection {
    async fn list_tables(&mut self) -> DbResult<Vec<String>> {
        let rows = (&mut *self).fetch_all(queries::LIST_TABLES).await?;

        // The single column is named after the database ("Tables_in_<db>").
        let tables = rows
            .iter()
            .filter_map(|row| get_string(row, 0usize))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    async fn create_table_statement(&mut self, table: &str) -> DbResult<Option<String>> {
        let sql = show_create_table_sql(table);
        let row = (&mut *self).fetch_optional(sql.as_str()).await?;
        Ok(row.and_then(|row| get_string(&row, queries::CREATE_TABLE_COLUMN)))
    }
}

/// Build the table name to DDL map, one statement at a time.
///
/// Only listing the tables can fail the whole call. A table whose DDL cannot
/// be read maps to [`CREATE_TABLE_UNAVAILABLE`].
pub async fn show_schema<S>(source: &mut S) -> DbResult<SchemaMap>
where
    S: SchemaSource + ?Sized,
{
    let tables = source.list_tables().await?;
    let mut schema = SchemaMap::new();

    for table in tables {
        let ddl = match source.create_table_statement(&table).await {
            Ok(Some(ddl)) => ddl,
            Ok(None) => {
                warn!(table = %table, "No CREATE TABLE statement returned");
                CREATE_TABLE_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to read CREATE TABLE statement");
                CREATE_TABLE_UNAVAILABLE.to_string()
            }
        };
        schema.insert(table, ddl);
    }

    debug!(count = schema.len(), "Collected table DDL");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use std::collections::HashMap;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "`orders`");
        assert_eq!(quote_identifier("order items"), "`order items`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_show_create_table_sql() {
        assert_eq!(
            show_create_table_sql("users"),
            "SHOW CREATE TABLE `users`"
        );
    }

    /// Canned introspection results keyed by table name.
    struct FakeSource {
        tables: DbResult<Vec<String>>,
        ddl: HashMap<String, DbResult<Option<String>>>,
    }

    impl FakeSource {
        fn new(tables: &[&str]) -> Self {
            Self {
                tables: Ok(tables.iter().map(|t| t.to_string()).collect()),
                ddl: HashMap::new(),
            }
        }

        fn with_ddl(mut self, table: &str, ddl: DbResult<Option<String>>) -> Self {
            self.ddl.insert(table.to_string(), ddl);
            self
        }
    }

    #[async_trait]
    impl SchemaSource for FakeSource {
        async fn list_tables(&mut self) -> DbResult<Vec<String>> {
            std::mem::replace(&mut self.tables, Ok(Vec::new()))
        }

        async fn create_table_statement(&mut self, table: &str) -> DbResult<Option<String>> {
            self.ddl.remove(table).unwrap_or(Ok(None))
        }
    }

    #[tokio::test]
    async fn test_failed_ddl_maps_to_placeholder() {
        let mut source = FakeSource::new(&["customers", "orders", "order_totals"])
            .with_ddl("customers", Ok(Some("CREATE TABLE `customers` (`id` int)".into())))
            .with_ddl(
                "orders",
                Err(DbError::database(
                    "SHOW command denied to user 'agent'@'%' for table 'orders'",
                    Some("42000".to_string()),
                    "",
                )),
            )
            .with_ddl("order_totals", Ok(None));

        let schema = show_schema(&mut source).await.unwrap();

        assert_eq!(schema.len(), 3);
        assert!(schema["customers"].contains("CREATE TABLE"));
        assert_eq!(schema["orders"], CREATE_TABLE_UNAVAILABLE);
        assert_eq!(schema["order_totals"], CREATE_TABLE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_call() {
        let mut source = FakeSource::new(&[]);
        source.tables = Err(DbError::connection("Lost connection to MySQL server", ""));

        let result = show_schema(&mut source).await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_empty_database() {
        let mut source = FakeSource::new(&[]);
        assert!(show_schema(&mut source).await.unwrap().is_empty());
    }
}
