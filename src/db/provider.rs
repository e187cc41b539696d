//! The MySQL database provider.
//!
//! A [`MySqlProvider`] owns one bounded connection pool for one
//! (host, database) pair. Every operation checks a connection out of the pool,
//! uses it, and hands it back when the `PoolConnection` guard drops, so the
//! connection is released on success, error and cancellation alike.

use crate::config::ProviderConfig;
use crate::db::guard::check_write_permission;
use crate::db::pool::{DEFAULT_CONNECT_TIMEOUT, connection_suggestion, create_pool, pool_status};
use crate::db::schema;
use crate::db::types::{RowToJson, column_names};
use crate::error::{DbError, DbResult};
use crate::models::{PoolStatus, QueryResult, SchemaMap};
use futures_util::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::{Either, Executor, MySql, MySqlPool};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pooled query and schema-introspection provider for one MySQL database.
#[derive(Debug, Clone)]
pub struct MySqlProvider {
    name: String,
    config: ProviderConfig,
    pool: MySqlPool,
}

impl MySqlProvider {
    /// Create a provider and its (lazy) connection pool.
    ///
    /// Never fails and never touches the network: an unreachable host or bad
    /// credentials are reported by the first operation. Use
    /// [`verify_connectivity`](Self::verify_connectivity) for a fail-fast check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ProviderConfig) -> Self {
        let pool = create_pool(&config);
        Self {
            name: config.database_name.clone(),
            config,
            pool,
        }
    }

    /// Set the name this provider is known by in a registry.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn allow_writes(&self) -> bool {
        self.config.allow_writes
    }

    pub fn pool_status(&self) -> PoolStatus {
        pool_status(&self.pool, self.config.connection_limit.max(1))
    }

    /// Execute `sql` verbatim as one statement and return all rows and fields.
    ///
    /// Server errors are returned with the server's message unchanged. When the
    /// provider does not allow writes, modifying statements are rejected before
    /// a connection is acquired.
    pub async fn execute_sql(&self, sql: &str) -> DbResult<QueryResult> {
        check_write_permission(sql, self.config.allow_writes)?;

        let start = Instant::now();
        let mut conn = self.acquire().await?;

        debug!(provider = %self.name, sql = %sql, "Executing SQL");

        let mut rows = Vec::new();
        let mut fields = Vec::new();
        let mut rows_affected: Option<u64> = None;
        let mut last_insert_id: Option<u64> = None;

        {
            let mut stream = (&mut *conn).fetch_many(sql);
            while let Some(item) = stream.try_next().await? {
                match item {
                    Either::Left(done) => {
                        *rows_affected.get_or_insert(0) += done.rows_affected();
                        if done.last_insert_id() > 0 {
                            last_insert_id = Some(done.last_insert_id());
                        }
                    }
                    Either::Right(row) => {
                        if fields.is_empty() {
                            fields = row.column_names();
                        }
                        rows.push(row.to_json_map());
                    }
                }
            }
        }

        if rows.is_empty() {
            // An empty result set still has columns; ask the server for them.
            match (&mut *conn).describe(sql).await {
                Ok(describe) => fields = column_names(describe.columns()),
                Err(e) => debug!(error = %e, "Could not describe statement columns"),
            }
        }

        // Write counters only describe statements without a result set.
        if !fields.is_empty() {
            rows_affected = None;
            last_insert_id = None;
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            provider = %self.name,
            rows = rows.len(),
            fields = fields.len(),
            execution_time_ms,
            "SQL executed"
        );

        Ok(QueryResult {
            rows,
            fields,
            rows_affected,
            last_insert_id,
            execution_time_ms,
        })
    }

    /// Map every table of the database to its `CREATE TABLE` statement.
    ///
    /// One connection serves the whole call. Tables whose DDL cannot be read
    /// map to the placeholder text instead of failing the call.
    pub async fn show_schema(&self) -> DbResult<SchemaMap> {
        let mut conn = self.acquire().await?;
        let schema = schema::show_schema(&mut *conn).await?;

        info!(
            provider = %self.name,
            tables = schema.len(),
            "Schema introspection complete"
        );
        Ok(schema)
    }

    /// Open (or reuse) a connection and return the server version.
    pub async fn verify_connectivity(&self) -> DbResult<String> {
        let mut conn = self.acquire().await?;
        let version = sqlx::query_scalar::<_, String>("SELECT VERSION()")
            .fetch_one(&mut *conn)
            .await?;
        debug!(provider = %self.name, version = %version, "Connectivity verified");
        Ok(version)
    }

    /// Verify connectivity, logging the server version.
    pub async fn start(&self) -> DbResult<String> {
        match self.verify_connectivity().await {
            Ok(version) => {
                info!(
                    provider = %self.name,
                    host = %self.config.host,
                    database = %self.config.database_name,
                    server_version = %version,
                    "Provider started"
                );
                Ok(version)
            }
            Err(e) => {
                warn!(provider = %self.name, error = %e, "Provider failed to start");
                Err(e)
            }
        }
    }

    /// Close the pool. Subsequent operations fail with a connection error.
    pub async fn stop(&self) {
        self.pool.close().await;
        info!(provider = %self.name, "Provider stopped");
    }

    /// Check a connection out of the pool.
    ///
    /// Without a configured acquire timeout, a caller queued behind a
    /// saturated pool keeps waiting. A server that cannot be reached fails
    /// after [`DEFAULT_CONNECT_TIMEOUT`].
    async fn acquire(&self) -> DbResult<PoolConnection<MySql>> {
        loop {
            match self.pool.acquire().await {
                Ok(conn) => return Ok(conn),
                Err(sqlx::Error::PoolTimedOut) => {
                    if let Some(secs) = self.config.acquire_timeout_secs {
                        return Err(DbError::timeout("connection pool acquire", secs));
                    }
                    if self.pool_status().is_saturated() {
                        debug!(provider = %self.name, "Pool saturated, waiting for a connection");
                        continue;
                    }
                    return Err(DbError::connection(
                        format!(
                            "Could not open a connection to {}:{} within {}s",
                            self.config.host,
                            self.config.port,
                            DEFAULT_CONNECT_TIMEOUT.as_secs()
                        ),
                        "Check that the MySQL server is running and accessible",
                    ));
                }
                Err(e @ (sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_))) => {
                    let suggestion = connection_suggestion(&e);
                    return Err(DbError::connection(e.to_string(), suggestion));
                }
                Err(other) => return Err(DbError::from(other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `.invalid` never resolves, so connecting fails fast instead of
    // retrying like a refused connection would.
    fn unreachable_config() -> ProviderConfig {
        ProviderConfig::new("db.invalid", "root", "pw", "shop")
            .with_connection_limit(2)
            .with_acquire_timeout_secs(10)
    }

    #[tokio::test]
    async fn test_construction_does_not_connect() {
        let provider = MySqlProvider::new(unreachable_config());
        assert_eq!(provider.name(), "shop");
        assert!(!provider.allow_writes());
        assert_eq!(provider.pool_status().size, 0);
        assert_eq!(provider.pool_status().max, 2);
    }

    #[tokio::test]
    async fn test_with_name() {
        let provider = MySqlProvider::new(unreachable_config()).with_name("analytics");
        assert_eq!(provider.name(), "analytics");
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_on_first_use() {
        let provider = MySqlProvider::new(unreachable_config());
        let result = provider.execute_sql("SELECT 1").await;
        assert!(matches!(
            result,
            Err(DbError::Connection { .. } | DbError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_fails_with_default_config() {
        // Nothing listens on port 1; the driver retries refused connects.
        let config = ProviderConfig::new("127.0.0.1", "root", "pw", "shop").with_port(1);
        let provider = MySqlProvider::new(config);

        let result = tokio::time::timeout(
            DEFAULT_CONNECT_TIMEOUT + std::time::Duration::from_secs(20),
            provider.execute_sql("SELECT 1"),
        )
        .await
        .expect("refused connection must not wait forever");

        let err = result.unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }), "got: {:?}", err);
    }

    #[tokio::test]
    async fn test_write_rejected_before_connecting() {
        let provider = MySqlProvider::new(unreachable_config());
        let result = provider.execute_sql("DELETE FROM orders").await;
        assert!(matches!(result, Err(DbError::Permission { .. })));
    }

    #[tokio::test]
    async fn test_stopped_provider_rejects_operations() {
        let provider = MySqlProvider::new(unreachable_config());
        provider.stop().await;
        assert!(provider.pool_status().closed);

        let result = provider.show_schema().await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
    }
}
