//! Connection pool construction.
//!
//! Pools are created lazily: no connection is opened until the first
//! operation needs one, so building a pool never fails and a bad host or bad
//! credentials only surface as an error from that first operation.

use crate::config::ProviderConfig;
use crate::models::PoolStatus;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::time::Duration;
use tracing::{debug, warn};

/// Pool deadline used when no acquire timeout is configured.
///
/// Bounds how long the driver keeps retrying an unreachable server. Waiting
/// behind a saturated pool is not bounded by it: the provider acquires again.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the driver connect options for a provider config.
pub fn connect_options(config: &ProviderConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database_name)
        .charset(&config.charset)
}

/// Create a lazily-connecting pool bounded by `connection_limit`.
///
/// Must be called from within a tokio runtime: the driver spawns its pool
/// maintenance task here.
pub fn create_pool(config: &ProviderConfig) -> MySqlPool {
    let max_connections = if config.connection_limit == 0 {
        warn!(
            host = %config.host,
            database = %config.database_name,
            "connectionLimit of 0 would block every caller, using 1"
        );
        1
    } else {
        config.connection_limit
    };

    let acquire_timeout = config.acquire_timeout().unwrap_or(DEFAULT_CONNECT_TIMEOUT);

    debug!(
        host = %config.host,
        port = config.port,
        database = %config.database_name,
        max_connections,
        acquire_timeout_secs = ?config.acquire_timeout_secs,
        "Creating lazy MySQL pool"
    );

    MySqlPoolOptions::new()
        .min_connections(0)
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_lazy_with(connect_options(config))
}

/// Snapshot of the pool's occupancy.
pub fn pool_status(pool: &MySqlPool, max: u32) -> PoolStatus {
    PoolStatus {
        size: pool.size(),
        idle: pool.num_idle(),
        max,
        closed: pool.is_closed(),
    }
}

/// Generate a helpful suggestion for connection errors.
pub fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and accessible".to_string();
    }

    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify the user and password in the provider configuration".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that databaseName exists on the server".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify host, port and credentials in the provider configuration".to_string()
}
