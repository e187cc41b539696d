//! Error types for the MySQL provider.
//!
//! This module defines all error types using `thiserror`. Driver errors are
//! classified but never rewritten: the message reported by the server or the
//! driver is carried through unchanged so callers see the raw failure text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("{message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Provider not found: {name}")]
    ProviderNotFound { name: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a permission error.
    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a provider not found error.
    pub fn provider_not_found(name: impl Into<String>) -> Self {
        Self::ProviderNotFound { name: name.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Get the SQLSTATE code reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// The provider never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Classify a driver error, keeping its message text unchanged.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(source) => DbError::configuration(source.to_string()),
            sqlx::Error::Database(db_err) => {
                let sql_state = db_err.code().map(|c| c.into_owned());
                let suggestion = match sql_state.as_deref() {
                    Some("42S02") => "Run showSchema to list the available tables",
                    Some("42S22") => "Check the column names against the table definition",
                    Some("42000") => "Check the statement for MySQL syntax errors",
                    Some("28000") => "Verify the user and password in the provider configuration",
                    _ => "Check the statement and the objects it references",
                };
                DbError::database(db_err.message(), sql_state, suggestion)
            }
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 0),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "The provider has been stopped")
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
                DbError::connection(err.to_string(), "Check that the MySQL server is reachable")
            }
            other => DbError::internal(other.to_string()),
        }
    }
}

/// Result type alias for provider operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_database_error_displays_driver_message_verbatim() {
        let err = DbError::database(
            "Table 'shop.nonexistent_table' doesn't exist",
            Some("42S02".to_string()),
            "Check the SQL syntax and referenced objects",
        );
        assert_eq!(
            err.to_string(),
            "Table 'shop.nonexistent_table' doesn't exist"
        );
        assert_eq!(err.sql_state(), Some("42S02"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database("Syntax error", Some("42000".to_string()), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert_eq!(DbError::provider_not_found("main").suggestion(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("acquire", 30).is_retryable());
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::permission("INSERT", "read-only").is_retryable());
        assert!(!DbError::configuration("missing host").is_retryable());
    }

    #[test]
    fn test_from_sqlx_pool_closed() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_from_sqlx_pool_timed_out() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout { .. }));
    }

    #[test]
    fn test_from_sqlx_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: DbError = sqlx::Error::Io(io).into();
        assert!(err.to_string().contains("refused"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_provider_not_found_display() {
        let err = DbError::provider_not_found("analytics");
        assert_eq!(err.to_string(), "Provider not found: analytics");
    }
}
