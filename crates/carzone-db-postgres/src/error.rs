//! Error types for the PostgreSQL storage backend.

use carzone_core::parse_id;
use carzone_storage::StorageError;
use sqlx_core::error::Error as SqlxError;
use uuid::Uuid;

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL error code for check constraint violations (23514).
pub const PG_CHECK_VIOLATION: &str = "23514";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is a foreign key violation (23503).
pub fn is_foreign_key_violation(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_FOREIGN_KEY_VIOLATION)
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Pool error.
    #[error("Pool error: {message}")]
    Pool { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new pool error.
    #[must_use]
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
            PostgresError::Pool { message } => {
                StorageError::connection_error(format!("Pool error: {message}"))
            }
        }
    }
}

/// Maps a driver error raised while `action` was running to a storage error.
pub(crate) fn classify(action: &str, err: SqlxError) -> StorageError {
    match &err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StorageError::connection_error(format!("{action}: {err}"))
        }
        SqlxError::Database(db_err) => match db_err.code().as_deref() {
            Some(PG_FOREIGN_KEY_VIOLATION) => {
                StorageError::constraint_violation(format!("{action}: {}", db_err.message()))
            }
            Some(PG_CHECK_VIOLATION) => {
                StorageError::invalid_request(format!("{action}: {}", db_err.message()))
            }
            _ => StorageError::internal(format!("{action}: {err}")),
        },
        _ => StorageError::internal(format!("{action}: {err}")),
    }
}

/// Parses a lookup identifier. Malformed ids name no row.
pub(crate) fn id_or_not_found(entity: &'static str, id: &str) -> std::result::Result<Uuid, StorageError> {
    parse_id(id).map_err(|_| StorageError::not_found(entity, id))
}

/// Parses the target of a write. Malformed ids match no row.
pub(crate) fn id_or_no_rows(entity: &'static str, id: &str) -> std::result::Result<Uuid, StorageError> {
    parse_id(id).map_err(|_| StorageError::no_rows_affected(entity, id))
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
