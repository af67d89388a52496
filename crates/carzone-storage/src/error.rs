//! Storage error types for the CarZone storage abstraction layer.
//!
//! This module defines all error kinds a store operation can return. Cache
//! failures never appear here: they are absorbed inside the stores.

use std::fmt;

use carzone_core::{ContextError, CoreError};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that matched no row.
        id: String,
    },

    /// A write would break a relationship between entities.
    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        /// Description of the violated constraint.
        message: String,
    },

    /// A write statement succeeded but matched no row.
    #[error("No rows affected: {entity}/{id}")]
    NoRowsAffected {
        /// The kind of entity the write targeted.
        entity: &'static str,
        /// The identifier the write targeted.
        id: String,
    },

    /// The request payload failed validation.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The caller's context was cancelled or timed out.
    #[error("Operation cancelled: {reason}")]
    Cancelled {
        /// Whether the context was cancelled or its deadline passed.
        reason: ContextError,
    },

    /// An error occurred while beginning or finishing a transaction.
    #[error("Transaction error: {message}")]
    TransactionError {
        /// Description of the transaction error.
        message: String,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// Any other storage failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `ConstraintViolation` error.
    #[must_use]
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Creates a new `NoRowsAffected` error.
    #[must_use]
    pub fn no_rows_affected(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NoRowsAffected {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `TransactionError` error.
    #[must_use]
    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a constraint violation.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    /// Returns `true` if a write matched no row.
    #[must_use]
    pub fn is_no_rows_affected(&self) -> bool {
        matches!(self, Self::NoRowsAffected { .. })
    }

    /// Returns `true` if the caller's context ended the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ConstraintViolation { .. } => ErrorCategory::Conflict,
            Self::NoRowsAffected { .. } => ErrorCategory::Conflict,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::TransactionError { .. } => ErrorCategory::Transaction,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<ContextError> for StorageError {
    fn from(reason: ContextError) -> Self {
        Self::Cancelled { reason }
    }
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest { message } => Self::InvalidRequest { message },
            other if other.is_client_error() => Self::invalid_request(other.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Entity not found.
    NotFound,
    /// Conflict with existing rows (constraint or lost update).
    Conflict,
    /// Validation error.
    Validation,
    /// Caller cancelled or timed out.
    Cancelled,
    /// Transaction-related error.
    Transaction,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Transaction => write!(f, "transaction"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
