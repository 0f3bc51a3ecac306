//! Error types for the storage layer.

use mapshare_model::IndexOp;
use mapshare_model::IndexType;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A write violated a uniqueness or reference constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Filter names a field the dataset has no index spec for.
    #[error("no index on field {0:?}")]
    UnknownIndex(String),

    /// Operator makes no sense for the index's value type.
    #[error("operator {op} is not supported on {index_type} index {field:?}")]
    UnsupportedOperator {
        field: String,
        op: IndexOp,
        index_type: IndexType,
    },

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another thread panicked while holding the connection.
    #[error("connection lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                StorageError::Constraint(msg.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => StorageError::Database(err),
        }
    }
}
