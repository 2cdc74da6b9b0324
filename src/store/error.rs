//! Record store error types
//!
//! Defines all errors that can occur in the store layer.

use crate::model::ValidationError;
use thiserror::Error;

/// Errors that can occur in the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record failed boundary validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Requested record does not exist
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Foreign key or uniqueness constraint violated
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The read was cancelled by the caller
    #[error("Read cancelled")]
    Cancelled,

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),

    /// Blocking task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

impl StoreError {
    /// Classify a write failure, separating constraint violations from other
    /// database errors.
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(message.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => StoreError::Database(err),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
