//! Query error types
//!
//! An empty result is never an error: queries that match nothing return an
//! empty sequence or `None`.

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur during query execution
#[derive(Error, Debug)]
pub enum QueryError {
    /// A parameter is malformed (non-positive limit, unknown query name)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The record store failed; passed through unchanged and never retried
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// The caller cancelled the query or its timeout expired
    #[error("Query cancelled")]
    Cancelled,
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => QueryError::Cancelled,
            other => QueryError::StoreUnavailable(other),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_pass_through() {
        let err: QueryError = StoreError::Lock("poisoned".to_string()).into();
        assert!(matches!(err, QueryError::StoreUnavailable(StoreError::Lock(_))));
        assert_eq!(err.to_string(), "Store unavailable: Lock error: poisoned");
    }

    #[test]
    fn test_cancellation_maps_to_cancelled() {
        let err: QueryError = StoreError::Cancelled.into();
        assert!(matches!(err, QueryError::Cancelled));
    }
}
