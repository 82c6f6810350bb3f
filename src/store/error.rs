//! Store error types

use thiserror::Error;

/// Errors reported by a `DocumentStore` backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Base table or index table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Table creation collided with an existing table
    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend unreachable or refusing writes
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
