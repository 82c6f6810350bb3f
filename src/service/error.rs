//! Service error types

use crate::bucket::BucketError;
use crate::catalog::CatalogError;
use crate::codec::FieldError;
use crate::index::IndexError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by `IndexService` operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Client supplied a value that does not match the field's declared type
    #[error("Invalid value for field '{field}': {source}")]
    InvalidField {
        field: String,
        #[source]
        source: FieldError,
    },

    /// Request is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lookup on an index whose bulk pass has not finished
    #[error("Index '{0}' is still building")]
    IndexNotReady(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    #[error("Bucket tables error: {0}")]
    Buckets(#[from] BucketError),

    #[error("Index error: {0}")]
    Index(IndexError),
}

impl ServiceError {
    /// Caused by request input rather than server state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidField { .. } | ServiceError::Validation(_)
        )
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        if err.is_not_found() {
            ServiceError::NotFound(err.to_string())
        } else if err.is_conflict() {
            ServiceError::Conflict(err.to_string())
        } else if let CatalogError::InvalidName(msg) = err {
            ServiceError::Validation(msg)
        } else {
            ServiceError::Catalog(err)
        }
    }
}

impl From<IndexError> for ServiceError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Field { field, source } => ServiceError::InvalidField { field, source },
            IndexError::Store(e) => ServiceError::Store(e),
            IndexError::Catalog(e) => e.into(),
            other => ServiceError::Index(other),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
