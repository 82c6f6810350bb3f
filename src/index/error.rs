//! Index maintenance error types

use crate::catalog::CatalogError;
use crate::codec::FieldError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors from index statement generation and bulk builds
#[derive(Error, Debug)]
pub enum IndexError {
    /// A document field could not be coerced to its declared type
    #[error("Invalid value for field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: FieldError,
    },

    /// Store rejected a read or batch
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Document payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catalog update failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Build stopped before walking every document
    #[error("Index build aborted: {0}")]
    Aborted(String),
}

impl IndexError {
    pub fn field(field: impl Into<String>, source: FieldError) -> Self {
        IndexError::Field {
            field: field.into(),
            source,
        }
    }

    /// Bad input data rather than an infrastructure failure
    pub fn is_field_error(&self) -> bool {
        matches!(self, IndexError::Field { .. })
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{parse_str, FieldDataType};

    #[test]
    fn test_field_error_names_field_and_value() {
        let source = parse_str("abc", FieldDataType::Long).unwrap_err();
        let err = IndexError::field("price", source);

        assert!(err.is_field_error());
        let msg = err.to_string();
        assert!(msg.contains("price"), "{}", msg);
        assert!(msg.contains("abc"), "{}", msg);
    }

    #[test]
    fn test_store_error_conversion() {
        let err: IndexError = StoreError::TableNotFound("ix_a".to_string()).into();
        assert!(matches!(err, IndexError::Store(_)));
        assert!(!err.is_field_error());
    }
}
