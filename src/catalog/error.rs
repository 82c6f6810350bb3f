//! Catalog error types

use thiserror::Error;

/// Errors from the metadata repository
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Database already exists: {0}")]
    DatabaseExists(String),

    #[error("Table not found: {database}.{table}")]
    TableNotFound { database: String, table: String },

    #[error("Table already exists: {database}.{table}")]
    TableExists { database: String, table: String },

    #[error("Index not found: {database}.{table}.{index}")]
    IndexNotFound {
        database: String,
        table: String,
        index: String,
    },

    #[error("Index already exists: {database}.{table}.{index}")]
    IndexExists {
        database: String,
        table: String,
        index: String,
    },

    /// Names must be 1-48 characters of `[A-Za-z0-9_-]`
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Persistence failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::DatabaseNotFound(_)
                | CatalogError::TableNotFound { .. }
                | CatalogError::IndexNotFound { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CatalogError::DatabaseExists(_)
                | CatalogError::TableExists { .. }
                | CatalogError::IndexExists { .. }
        )
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err.to_string())
    }
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(CatalogError::DatabaseNotFound("db".into()).is_not_found());
        assert!(CatalogError::IndexExists {
            database: "db".into(),
            table: "t".into(),
            index: "ix".into(),
        }
        .is_conflict());
        assert!(!CatalogError::InvalidName("".into()).is_conflict());
    }

    #[test]
    fn test_display() {
        let err = CatalogError::TableNotFound {
            database: "shop".into(),
            table: "orders".into(),
        };
        assert_eq!(err.to_string(), "Table not found: shop.orders");
    }
}
