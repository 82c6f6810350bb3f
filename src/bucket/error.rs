//! Bucket table error types

use crate::codec::FieldDataType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from generating, persisting or loading bucket tables
#[derive(Error, Debug)]
pub enum BucketError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Expected artifact file is not present
    #[error("Missing bucket artifact for {data_type}: {path:?}")]
    MissingArtifact {
        data_type: FieldDataType,
        path: PathBuf,
    },

    /// More than one artifact claims the same type
    #[error("Several bucket artifacts for {data_type}: {paths:?}")]
    AmbiguousArtifact {
        data_type: FieldDataType,
        paths: Vec<PathBuf>,
    },

    /// Artifact content is malformed or unsorted
    #[error("Corrupt bucket artifact {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Generation parameters are unusable
    #[error("Invalid bucket spec: {0}")]
    InvalidSpec(String),

    /// Locator constructed without a table for this type
    #[error("No bucket table for {0}")]
    MissingTable(FieldDataType),
}

/// Result type alias for bucket operations
pub type BucketResult<T> = Result<T, BucketError>;
