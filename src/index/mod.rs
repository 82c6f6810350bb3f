//! Bucketed Secondary Indexes
//!
//! - **types**: index definitions, index-table rows, keys and operations
//! - **maintenance**: per-mutation index statement generation
//! - **builder**: bulk pass over existing documents when an index is created
//! - **status**: build status registry
//!
//! # Architecture
//!
//! ```text
//! create/update/delete document
//!        ↓
//! IndexCatalogCache → [Index, ...] (declaration order)
//!        ↓
//! IndexMaintenance: field → FieldValue → token → bucket
//!        ↓
//! [PutDocument, Insert/Update/Delete, ...] → DocumentStore::execute_batch
//! ```

mod builder;
mod error;
mod maintenance;
mod status;
mod types;

pub use builder::{BuildHandle, BuildProgress, IndexBuilder};
pub use error::{IndexError, IndexResult};
pub use maintenance::{extract_field, IndexMaintenance};
pub use status::{BuildStatusRegistry, IndexBuildStatus};
pub use types::{
    materialized_table_name, Index, IndexField, IndexKey, IndexOperation, IndexRow,
    IndexTableSchema, BUCKET_COLUMN, ID_COLUMN, MAX_TABLE_NAME_LEN,
};
