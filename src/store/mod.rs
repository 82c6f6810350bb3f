//! Wide-column store boundary
//!
//! The indexing layer talks to the backend only through `DocumentStore`:
//! base-table reads, paged scans for bulk builds, index-table DDL and
//! multi-statement write batches.
//!
//! Batches are best effort: statements apply in order and a failure part
//! way through leaves the earlier statements applied. No retry and no
//! rollback; the error is returned to the caller.

mod error;
mod memory;
mod types;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use types::{Document, DocumentKey, Page, Statement};

use crate::index::{IndexRow, IndexTableSchema};
use async_trait::async_trait;

/// Backend holding base tables and materialized index tables
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a base table
    async fn create_table(&self, database: &str, table: &str) -> StoreResult<()>;

    /// Drop a base table and all its documents
    async fn drop_table(&self, database: &str, table: &str) -> StoreResult<()>;

    async fn get_document(&self, key: &DocumentKey) -> StoreResult<Option<Document>>;

    /// Documents `[offset, offset + limit)` in a stable order
    async fn scan_documents(
        &self,
        database: &str,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Page<Document>>;

    async fn count_documents(&self, database: &str, table: &str) -> StoreResult<u64>;

    /// Apply statements in order; not atomic across tables
    async fn execute_batch(&self, statements: Vec<Statement>) -> StoreResult<()>;

    async fn create_index_table(&self, schema: &IndexTableSchema) -> StoreResult<()>;

    async fn drop_index_table(&self, name: &str) -> StoreResult<()>;

    /// Every row of one index partition
    async fn read_index_bucket(&self, table: &str, bucket: i64) -> StoreResult<Vec<IndexRow>>;
}
