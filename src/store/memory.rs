//! In-memory `DocumentStore`
//!
//! Tables live behind a single `tokio::sync::RwLock`. Index tables are
//! `bucket → clustering key → row` maps, mirroring the partition/clustering
//! layout of the wide-column backend.

use crate::index::{IndexKey, IndexOperation, IndexRow, IndexTableSchema};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{Document, DocumentKey, Page, Statement};
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

type TableId = (String, String);

#[derive(Debug)]
struct IndexTable {
    schema: IndexTableSchema,
    buckets: BTreeMap<i64, BTreeMap<String, IndexRow>>,
}

impl IndexTable {
    fn new(schema: IndexTableSchema) -> Self {
        Self {
            schema,
            buckets: BTreeMap::new(),
        }
    }

    fn upsert(&mut self, row: IndexRow) {
        let key = row.key().clustering_key();
        self.buckets.entry(row.bucket).or_default().insert(key, row);
    }

    fn remove(&mut self, key: &IndexKey) {
        if let Some(rows) = self.buckets.get_mut(&key.bucket) {
            rows.remove(&key.clustering_key());
            if rows.is_empty() {
                self.buckets.remove(&key.bucket);
            }
        }
    }

    fn row_count(&self) -> usize {
        self.buckets.values().map(|rows| rows.len()).sum()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<TableId, BTreeMap<Uuid, Document>>,
    index_tables: HashMap<String, IndexTable>,
}

impl MemoryState {
    fn table(&self, database: &str, table: &str) -> StoreResult<&BTreeMap<Uuid, Document>> {
        self.tables
            .get(&(database.to_string(), table.to_string()))
            .ok_or_else(|| StoreError::TableNotFound(format!("{}.{}", database, table)))
    }

    fn table_mut(
        &mut self,
        database: &str,
        table: &str,
    ) -> StoreResult<&mut BTreeMap<Uuid, Document>> {
        self.tables
            .get_mut(&(database.to_string(), table.to_string()))
            .ok_or_else(|| StoreError::TableNotFound(format!("{}.{}", database, table)))
    }

    fn apply(&mut self, statement: Statement) -> StoreResult<()> {
        match statement {
            Statement::PutDocument(doc) => {
                let rows = self.table_mut(&doc.database, &doc.table)?;
                rows.insert(doc.id, doc);
            }
            Statement::DeleteDocument(key) => {
                let rows = self.table_mut(&key.database, &key.table)?;
                rows.remove(&key.id);
            }
            Statement::Index(op) => {
                let name = op.table().to_string();
                let table = self
                    .index_tables
                    .get_mut(&name)
                    .ok_or(StoreError::TableNotFound(name))?;

                match op {
                    IndexOperation::Insert(row) | IndexOperation::Update(row) => table.upsert(row),
                    IndexOperation::Delete(key) => table.remove(&key),
                }
            }
        }
        Ok(())
    }
}

/// Process-local store used by the server and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    /// Rows across all buckets of an index table
    pub async fn index_row_count(&self, table: &str) -> StoreResult<usize> {
        let state = self.state.read().await;
        state
            .index_tables
            .get(table)
            .map(|t| t.row_count())
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    /// Schema an index table was created with
    pub async fn index_schema(&self, table: &str) -> Option<IndexTableSchema> {
        let state = self.state.read().await;
        state.index_tables.get(table).map(|t| t.schema.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_table(&self, database: &str, table: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let id = (database.to_string(), table.to_string());
        if state.tables.contains_key(&id) {
            return Err(StoreError::AlreadyExists(format!("{}.{}", database, table)));
        }
        state.tables.insert(id, BTreeMap::new());
        Ok(())
    }

    async fn drop_table(&self, database: &str, table: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state
            .tables
            .remove(&(database.to_string(), table.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::TableNotFound(format!("{}.{}", database, table)))
    }

    async fn get_document(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.table(&key.database, &key.table)?.get(&key.id).cloned())
    }

    async fn scan_documents(
        &self,
        database: &str,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Page<Document>> {
        self.check_available()?;
        let state = self.state.read().await;
        let rows = state.table(database, table)?;

        let items: Vec<Document> = rows.values().skip(offset).take(limit).cloned().collect();
        let has_more = offset + items.len() < rows.len();

        Ok(Page { items, has_more })
    }

    async fn count_documents(&self, database: &str, table: &str) -> StoreResult<u64> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.table(database, table)?.len() as u64)
    }

    async fn execute_batch(&self, statements: Vec<Statement>) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let total = statements.len();

        for (applied, statement) in statements.into_iter().enumerate() {
            let kind = statement.kind();
            if let Err(e) = state.apply(statement) {
                tracing::warn!(
                    applied,
                    total,
                    statement = kind,
                    error = %e,
                    "Batch failed part way; earlier statements stay applied"
                );
                return Err(e);
            }
        }

        Ok(())
    }

    async fn create_index_table(&self, schema: &IndexTableSchema) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.index_tables.contains_key(&schema.name) {
            return Err(StoreError::AlreadyExists(schema.name.clone()));
        }

        tracing::debug!(
            table = %schema.name,
            clustering = ?schema.clustering_columns(),
            "Created index table"
        );
        state
            .index_tables
            .insert(schema.name.clone(), IndexTable::new(schema.clone()));
        Ok(())
    }

    async fn drop_index_table(&self, name: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state
            .index_tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    async fn read_index_bucket(&self, table: &str, bucket: i64) -> StoreResult<Vec<IndexRow>> {
        self.check_available()?;
        let state = self.state.read().await;
        let index_table = state
            .index_tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        Ok(index_table
            .buckets
            .get(&bucket)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}
