//! Document and index service
//!
//! Every document write is one batch: the base-table statement followed by
//! the index operations of each of the table's indexes, in creation order.
//! Index values are validated before anything is submitted, so a bad field
//! value rejects the whole write.

use crate::bucket::{BucketError, BucketLocator};
use crate::catalog::{CatalogKey, DatabaseInfo, IndexCatalogCache, MetadataRepository, TableInfo};
use crate::codec::FieldValue;
use crate::config::Config;
use crate::index::{
    BuildHandle, BuildStatusRegistry, Index, IndexBuildStatus, IndexBuilder, IndexField,
    IndexMaintenance,
};
use crate::service::error::{ServiceError, ServiceResult};
use crate::store::{Document, DocumentKey, DocumentStore, MemoryStore, Statement, StoreError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Tunables for `IndexService`
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub page_size: usize,
    pub cache_ttl: Duration,
    /// Finished build statuses kept in the registry
    pub status_retention: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            page_size: 500,
            cache_ttl: Duration::from_secs(30),
            status_retention: 1_000,
        }
    }
}

/// Index definition supplied by a client
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIndexRequest {
    pub name: String,
    pub fields: Vec<IndexField>,
    #[serde(default)]
    pub unique: bool,
}

/// Index creation outcome: the inactive index and its build status id
#[derive(Debug, Clone)]
pub struct CreatedIndex {
    pub index: Index,
    pub status_id: Uuid,
}

/// Composes store, catalog, cache, locator and build jobs
pub struct IndexService {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<MetadataRepository>,
    cache: Arc<IndexCatalogCache>,
    maintenance: Arc<IndexMaintenance>,
    registry: Arc<BuildStatusRegistry>,
    builder: IndexBuilder,
    builds: Mutex<HashMap<Uuid, BuildHandle>>,
}

impl IndexService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: Arc<MetadataRepository>,
        locator: Arc<BucketLocator>,
        options: ServiceOptions,
    ) -> Self {
        let cache = Arc::new(IndexCatalogCache::new(options.cache_ttl));
        let maintenance = Arc::new(IndexMaintenance::new(locator));
        let registry = Arc::new(BuildStatusRegistry::with_retention(options.status_retention));
        let builder = IndexBuilder::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&cache),
            Arc::clone(&maintenance),
            Arc::clone(&registry),
            options.page_size,
        );

        Self {
            store,
            catalog,
            cache,
            maintenance,
            registry,
            builder,
            builds: Mutex::new(HashMap::new()),
        }
    }

    /// Build the service described by `config` on an in-memory store
    pub async fn from_config(config: &Config) -> ServiceResult<Self> {
        let locator = Arc::new(load_locator(
            Path::new(&config.buckets.artifact_dir),
            config.buckets.generate_if_missing,
        )?);

        let catalog = match &config.catalog.metadata_path {
            Some(path) => MetadataRepository::open(Path::new(path))?,
            None => MetadataRepository::new(),
        };

        let service = Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(catalog),
            locator,
            ServiceOptions {
                page_size: config.indexing.page_size,
                cache_ttl: config.catalog.cache_ttl(),
                status_retention: config.indexing.status_retention,
            },
        );
        service.restore_schema().await?;
        Ok(service)
    }

    /// Recreate base and index tables for every catalog entry
    pub async fn restore_schema(&self) -> ServiceResult<()> {
        let mut tables = 0;
        let mut indexes = 0;

        for db in self.catalog.list_databases().await {
            for table in self.catalog.list_tables(&db.name).await? {
                self.store.create_table(&db.name, &table.name).await?;
                tables += 1;
                for index in self.catalog.list_indexes(&db.name, &table.name).await? {
                    self.store.create_index_table(&index.schema()).await?;
                    indexes += 1;
                }
            }
        }

        if tables > 0 {
            tracing::info!(tables, indexes, "Restored schema from catalog");
        }
        Ok(())
    }

    pub fn locator(&self) -> &BucketLocator {
        self.maintenance.locator()
    }

    pub fn registry(&self) -> &BuildStatusRegistry {
        &self.registry
    }

    // ---- databases and tables ----

    pub async fn create_database(&self, name: &str) -> ServiceResult<DatabaseInfo> {
        Ok(self.catalog.create_database(name).await?)
    }

    pub async fn list_databases(&self) -> Vec<DatabaseInfo> {
        self.catalog.list_databases().await
    }

    /// Drop a database with its tables and index tables
    pub async fn delete_database(&self, name: &str) -> ServiceResult<()> {
        let dropped = self.catalog.delete_database(name).await?;

        for (table, indexes) in dropped {
            for index in indexes {
                self.drop_index_table_logged(&index).await;
            }
            if let Err(e) = self.store.drop_table(name, &table).await {
                tracing::warn!(database = %name, table = %table, error = %e, "Failed to drop table");
            }
        }
        self.cache.invalidate_database(name).await;
        Ok(())
    }

    pub async fn create_table(&self, database: &str, table: &str) -> ServiceResult<TableInfo> {
        let info = self.catalog.create_table(database, table).await?;
        self.store.create_table(database, table).await?;
        Ok(info)
    }

    pub async fn list_tables(&self, database: &str) -> ServiceResult<Vec<TableInfo>> {
        Ok(self.catalog.list_tables(database).await?)
    }

    pub async fn delete_table(&self, database: &str, table: &str) -> ServiceResult<()> {
        let indexes = self.catalog.delete_table(database, table).await?;
        for index in indexes {
            self.drop_index_table_logged(&index).await;
        }
        self.store.drop_table(database, table).await?;
        self.cache.invalidate(&CatalogKey::new(database, table)).await;
        Ok(())
    }

    // ---- documents ----

    async fn indexes_for(&self, database: &str, table: &str) -> ServiceResult<Arc<Vec<Index>>> {
        let key = CatalogKey::new(database, table);
        Ok(self
            .cache
            .get_or_populate(&key, || self.catalog.list_indexes(database, table))
            .await?)
    }

    /// Insert a new document with a fresh id
    pub async fn create_document(&self, database: &str, table: &str, payload: Value) -> ServiceResult<Document> {
        require_object(&payload)?;
        self.catalog.ensure_table(database, table).await?;

        let doc = Document::new(database, table, payload);
        let indexes = self.indexes_for(database, table).await?;
        let ops = self.maintenance.for_create(&indexes, &doc)?;

        let mut batch = Vec::with_capacity(ops.len() + 1);
        batch.push(Statement::PutDocument(doc.clone()));
        batch.extend(ops.into_iter().map(Statement::from));
        self.submit(batch, "create", &doc.id).await?;

        Ok(doc)
    }

    pub async fn get_document(&self, database: &str, table: &str, id: Uuid) -> ServiceResult<Document> {
        self.catalog.ensure_table(database, table).await?;
        self.store
            .get_document(&DocumentKey::new(database, table, id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("document {}", id)))
    }

    /// Replace a document's payload
    pub async fn update_document(
        &self,
        database: &str,
        table: &str,
        id: Uuid,
        payload: Value,
    ) -> ServiceResult<Document> {
        require_object(&payload)?;
        let old = self.get_document(database, table, id).await?;
        let new = old.with_payload(payload);

        let indexes = self.indexes_for(database, table).await?;
        let ops = self.maintenance.for_update(&indexes, &old, &new)?;

        let mut batch = Vec::with_capacity(ops.len() + 1);
        batch.push(Statement::PutDocument(new.clone()));
        batch.extend(ops.into_iter().map(Statement::from));
        self.submit(batch, "update", &id).await?;

        Ok(new)
    }

    pub async fn delete_document(&self, database: &str, table: &str, id: Uuid) -> ServiceResult<()> {
        let doc = self.get_document(database, table, id).await?;

        let indexes = self.indexes_for(database, table).await?;
        let ops = self.maintenance.for_delete(&indexes, &doc)?;

        let mut batch = Vec::with_capacity(ops.len() + 1);
        batch.push(Statement::DeleteDocument(doc.key()));
        batch.extend(ops.into_iter().map(Statement::from));
        self.submit(batch, "delete", &id).await
    }

    async fn submit(&self, batch: Vec<Statement>, action: &str, id: &Uuid) -> ServiceResult<()> {
        let statements = batch.len();
        if let Err(e) = self.store.execute_batch(batch).await {
            tracing::error!(
                action,
                doc_id = %id,
                statements,
                error = %e,
                "Document batch failed; index tables may be inconsistent"
            );
            return Err(e.into());
        }
        tracing::debug!(action, doc_id = %id, statements, "Document batch applied");
        Ok(())
    }

    // ---- indexes ----

    /// Register an index and start its bulk build
    pub async fn create_index(
        &self,
        database: &str,
        table: &str,
        request: CreateIndexRequest,
    ) -> ServiceResult<CreatedIndex> {
        validate_fields(&request.fields)?;
        self.catalog.ensure_table(database, table).await?;

        if self.catalog.get_index(database, table, &request.name).await.is_ok() {
            return Err(ServiceError::Conflict(format!(
                "index {} already exists on {}.{}",
                request.name, database, table
            )));
        }

        let index = Index::new(database, table, request.name, request.fields, request.unique);
        crate::catalog::validate_name("index", &index.name)?;

        match self.store.create_index_table(&index.schema()).await {
            Err(StoreError::AlreadyExists(table_name)) => {
                return Err(ServiceError::Conflict(format!(
                    "index table {} is already in use",
                    table_name
                )));
            }
            other => other?,
        }
        if let Err(e) = self.catalog.add_index(index.clone()).await {
            self.drop_index_table_logged(&index).await;
            return Err(e.into());
        }
        self.cache.invalidate(&CatalogKey::new(database, table)).await;

        let status_id = self.registry.register(&index).await;
        let handle = self.builder.spawn(index.clone(), status_id);

        let mut builds = self.builds.lock().await;
        builds.retain(|_, h| !h.is_finished());
        builds.insert(status_id, handle);

        Ok(CreatedIndex { index, status_id })
    }

    /// Remove an index and drop its table
    ///
    /// An in-flight build for it fails at its next page and leaves any
    /// index recreated under the same name untouched.
    pub async fn delete_index(&self, database: &str, table: &str, name: &str) -> ServiceResult<()> {
        let index = self.catalog.remove_index(database, table, name).await?;
        self.cache.invalidate(&CatalogKey::new(database, table)).await;
        self.store.drop_index_table(&index.table_name).await?;
        Ok(())
    }

    pub async fn list_indexes(&self, database: &str, table: &str) -> ServiceResult<Vec<Index>> {
        Ok(self.catalog.list_indexes(database, table).await?)
    }

    pub async fn get_index(&self, database: &str, table: &str, name: &str) -> ServiceResult<Index> {
        Ok(self.catalog.get_index(database, table, name).await?)
    }

    /// Documents whose first indexed field equals `value`
    pub async fn find_by_index(
        &self,
        database: &str,
        table: &str,
        name: &str,
        value: &Value,
    ) -> ServiceResult<Vec<Document>> {
        let index = self.catalog.get_index(database, table, name).await?;
        if !index.active {
            return Err(ServiceError::IndexNotReady(index.name));
        }

        let field = index
            .bucket_field()
            .ok_or_else(|| ServiceError::Validation(format!("index {} has no fields", name)))?;

        let typed = FieldValue::coerce(value, field.data_type).map_err(|source| {
            ServiceError::InvalidField {
                field: field.name.clone(),
                source,
            }
        })?;
        let bucket = match self.locator().locate_value(&typed) {
            Ok(bucket) => bucket,
            Err(e) if e.is_empty_value() => return Ok(Vec::new()),
            Err(source) => {
                return Err(ServiceError::InvalidField {
                    field: field.name.clone(),
                    source,
                })
            }
        };

        let rows = self.store.read_index_bucket(&index.table_name, bucket).await?;
        let scanned = rows.len();

        let mut docs = Vec::new();
        for row in rows.into_iter().filter(|r| r.first_column() == Some(&typed)) {
            let payload = row
                .decode_payload()
                .map_err(|e| ServiceError::Store(e.into()))?;
            docs.push(Document {
                id: row.id,
                database: database.to_string(),
                table: table.to_string(),
                payload,
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
        }

        tracing::debug!(
            index = %name,
            bucket,
            scanned,
            matched = docs.len(),
            "Index lookup"
        );
        Ok(docs)
    }

    // ---- build status ----

    pub async fn build_status(&self, id: Uuid) -> ServiceResult<IndexBuildStatus> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("build status {}", id)))
    }

    pub async fn list_build_status(&self, active_only: bool) -> Vec<IndexBuildStatus> {
        self.registry.list(active_only).await
    }

    /// Detach a build handle, e.g. to await its completion
    pub async fn take_build(&self, status_id: Uuid) -> Option<BuildHandle> {
        self.builds.lock().await.remove(&status_id)
    }

    /// Stop running builds and wait for them to exit
    pub async fn shutdown(&self) {
        let handles: Vec<BuildHandle> = self.builds.lock().await.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.shutdown();
        }
        for handle in handles {
            let id = handle.status_id();
            if let Err(e) = handle.join().await {
                tracing::info!(status_id = %id, error = %e, "Build stopped at shutdown");
            }
        }
    }

    async fn drop_index_table_logged(&self, index: &Index) {
        if let Err(e) = self.store.drop_index_table(&index.table_name).await {
            tracing::warn!(table = %index.table_name, error = %e, "Failed to drop index table");
        }
    }
}

fn load_locator(dir: &Path, generate_if_missing: bool) -> ServiceResult<BucketLocator> {
    match BucketLocator::load(dir) {
        Ok(locator) => Ok(locator),
        Err(BucketError::MissingArtifact { data_type, path }) if generate_if_missing => {
            tracing::warn!(
                data_type = %data_type,
                "Bucket artifact {:?} missing; generating tables in memory",
                path
            );
            Ok(BucketLocator::generate()?)
        }
        Err(e) => Err(e.into()),
    }
}

fn require_object(payload: &Value) -> ServiceResult<()> {
    if payload.is_object() {
        Ok(())
    } else {
        Err(ServiceError::Validation(
            "document payload must be a JSON object".to_string(),
        ))
    }
}

fn validate_fields(fields: &[IndexField]) -> ServiceResult<()> {
    if fields.is_empty() {
        return Err(ServiceError::Validation(
            "index needs at least one field".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in fields {
        if field.name.is_empty() || field.name.split('.').any(|s| s.is_empty()) {
            return Err(ServiceError::Validation(format!(
                "invalid field path {:?}",
                field.name
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ServiceError::Validation(format!(
                "field {} listed twice",
                field.name
            )));
        }
    }
    Ok(())
}
