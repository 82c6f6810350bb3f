//! Bulk index build job
//!
//! Walks every existing document of a table once, page by page, and writes
//! the new index's row for each. Runs on its own tokio task.
//!
//! ```text
//! count → [shutdown? → scan page → still current? → generate_create + batch per doc → publish progress]* → activate
//! ```
//!
//! Field errors are recorded on the build status and the walk continues.
//! Store and catalog errors stop the walk and mark the build failed. The
//! index stays inactive unless the walk completes.
//!
//! A build belongs to one index generation. If the index is deleted, or
//! deleted and recreated under the same name, the build aborts at its next
//! page and never activates the replacement.

use crate::catalog::{CatalogKey, IndexCatalogCache, MetadataRepository};
use crate::index::error::{IndexError, IndexResult};
use crate::index::maintenance::IndexMaintenance;
use crate::index::status::BuildStatusRegistry;
use crate::index::types::Index;
use crate::store::DocumentStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Snapshot published on the progress channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildProgress {
    pub total: u64,
    pub completed: u64,
    /// Documents skipped because of field errors
    pub errors: u64,
    pub finished: bool,
}

/// Handle to a running build
#[derive(Debug)]
pub struct BuildHandle {
    status_id: Uuid,
    join: JoinHandle<IndexResult<BuildProgress>>,
    progress: watch::Receiver<BuildProgress>,
    shutdown: watch::Sender<bool>,
}

impl BuildHandle {
    pub fn status_id(&self) -> Uuid {
        self.status_id
    }

    /// Subscribe to progress snapshots
    pub fn progress(&self) -> watch::Receiver<BuildProgress> {
        self.progress.clone()
    }

    /// Ask the build to stop before its next page
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the build to end
    pub async fn join(self) -> IndexResult<BuildProgress> {
        self.join
            .await
            .map_err(|e| IndexError::Aborted(format!("build task failed: {}", e)))?
    }
}

/// Spawns bulk index builds
#[derive(Clone)]
pub struct IndexBuilder {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<MetadataRepository>,
    cache: Arc<IndexCatalogCache>,
    maintenance: Arc<IndexMaintenance>,
    registry: Arc<BuildStatusRegistry>,
    page_size: usize,
}

impl IndexBuilder {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: Arc<MetadataRepository>,
        cache: Arc<IndexCatalogCache>,
        maintenance: Arc<IndexMaintenance>,
        registry: Arc<BuildStatusRegistry>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            cache,
            maintenance,
            registry,
            page_size: page_size.max(1),
        }
    }

    /// Start the bulk pass for `index`, reporting under `status_id`
    pub fn spawn(&self, index: Index, status_id: Uuid) -> BuildHandle {
        let (progress_tx, progress_rx) = watch::channel(BuildProgress::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let builder = self.clone();

        let join = tokio::spawn(async move {
            tracing::info!(
                index = %index.name,
                table = %index.table,
                status_id = %status_id,
                "Index build started"
            );

            let result = builder
                .run(&index, status_id, &progress_tx, &shutdown_rx)
                .await;

            match &result {
                Ok(progress) => tracing::info!(
                    index = %index.name,
                    completed = progress.completed,
                    errors = progress.errors,
                    "Index build complete"
                ),
                Err(e) => {
                    tracing::error!(index = %index.name, error = %e, "Index build failed");
                    builder.registry.fail(status_id, e.to_string()).await;
                }
            }

            result
        });

        BuildHandle {
            status_id,
            join,
            progress: progress_rx,
            shutdown: shutdown_tx,
        }
    }

    async fn run(
        &self,
        index: &Index,
        status_id: Uuid,
        progress_tx: &watch::Sender<BuildProgress>,
        shutdown: &watch::Receiver<bool>,
    ) -> IndexResult<BuildProgress> {
        let total = self.store.count_documents(&index.database, &index.table).await?;
        self.registry.set_total(status_id, total).await;

        let mut progress = BuildProgress {
            total,
            ..Default::default()
        };
        progress_tx.send_replace(progress.clone());

        let mut offset = 0;
        loop {
            let stop = *shutdown.borrow();
            if stop {
                return Err(IndexError::Aborted("shutdown requested".to_string()));
            }

            let page = self
                .store
                .scan_documents(&index.database, &index.table, offset, self.page_size)
                .await?;
            offset += page.items.len();
            self.ensure_current(index).await?;

            for doc in &page.items {
                match self.maintenance.generate_create(index, doc) {
                    Ok(Some(op)) => self.store.execute_batch(vec![op.into()]).await?,
                    Ok(None) => {}
                    Err(e) if e.is_field_error() => {
                        tracing::warn!(index = %index.name, doc_id = %doc.id, error = %e, "Skipping document");
                        self.registry
                            .record_error(status_id, format!("{}: {}", doc.id, e))
                            .await;
                        progress.errors += 1;
                    }
                    Err(e) => return Err(e),
                }
                progress.completed += 1;
            }

            self.registry.record_progress(status_id, progress.completed).await;
            progress_tx.send_replace(progress.clone());
            tracing::debug!(
                index = %index.name,
                completed = progress.completed,
                total,
                "Index build page done"
            );

            if !page.has_more || page.items.is_empty() {
                break;
            }
        }

        self.ensure_current(index).await?;
        self.catalog
            .set_index_active(
                &index.database,
                &index.table,
                &index.name,
                index.generation,
                true,
            )
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    superseded(index)
                } else {
                    e.into()
                }
            })?;
        self.cache
            .invalidate(&CatalogKey::new(&index.database, &index.table))
            .await;
        self.registry.complete(status_id).await;

        progress.finished = true;
        progress_tx.send_replace(progress.clone());
        Ok(progress)
    }

    async fn ensure_current(&self, index: &Index) -> IndexResult<()> {
        if self.catalog.is_current(index).await {
            Ok(())
        } else {
            Err(superseded(index))
        }
    }
}

fn superseded(index: &Index) -> IndexError {
    IndexError::Aborted(format!(
        "index {}.{}.{} was deleted or replaced",
        index.database, index.table, index.name
    ))
}
