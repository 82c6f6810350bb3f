//! Index build status registry
//!
//! One record per "index created" event. A record sits in the active set
//! while its bulk pass runs and leaves it when the pass completes or fails.
//! Finished records are kept up to a retention cap, oldest evicted first.

use crate::index::types::Index;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Progress of one bulk index pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBuildStatus {
    pub id: Uuid,
    pub database: String,
    pub table: String,
    pub index: String,
    /// Documents in the table when the pass started
    pub total: u64,
    /// Documents walked so far, including ones with field errors
    pub completed: u64,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Per-document failures; these do not stop the pass
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Failure that stopped the pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
    pub in_progress: bool,
}

impl IndexBuildStatus {
    fn new(index: &Index) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            database: index.database.clone(),
            table: index.table.clone(),
            index: index.name.clone(),
            total: 0,
            completed: 0,
            started_at: now,
            updated_at: now,
            errors: Vec::new(),
            fatal_error: None,
            in_progress: true,
        }
    }

    /// Share of documents walked, 100 for an empty table
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
    }

    /// Estimated milliseconds left: elapsed / completed × remaining
    pub fn eta_ms(&self) -> Option<i64> {
        if self.completed == 0 {
            return None;
        }
        let elapsed = (self.updated_at - self.started_at).num_milliseconds().max(0);
        let remaining = self.total.saturating_sub(self.completed);
        Some((elapsed as f64 / self.completed as f64 * remaining as f64).round() as i64)
    }

    pub fn succeeded(&self) -> bool {
        !self.in_progress && self.fatal_error.is_none()
    }
}

/// Finished records kept by `BuildStatusRegistry::new`
pub const DEFAULT_STATUS_RETENTION: usize = 1_000;

#[derive(Debug, Default)]
struct RegistryState {
    statuses: HashMap<Uuid, IndexBuildStatus>,
    active: HashSet<Uuid>,
    /// Finished ids in completion order
    finished: VecDeque<Uuid>,
}

/// Shared store of build statuses
#[derive(Debug)]
pub struct BuildStatusRegistry {
    state: RwLock<RegistryState>,
    retention: usize,
}

impl Default for BuildStatusRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_STATUS_RETENTION)
    }
}

impl BuildStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retention` finished records
    pub fn with_retention(retention: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            retention,
        }
    }

    /// Record a new in-progress build for `index`
    pub async fn register(&self, index: &Index) -> Uuid {
        let status = IndexBuildStatus::new(index);
        let id = status.id;

        let mut state = self.state.write().await;
        state.active.insert(id);
        state.statuses.insert(id, status);
        id
    }

    pub async fn set_total(&self, id: Uuid, total: u64) {
        self.update(id, |s| s.total = total).await;
    }

    /// Persist the running document count
    pub async fn record_progress(&self, id: Uuid, completed: u64) {
        self.update(id, |s| s.completed = completed).await;
    }

    pub async fn record_error(&self, id: Uuid, error: impl Into<String>) {
        let error = error.into();
        self.update(id, |s| s.errors.push(error)).await;
    }

    /// Mark done with a fatal error
    pub async fn fail(&self, id: Uuid, error: impl Into<String>) {
        let error = error.into();
        self.finish(id, |s| s.fatal_error = Some(error)).await;
    }

    /// Mark done successfully
    pub async fn complete(&self, id: Uuid) {
        self.finish(id, |_| {}).await;
    }

    pub async fn get(&self, id: Uuid) -> Option<IndexBuildStatus> {
        self.state.read().await.statuses.get(&id).cloned()
    }

    /// All statuses (or only in-progress ones), oldest first
    pub async fn list(&self, active_only: bool) -> Vec<IndexBuildStatus> {
        let state = self.state.read().await;
        let mut statuses: Vec<IndexBuildStatus> = state
            .statuses
            .values()
            .filter(|s| !active_only || state.active.contains(&s.id))
            .cloned()
            .collect();
        statuses.sort_by_key(|s| s.started_at);
        statuses
    }

    async fn update(&self, id: Uuid, f: impl FnOnce(&mut IndexBuildStatus)) {
        let mut state = self.state.write().await;
        match state.statuses.get_mut(&id) {
            Some(status) => {
                f(status);
                status.updated_at = Utc::now();
            }
            None => tracing::warn!(status_id = %id, "Unknown build status"),
        }
    }

    async fn finish(&self, id: Uuid, f: impl FnOnce(&mut IndexBuildStatus)) {
        let mut state = self.state.write().await;
        if state.active.remove(&id) {
            state.finished.push_back(id);
        }
        if let Some(status) = state.statuses.get_mut(&id) {
            f(status);
            status.in_progress = false;
            status.updated_at = Utc::now();
        }

        while state.finished.len() > self.retention {
            if let Some(evicted) = state.finished.pop_front() {
                state.statuses.remove(&evicted);
                tracing::debug!(status_id = %evicted, "Evicted finished build status");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldDataType;
    use crate::index::IndexField;
    use chrono::Duration;

    fn index() -> Index {
        Index::new(
            "db",
            "users",
            "by_age",
            vec![IndexField::new("age", FieldDataType::Integer)],
            false,
        )
    }

    #[test]
    fn test_percent_and_eta() {
        let mut status = IndexBuildStatus::new(&index());
        assert_eq!(status.percent_complete(), 100.0);
        assert_eq!(status.eta_ms(), None);

        status.total = 200;
        status.completed = 50;
        status.updated_at = status.started_at + Duration::milliseconds(1_000);

        assert_eq!(status.percent_complete(), 25.0);
        assert_eq!(status.eta_ms(), Some(3_000));
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = BuildStatusRegistry::new();
        let id = registry.register(&index()).await;

        registry.set_total(id, 10).await;
        registry.record_progress(id, 4).await;
        registry.record_error(id, "doc 1: bad age").await;

        let status = registry.get(id).await.unwrap();
        assert!(status.in_progress);
        assert_eq!(status.completed, 4);
        assert_eq!(status.errors.len(), 1);
        assert_eq!(registry.list(true).await.len(), 1);

        registry.complete(id).await;

        let status = registry.get(id).await.unwrap();
        assert!(status.succeeded());
        assert!(registry.list(true).await.is_empty());
        assert_eq!(registry.list(false).await.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_failure() {
        let registry = BuildStatusRegistry::new();
        let id = registry.register(&index()).await;

        registry.fail(id, "store unavailable").await;

        let status = registry.get(id).await.unwrap();
        assert!(!status.in_progress);
        assert!(!status.succeeded());
        assert_eq!(status.fatal_error.as_deref(), Some("store unavailable"));
    }

    #[tokio::test]
    async fn test_finished_records_are_capped() {
        let registry = BuildStatusRegistry::with_retention(2);
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(registry.register(&index()).await);
        }

        registry.complete(ids[0]).await;
        registry.fail(ids[1], "boom").await;
        registry.complete(ids[2]).await;

        assert!(registry.get(ids[0]).await.is_none());
        assert!(registry.get(ids[1]).await.is_some());
        assert!(registry.get(ids[2]).await.is_some());

        // Running builds never count against the cap
        assert!(registry.get(ids[3]).await.unwrap().in_progress);
        assert_eq!(registry.list(false).await.len(), 3);

        registry.complete(ids[3]).await;
        assert!(registry.get(ids[1]).await.is_none());
        assert_eq!(registry.list(false).await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let registry = BuildStatusRegistry::new();
        let id = Uuid::new_v4();
        registry.record_progress(id, 5).await;
        assert!(registry.get(id).await.is_none());
    }
}
