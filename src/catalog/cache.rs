//! Read-through cache of per-table index catalogs
//!
//! Values are whole `Arc<Vec<Index>>` snapshots replaced atomically. Misses
//! and invalidations for one table serialize on a per-key
//! `tokio::sync::Mutex`, so a loader never races an invalidation of the same
//! key. Entries older than the TTL are reloaded on next access.

use crate::catalog::error::CatalogResult;
use crate::index::Index;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache key: one table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogKey {
    pub database: String,
    pub table: String,
}

impl CatalogKey {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    indexes: Arc<Vec<Index>>,
    loaded_at: Instant,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Index catalog cache with per-key locking and a TTL
#[derive(Debug)]
pub struct IndexCatalogCache {
    entries: RwLock<HashMap<CatalogKey, CacheEntry>>,
    locks: Mutex<HashMap<CatalogKey, Arc<tokio::sync::Mutex<()>>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IndexCatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key_lock(&self, key: &CatalogKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    async fn fresh(&self, key: &CatalogKey) -> Option<Arc<Vec<Index>>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.loaded_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.indexes))
    }

    /// Cached indexes for `key`, running `loader` on a miss or stale entry
    pub async fn get_or_populate<F, Fut>(&self, key: &CatalogKey, loader: F) -> CatalogResult<Arc<Vec<Index>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<Vec<Index>>>,
    {
        if let Some(indexes) = self.fresh(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(indexes);
        }

        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        // Another task may have populated while we waited
        if let Some(indexes) = self.fresh(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(indexes);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let indexes = Arc::new(loader().await?);

        tracing::debug!(
            database = %key.database,
            table = %key.table,
            indexes = indexes.len(),
            "Populated index catalog cache"
        );

        self.entries.write().await.insert(
            key.clone(),
            CacheEntry {
                indexes: Arc::clone(&indexes),
                loaded_at: Instant::now(),
            },
        );
        Ok(indexes)
    }

    /// Drop the entry for `key`
    pub async fn invalidate(&self, key: &CatalogKey) {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        if self.entries.write().await.remove(key).is_some() {
            tracing::debug!(
                database = %key.database,
                table = %key.table,
                "Invalidated index catalog cache"
            );
        }
    }

    /// Drop every entry of a database
    pub async fn invalidate_database(&self, database: &str) {
        let keys: Vec<CatalogKey> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.database == database)
            .cloned()
            .collect();

        for key in keys {
            self.invalidate(&key).await;
        }
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldDataType;
    use crate::index::IndexField;
    use std::sync::atomic::AtomicUsize;

    fn index(name: &str) -> Index {
        Index::new("db", "t", name, vec![IndexField::new("f", FieldDataType::Text)], false)
    }

    #[tokio::test]
    async fn test_populates_once() {
        let cache = IndexCatalogCache::new(Duration::from_secs(60));
        let key = CatalogKey::new("db", "t");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let indexes = cache
                .get_or_populate(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![index("a")])
                })
                .await
                .unwrap();
            assert_eq!(indexes.len(), 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache = IndexCatalogCache::new(Duration::from_secs(60));
        let key = CatalogKey::new("db", "t");

        cache
            .get_or_populate(&key, || async { Ok(vec![index("a")]) })
            .await
            .unwrap();
        cache.invalidate(&key).await;

        let indexes = cache
            .get_or_populate(&key, || async { Ok(vec![index("a"), index("b")]) })
            .await
            .unwrap();
        assert_eq!(indexes.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reloads() {
        let cache = IndexCatalogCache::new(Duration::ZERO);
        let key = CatalogKey::new("db", "t");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_populate(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::new())
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let cache = IndexCatalogCache::new(Duration::from_secs(60));
        let key = CatalogKey::new("db", "t");

        let err = cache
            .get_or_populate(&key, || async {
                Err(crate::catalog::CatalogError::DatabaseNotFound("db".into()))
            })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_invalidate_database() {
        let cache = IndexCatalogCache::new(Duration::from_secs(60));
        for table in ["a", "b"] {
            cache
                .get_or_populate(&CatalogKey::new("db", table), || async { Ok(Vec::new()) })
                .await
                .unwrap();
        }
        cache
            .get_or_populate(&CatalogKey::new("other", "a"), || async { Ok(Vec::new()) })
            .await
            .unwrap();

        cache.invalidate_database("db").await;
        assert_eq!(cache.stats().await.entries, 1);
    }
}
