//! Metadata repository
//!
//! Catalog of databases → tables → indexes. Held in memory behind a
//! `tokio::sync::RwLock`, optionally persisted as one JSON file rewritten
//! after every mutation.

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::index::Index;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

const CATALOG_VERSION: u32 = 1;

/// Longest database, table or index name
pub const MAX_NAME_LEN: usize = 48;

/// Public view of a database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub table_count: usize,
}

/// Public view of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub database: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub index_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableEntry {
    created_at: DateTime<Utc>,
    /// Creation order, which is also index maintenance order
    indexes: Vec<Index>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseEntry {
    created_at: DateTime<Utc>,
    tables: BTreeMap<String, TableEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogData {
    version: u32,
    databases: BTreeMap<String, DatabaseEntry>,
}

impl Default for CatalogData {
    fn default() -> Self {
        Self {
            version: CATALOG_VERSION,
            databases: BTreeMap::new(),
        }
    }
}

impl CatalogData {
    fn database(&self, name: &str) -> CatalogResult<&DatabaseEntry> {
        self.databases
            .get(name)
            .ok_or_else(|| CatalogError::DatabaseNotFound(name.to_string()))
    }

    fn database_mut(&mut self, name: &str) -> CatalogResult<&mut DatabaseEntry> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| CatalogError::DatabaseNotFound(name.to_string()))
    }

    fn table(&self, database: &str, table: &str) -> CatalogResult<&TableEntry> {
        self.database(database)?
            .tables
            .get(table)
            .ok_or_else(|| CatalogError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })
    }

    fn table_mut(&mut self, database: &str, table: &str) -> CatalogResult<&mut TableEntry> {
        self.database_mut(database)?
            .tables
            .get_mut(table)
            .ok_or_else(|| CatalogError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })
    }
}

/// Check a database, table or index name
pub fn validate_name(kind: &str, name: &str) -> CatalogResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let starts_ok = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphanumeric())
        .unwrap_or(false);

    if name.is_empty() || name.len() > MAX_NAME_LEN || !valid_chars || !starts_ok {
        return Err(CatalogError::InvalidName(format!(
            "{} name {:?} must be 1-{} characters of [A-Za-z0-9_-], starting with a letter or digit",
            kind, name, MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Databases, tables and index definitions
#[derive(Debug, Default)]
pub struct MetadataRepository {
    data: RwLock<CatalogData>,
    path: Option<PathBuf>,
}

impl MetadataRepository {
    /// Empty, memory-only catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog persisted at `path`, loading it when present
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let data: CatalogData = serde_json::from_str(&content)?;
            tracing::info!(
                databases = data.databases.len(),
                "Loaded catalog from {:?}",
                path
            );
            data
        } else {
            CatalogData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path.to_path_buf()),
        })
    }

    fn save(&self, data: &CatalogData) -> CatalogResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(data)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub async fn create_database(&self, name: &str) -> CatalogResult<DatabaseInfo> {
        validate_name("database", name)?;

        let mut data = self.data.write().await;
        if data.databases.contains_key(name) {
            return Err(CatalogError::DatabaseExists(name.to_string()));
        }

        let entry = DatabaseEntry {
            created_at: Utc::now(),
            tables: BTreeMap::new(),
        };
        let info = DatabaseInfo {
            name: name.to_string(),
            created_at: entry.created_at,
            table_count: 0,
        };
        data.databases.insert(name.to_string(), entry);
        self.save(&data)?;

        tracing::info!(database = %name, "Created database");
        Ok(info)
    }

    pub async fn list_databases(&self) -> Vec<DatabaseInfo> {
        let data = self.data.read().await;
        data.databases
            .iter()
            .map(|(name, entry)| DatabaseInfo {
                name: name.clone(),
                created_at: entry.created_at,
                table_count: entry.tables.len(),
            })
            .collect()
    }

    /// Remove a database; returns each dropped table with its indexes
    pub async fn delete_database(&self, name: &str) -> CatalogResult<Vec<(String, Vec<Index>)>> {
        let mut data = self.data.write().await;
        let entry = data
            .databases
            .remove(name)
            .ok_or_else(|| CatalogError::DatabaseNotFound(name.to_string()))?;
        self.save(&data)?;

        tracing::info!(database = %name, tables = entry.tables.len(), "Deleted database");
        Ok(entry
            .tables
            .into_iter()
            .map(|(table, t)| (table, t.indexes))
            .collect())
    }

    pub async fn create_table(&self, database: &str, table: &str) -> CatalogResult<TableInfo> {
        validate_name("table", table)?;

        let mut data = self.data.write().await;
        let db = data.database_mut(database)?;
        if db.tables.contains_key(table) {
            return Err(CatalogError::TableExists {
                database: database.to_string(),
                table: table.to_string(),
            });
        }

        let entry = TableEntry {
            created_at: Utc::now(),
            indexes: Vec::new(),
        };
        let info = TableInfo {
            database: database.to_string(),
            name: table.to_string(),
            created_at: entry.created_at,
            index_count: 0,
        };
        db.tables.insert(table.to_string(), entry);
        self.save(&data)?;

        tracing::info!(database = %database, table = %table, "Created table");
        Ok(info)
    }

    pub async fn list_tables(&self, database: &str) -> CatalogResult<Vec<TableInfo>> {
        let data = self.data.read().await;
        Ok(data
            .database(database)?
            .tables
            .iter()
            .map(|(name, entry)| TableInfo {
                database: database.to_string(),
                name: name.clone(),
                created_at: entry.created_at,
                index_count: entry.indexes.len(),
            })
            .collect())
    }

    /// Fail unless `database.table` exists
    pub async fn ensure_table(&self, database: &str, table: &str) -> CatalogResult<()> {
        let data = self.data.read().await;
        data.table(database, table).map(|_| ())
    }

    /// Remove a table; returns its indexes
    pub async fn delete_table(&self, database: &str, table: &str) -> CatalogResult<Vec<Index>> {
        let mut data = self.data.write().await;
        let entry = data
            .database_mut(database)?
            .tables
            .remove(table)
            .ok_or_else(|| CatalogError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })?;
        self.save(&data)?;

        tracing::info!(database = %database, table = %table, "Deleted table");
        Ok(entry.indexes)
    }

    /// Register an index definition at the end of its table's list
    pub async fn add_index(&self, index: Index) -> CatalogResult<()> {
        validate_name("index", &index.name)?;

        let mut data = self.data.write().await;
        let taken = data
            .databases
            .values()
            .flat_map(|db| db.tables.values())
            .flat_map(|t| t.indexes.iter())
            .any(|i| i.table_name == index.table_name);
        let table = data.table_mut(&index.database, &index.table)?;
        if taken || table.indexes.iter().any(|i| i.name == index.name) {
            return Err(CatalogError::IndexExists {
                database: index.database.clone(),
                table: index.table.clone(),
                index: index.name.clone(),
            });
        }

        tracing::info!(
            database = %index.database,
            table = %index.table,
            index = %index.name,
            materialized = %index.table_name,
            "Registered index"
        );
        table.indexes.push(index);
        self.save(&data)
    }

    pub async fn get_index(&self, database: &str, table: &str, name: &str) -> CatalogResult<Index> {
        let data = self.data.read().await;
        data.table(database, table)?
            .indexes
            .iter()
            .find(|i| i.name == name)
            .cloned()
            .ok_or_else(|| index_not_found(database, table, name))
    }

    /// Indexes of a table in creation order
    pub async fn list_indexes(&self, database: &str, table: &str) -> CatalogResult<Vec<Index>> {
        let data = self.data.read().await;
        Ok(data.table(database, table)?.indexes.clone())
    }

    pub async fn remove_index(&self, database: &str, table: &str, name: &str) -> CatalogResult<Index> {
        let mut data = self.data.write().await;
        let entry = data.table_mut(database, table)?;
        let pos = entry
            .indexes
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| index_not_found(database, table, name))?;
        let index = entry.indexes.remove(pos);
        self.save(&data)?;

        tracing::info!(database = %database, table = %table, index = %name, "Removed index");
        Ok(index)
    }

    /// Flip `active` on the definition registered under `generation`
    ///
    /// Fails with `IndexNotFound` once that definition has been removed,
    /// even if another index with the same name took its place.
    pub async fn set_index_active(
        &self,
        database: &str,
        table: &str,
        name: &str,
        generation: Uuid,
        active: bool,
    ) -> CatalogResult<()> {
        let mut data = self.data.write().await;
        let index = data
            .table_mut(database, table)?
            .indexes
            .iter_mut()
            .find(|i| i.name == name && i.generation == generation)
            .ok_or_else(|| index_not_found(database, table, name))?;
        index.active = active;
        self.save(&data)
    }

    /// Whether `index` is still the registered definition for its name
    pub async fn is_current(&self, index: &Index) -> bool {
        let data = self.data.read().await;
        data.table(&index.database, &index.table)
            .map(|t| {
                t.indexes
                    .iter()
                    .any(|i| i.name == index.name && i.generation == index.generation)
            })
            .unwrap_or(false)
    }
}

fn index_not_found(database: &str, table: &str, name: &str) -> CatalogError {
    CatalogError::IndexNotFound {
        database: database.to_string(),
        table: table.to_string(),
        index: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldDataType;
    use crate::index::IndexField;
    use tempfile::tempdir;

    fn index(name: &str) -> Index {
        Index::new(
            "shop",
            "orders",
            name,
            vec![IndexField::new("sku", FieldDataType::Text)],
            false,
        )
    }

    async fn repo() -> MetadataRepository {
        let repo = MetadataRepository::new();
        repo.create_database("shop").await.unwrap();
        repo.create_table("shop", "orders").await.unwrap();
        repo
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("table", "orders").is_ok());
        assert!(validate_name("table", "order-lines_2").is_ok());
        assert!(validate_name("table", "").is_err());
        assert!(validate_name("table", "_hidden").is_err());
        assert!(validate_name("table", "a b").is_err());
        assert!(validate_name("table", &"x".repeat(49)).is_err());
    }

    #[tokio::test]
    async fn test_database_and_table_lifecycle() {
        let repo = repo().await;

        let err = repo.create_database("shop").await.unwrap_err();
        assert!(err.is_conflict());

        let dbs = repo.list_databases().await;
        assert_eq!(dbs.len(), 1);
        assert_eq!(dbs[0].table_count, 1);

        repo.ensure_table("shop", "orders").await.unwrap();
        assert!(repo.ensure_table("shop", "nope").await.unwrap_err().is_not_found());
        assert!(repo.create_table("nope", "t").await.unwrap_err().is_not_found());

        repo.add_index(index("by_sku")).await.unwrap();
        let indexes = repo.delete_table("shop", "orders").await.unwrap();
        assert_eq!(indexes.len(), 1);
        assert!(repo.list_tables("shop").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_indexes_keep_creation_order() {
        let repo = repo().await;
        for name in ["c_ix", "a_ix", "b_ix"] {
            repo.add_index(index(name)).await.unwrap();
        }

        let names: Vec<String> = repo
            .list_indexes("shop", "orders")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["c_ix", "a_ix", "b_ix"]);

        let err = repo.add_index(index("a_ix")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_activate_and_remove_index() {
        let repo = repo().await;
        let by_sku = index("by_sku");
        repo.add_index(by_sku.clone()).await.unwrap();
        assert!(!repo.get_index("shop", "orders", "by_sku").await.unwrap().active);

        repo.set_index_active("shop", "orders", "by_sku", by_sku.generation, true)
            .await
            .unwrap();
        assert!(repo.get_index("shop", "orders", "by_sku").await.unwrap().active);

        let removed = repo.remove_index("shop", "orders", "by_sku").await.unwrap();
        assert_eq!(removed.name, "by_sku");
        assert!(repo
            .get_index("shop", "orders", "by_sku")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_database_returns_tables() {
        let repo = repo().await;
        repo.add_index(index("by_sku")).await.unwrap();

        let dropped = repo.delete_database("shop").await.unwrap();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].0, "orders");
        assert_eq!(dropped[0].1[0].name, "by_sku");
        assert!(repo.list_databases().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta").join("catalog.json");

        {
            let repo = MetadataRepository::open(&path).unwrap();
            repo.create_database("shop").await.unwrap();
            repo.create_table("shop", "orders").await.unwrap();
            let by_sku = index("by_sku");
            repo.add_index(by_sku.clone()).await.unwrap();
            repo.set_index_active("shop", "orders", "by_sku", by_sku.generation, true)
                .await
                .unwrap();
        }

        let reopened = MetadataRepository::open(&path).unwrap();
        let index = reopened.get_index("shop", "orders", "by_sku").await.unwrap();
        assert!(index.active);
        assert_eq!(
            index.table_name,
            crate::index::materialized_table_name("shop", "orders", "by_sku")
        );
    }

    #[tokio::test]
    async fn test_activation_ignores_replaced_generation() {
        let repo = repo().await;
        let old = index("by_sku");
        repo.add_index(old.clone()).await.unwrap();
        assert!(repo.is_current(&old).await);

        repo.remove_index("shop", "orders", "by_sku").await.unwrap();
        let new = index("by_sku");
        repo.add_index(new.clone()).await.unwrap();
        assert!(!repo.is_current(&old).await);
        assert!(repo.is_current(&new).await);

        let err = repo
            .set_index_active("shop", "orders", "by_sku", old.generation, true)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!repo.get_index("shop", "orders", "by_sku").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_taken_table_name_is_conflict() {
        let repo = repo().await;
        let first = index("by_sku");
        repo.add_index(first.clone()).await.unwrap();

        let mut clash = index("by_sku_2");
        clash.table_name = first.table_name.clone();
        let err = repo.add_index(clash).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.list_indexes("shop", "orders").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_case_and_dash_variants_coexist() {
        let repo = repo().await;
        for name in ["by_a", "by-a", "By_A"] {
            repo.add_index(index(name)).await.unwrap();
        }
        assert_eq!(repo.list_indexes("shop", "orders").await.unwrap().len(), 3);
    }
}
