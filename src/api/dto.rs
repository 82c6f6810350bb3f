//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use crate::catalog::{DatabaseInfo, TableInfo};
use crate::index::{Index, IndexBuildStatus, IndexField};
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================
// DATABASE / TABLE DTOs
// ============================================

/// Create database or table request
#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    pub name: String,
}

/// List databases response
#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseListResponse {
    pub databases: Vec<DatabaseInfo>,
    pub total: usize,
}

/// List tables response
#[derive(Debug, Serialize, Deserialize)]
pub struct TableListResponse {
    pub database: String,
    pub tables: Vec<TableInfo>,
    pub total: usize,
}

// ============================================
// DOCUMENT DTOs
// ============================================

/// Stored document as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub database: String,
    pub table: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            database: doc.database,
            table: doc.table,
            payload: doc.payload,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Documents matched by an index lookup
#[derive(Debug, Serialize, Deserialize)]
pub struct FindResponse {
    pub index: String,
    pub documents: Vec<DocumentResponse>,
    pub total: usize,
}

// ============================================
// INDEX DTOs
// ============================================

/// Index definition
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub name: String,
    pub database: String,
    pub table: String,
    pub fields: Vec<IndexField>,
    pub unique: bool,
    /// False until the bulk build has finished
    pub active: bool,
    /// Materialized index table name
    pub table_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Index> for IndexResponse {
    fn from(index: Index) -> Self {
        Self {
            name: index.name,
            database: index.database,
            table: index.table,
            fields: index.fields,
            unique: index.unique,
            active: index.active,
            table_name: index.table_name,
            created_at: index.created_at,
        }
    }
}

/// List indexes response
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexListResponse {
    pub indexes: Vec<IndexResponse>,
    pub total: usize,
}

/// Create index response: the inactive index plus where to poll its build
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateIndexResponse {
    pub index: IndexResponse,
    pub status_id: Uuid,
    pub status_url: String,
}

/// Equality lookup request
#[derive(Debug, Deserialize)]
pub struct FindRequest {
    /// Value compared against the index's first field
    pub value: Value,
}

// ============================================
// BUILD STATUS DTOs
// ============================================

/// Query parameters for listing builds
#[derive(Debug, Default, Deserialize)]
pub struct BuildListQuery {
    /// Only builds still running
    #[serde(default)]
    pub active: bool,
}

/// Progress of one bulk index build
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildStatusResponse {
    pub id: Uuid,
    pub database: String,
    pub table: String,
    pub index: String,
    pub total: u64,
    pub completed: u64,
    pub percent_complete: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_ms: Option<i64>,
    pub in_progress: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl From<IndexBuildStatus> for BuildStatusResponse {
    fn from(status: IndexBuildStatus) -> Self {
        let percent_complete = status.percent_complete();
        let eta_ms = status.eta_ms();
        Self {
            id: status.id,
            database: status.database,
            table: status.table,
            index: status.index,
            total: status.total,
            completed: status.completed,
            percent_complete,
            eta_ms,
            in_progress: status.in_progress,
            started_at: status.started_at,
            updated_at: status.updated_at,
            errors: status.errors,
            fatal_error: status.fatal_error,
        }
    }
}

/// List builds response
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildStatusListResponse {
    pub builds: Vec<BuildStatusResponse>,
    pub total: usize,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Bucket tables status
    pub buckets: String,
    /// Databases registered in the catalog
    pub databases: usize,
    /// Bucket boundaries per data type
    pub bucket_tables: Vec<BucketTableHealth>,
    /// Index builds still running
    pub active_builds: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BucketTableHealth {
    pub data_type: String,
    pub buckets: usize,
}
