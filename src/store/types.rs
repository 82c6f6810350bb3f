//! Documents and batch statements

use crate::index::IndexOperation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A schemaless JSON document scoped to (database, table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub database: String,
    pub table: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// New document with a fresh v4 id
    pub fn new(database: impl Into<String>, table: impl Into<String>, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            database: database.into(),
            table: table.into(),
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same document with a replaced payload and a bumped `updated_at`
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            payload,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(&self.database, &self.table, self.id)
    }

    /// Opaque blob stored in index rows
    pub fn payload_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.payload)
    }
}

/// Address of a document in the base table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub database: String,
    pub table: String,
    pub id: Uuid,
}

impl DocumentKey {
    pub fn new(database: impl Into<String>, table: impl Into<String>, id: Uuid) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            id,
        }
    }
}

/// One statement of a write batch
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    PutDocument(Document),
    DeleteDocument(DocumentKey),
    Index(IndexOperation),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::PutDocument(_) => "put_document",
            Statement::DeleteDocument(_) => "delete_document",
            Statement::Index(op) => op.kind(),
        }
    }
}

impl From<IndexOperation> for Statement {
    fn from(op: IndexOperation) -> Self {
        Statement::Index(op)
    }
}

/// One page of a scan
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// More items exist past this page
    pub has_more: bool,
}

