//! Index definitions and index-table rows

use crate::codec::{FieldDataType, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Longest materialized table name the backend accepts
pub const MAX_TABLE_NAME_LEN: usize = 48;

/// Partition key column of every index table
pub const BUCKET_COLUMN: &str = "bucket";

/// Document id clustering column (absent on unique indexes)
pub const ID_COLUMN: &str = "id";

fn default_ascending() -> bool {
    true
}

/// One declared field of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    /// Field path; dots descend into nested objects
    pub name: String,
    pub data_type: FieldDataType,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

impl IndexField {
    pub fn new(name: impl Into<String>, data_type: FieldDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ascending: true,
        }
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }
}

/// Secondary index over one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub database: String,
    pub table: String,
    pub name: String,
    /// Ordered fields; the first one drives the bucket
    pub fields: Vec<IndexField>,
    pub unique: bool,
    /// Set once the initial bulk pass has walked every document
    pub active: bool,
    /// Physical index table name
    pub table_name: String,
    /// Distinguishes this definition from a later one with the same name
    #[serde(default = "Uuid::new_v4")]
    pub generation: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Index {
    /// New inactive index
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        fields: Vec<IndexField>,
        unique: bool,
    ) -> Self {
        let database = database.into();
        let table = table.into();
        let name = name.into();
        let table_name = materialized_table_name(&database, &table, &name);

        Self {
            database,
            table,
            name,
            fields,
            unique,
            active: false,
            table_name,
            generation: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    /// Field whose token selects the partition
    pub fn bucket_field(&self) -> Option<&IndexField> {
        self.fields.first()
    }

    pub fn schema(&self) -> IndexTableSchema {
        IndexTableSchema {
            name: self.table_name.clone(),
            fields: self.fields.clone(),
            unique: self.unique,
        }
    }
}

/// Physical table name for an index
///
/// Lowercase `ix_{database}_{table}_{index}` with every character outside
/// `[a-z0-9_]` replaced by `_`, cut to fit and always suffixed with a CRC32
/// of the unsanitized triple. Case folding and `-` mapping lose
/// information, so the suffix is what keeps distinct triples apart.
pub fn materialized_table_name(database: &str, table: &str, index: &str) -> String {
    let raw = format!("ix_{}_{}_{}", database, table, index);
    let mut sanitized: String = raw
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let checksum = crc32fast::hash(format!("{}\0{}\0{}", database, table, index).as_bytes());
    sanitized.truncate(MAX_TABLE_NAME_LEN - 9);
    format!("{}_{:08x}", sanitized, checksum)
}

/// DDL description of an index table
///
/// Partition key `bucket`; clustering columns are the declared fields in
/// order followed by `id` (unless unique); non-key columns are `payload`,
/// `created_at` and `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTableSchema {
    pub name: String,
    pub fields: Vec<IndexField>,
    pub unique: bool,
}

impl IndexTableSchema {
    pub fn clustering_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();
        if !self.unique {
            columns.push(ID_COLUMN.to_string());
        }
        columns
    }
}

/// A denormalized row of an index table
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub table: String,
    pub bucket: i64,
    pub id: Uuid,
    /// Typed values of the declared fields, in declaration order
    pub columns: Vec<(String, FieldValue)>,
    /// Serialized document payload
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub unique: bool,
}

impl IndexRow {
    /// Primary key of this row
    pub fn key(&self) -> IndexKey {
        IndexKey {
            table: self.table.clone(),
            bucket: self.bucket,
            columns: self.columns.clone(),
            id: if self.unique { None } else { Some(self.id) },
        }
    }

    /// Value of the bucket field column
    pub fn first_column(&self) -> Option<&FieldValue> {
        self.columns.first().map(|(_, v)| v)
    }

    pub fn decode_payload(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.payload)
    }
}

/// Primary key of an index row: bucket, field values, then document id
#[derive(Debug, Clone, PartialEq)]
pub struct IndexKey {
    pub table: String,
    pub bucket: i64,
    pub columns: Vec<(String, FieldValue)>,
    pub id: Option<Uuid>,
}

impl IndexKey {
    /// Clustering key rendered as a string, unique within a bucket
    pub fn clustering_key(&self) -> String {
        let mut key = String::new();
        for (i, (_, value)) in self.columns.iter().enumerate() {
            if i > 0 {
                key.push('|');
            }
            key.push_str(&value.to_json().to_string());
        }
        if let Some(id) = self.id {
            key.push('|');
            key.push_str(&id.to_string());
        }
        key
    }
}

/// One write against an index table
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOperation {
    Insert(IndexRow),
    /// In-place rewrite of non-key columns
    Update(IndexRow),
    Delete(IndexKey),
}

impl IndexOperation {
    /// Target index table
    pub fn table(&self) -> &str {
        match self {
            IndexOperation::Insert(row) | IndexOperation::Update(row) => &row.table,
            IndexOperation::Delete(key) => &key.table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IndexOperation::Insert(_) => "insert",
            IndexOperation::Update(_) => "update",
            IndexOperation::Delete(_) => "delete",
        }
    }

    /// Bucket the operation lands in
    pub fn bucket(&self) -> i64 {
        match self {
            IndexOperation::Insert(row) | IndexOperation::Update(row) => row.bucket,
            IndexOperation::Delete(key) => key.bucket,
        }
    }
}
