//! Index Maintenance Engine
//!
//! Computes the index-table writes a document mutation requires. Pure with
//! respect to the store: callers submit the returned operations together
//! with the base-table write.
//!
//! # Update diffing
//!
//! ```text
//! old {"f": "A"}  new {"f": "B"}   → Delete(bucket(A), A, id) + Insert(bucket(B), B, id)
//! old {"f": "A"}  new {"f": "A", "x": 1} → Update(bucket(A), A, id)
//! ```
//!
//! Without the delete, the old row would stay behind as an orphan pointing
//! at a document whose indexed value moved.

use crate::bucket::BucketLocator;
use crate::codec::FieldValue;
use crate::index::error::{IndexError, IndexResult};
use crate::index::types::{Index, IndexField, IndexKey, IndexOperation, IndexRow};
use crate::store::Document;
use serde_json::Value;
use std::sync::Arc;

/// Look up a dotted field path; JSON `null` counts as absent
pub fn extract_field<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = payload;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Bucket plus typed key columns of one document under one index
#[derive(Debug, Clone, PartialEq)]
struct ResolvedKey {
    bucket: i64,
    columns: Vec<(String, FieldValue)>,
}

/// Generates index-table operations for document mutations
#[derive(Debug, Clone)]
pub struct IndexMaintenance {
    locator: Arc<BucketLocator>,
}

impl IndexMaintenance {
    pub fn new(locator: Arc<BucketLocator>) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &BucketLocator {
        &self.locator
    }

    /// Insert for a newly created document, `None` if a field is absent
    pub fn generate_create(&self, index: &Index, doc: &Document) -> IndexResult<Option<IndexOperation>> {
        match self.resolve(index, &doc.payload)? {
            Some(key) => Ok(Some(IndexOperation::Insert(self.row(index, doc, key)?))),
            None => Ok(None),
        }
    }

    /// Operations moving a document's index row from `old` to `new`
    pub fn generate_update(
        &self,
        index: &Index,
        old: &Document,
        new: &Document,
    ) -> IndexResult<Vec<IndexOperation>> {
        let mut ops = Vec::new();

        if !indexed_fields_changed(&index.fields, &old.payload, &new.payload) {
            if let Some(key) = self.resolve(index, &new.payload)? {
                ops.push(IndexOperation::Update(self.row(index, new, key)?));
            }
            return Ok(ops);
        }

        if let Some(key) = self.resolve_existing(index, old) {
            ops.push(IndexOperation::Delete(self.key(index, old, key)));
        }

        if let Some(key) = self.resolve(index, &new.payload)? {
            ops.push(IndexOperation::Insert(self.row(index, new, key)?));
        }

        Ok(ops)
    }

    /// Delete of the document's row, `None` if it never had one
    pub fn generate_delete(&self, index: &Index, doc: &Document) -> IndexResult<Option<IndexOperation>> {
        Ok(self
            .resolve_existing(index, doc)
            .map(|key| IndexOperation::Delete(self.key(index, doc, key))))
    }

    /// `generate_create` over every index, in declaration order
    pub fn for_create(&self, indexes: &[Index], doc: &Document) -> IndexResult<Vec<IndexOperation>> {
        let mut ops = Vec::with_capacity(indexes.len());
        for index in indexes {
            ops.extend(self.generate_create(index, doc)?);
        }
        Ok(ops)
    }

    pub fn for_update(
        &self,
        indexes: &[Index],
        old: &Document,
        new: &Document,
    ) -> IndexResult<Vec<IndexOperation>> {
        let mut ops = Vec::with_capacity(indexes.len() * 2);
        for index in indexes {
            ops.extend(self.generate_update(index, old, new)?);
        }
        Ok(ops)
    }

    pub fn for_delete(&self, indexes: &[Index], doc: &Document) -> IndexResult<Vec<IndexOperation>> {
        let mut ops = Vec::with_capacity(indexes.len());
        for index in indexes {
            ops.extend(self.generate_delete(index, doc)?);
        }
        Ok(ops)
    }

    /// Resolve the key of a stored document; bad values mean no row exists
    fn resolve_existing(&self, index: &Index, doc: &Document) -> Option<ResolvedKey> {
        match self.resolve(index, &doc.payload) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(
                    index = %index.name,
                    doc_id = %doc.id,
                    error = %e,
                    "Stored document has no index row"
                );
                None
            }
        }
    }

    /// Bucket and typed columns, `None` when any field is absent
    fn resolve(&self, index: &Index, payload: &Value) -> IndexResult<Option<ResolvedKey>> {
        let Some(bucket_field) = index.bucket_field() else {
            return Ok(None);
        };

        let Some(first) = coerce_field(bucket_field, payload)? else {
            return Ok(None);
        };

        let bucket = match self.locator.locate_value(&first) {
            Ok(bucket) => bucket,
            Err(e) if e.is_empty_value() => return Ok(None),
            Err(e) => return Err(IndexError::field(&bucket_field.name, e)),
        };

        let mut columns = Vec::with_capacity(index.fields.len());
        columns.push((bucket_field.name.clone(), first));

        for field in &index.fields[1..] {
            match coerce_field(field, payload)? {
                Some(value) => columns.push((field.name.clone(), value)),
                None => return Ok(None),
            }
        }

        Ok(Some(ResolvedKey { bucket, columns }))
    }

    fn row(&self, index: &Index, doc: &Document, key: ResolvedKey) -> IndexResult<IndexRow> {
        Ok(IndexRow {
            table: index.table_name.clone(),
            bucket: key.bucket,
            id: doc.id,
            columns: key.columns,
            payload: doc.payload_bytes()?,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            unique: index.unique,
        })
    }

    fn key(&self, index: &Index, doc: &Document, key: ResolvedKey) -> IndexKey {
        IndexKey {
            table: index.table_name.clone(),
            bucket: key.bucket,
            columns: key.columns,
            id: if index.unique { None } else { Some(doc.id) },
        }
    }
}

fn coerce_field(field: &IndexField, payload: &Value) -> IndexResult<Option<FieldValue>> {
    match extract_field(payload, &field.name) {
        Some(raw) => FieldValue::coerce(raw, field.data_type)
            .map(Some)
            .map_err(|e| IndexError::field(&field.name, e)),
        None => Ok(None),
    }
}

/// Absent in both → same; absent in one → changed; else JSON equality
fn indexed_fields_changed(fields: &[IndexField], old: &Value, new: &Value) -> bool {
    fields
        .iter()
        .any(|f| extract_field(old, &f.name) != extract_field(new, &f.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::test_locator;
    use crate::codec::FieldDataType;
    use serde_json::json;

    fn engine() -> IndexMaintenance {
        IndexMaintenance::new(Arc::new(test_locator(100)))
    }

    fn index(fields: &[(&str, FieldDataType)], unique: bool) -> Index {
        Index::new(
            "db",
            "docs",
            "ix",
            fields
                .iter()
                .map(|(name, dt)| IndexField::new(*name, *dt))
                .collect(),
            unique,
        )
    }

    fn doc(payload: Value) -> Document {
        Document::new("db", "docs", payload)
    }

    #[test]
    fn test_extract_field_paths() {
        let payload = json!({ "a": { "b": { "c": 5 } }, "n": null, "x": 1 });

        assert_eq!(extract_field(&payload, "x"), Some(&json!(1)));
        assert_eq!(extract_field(&payload, "a.b.c"), Some(&json!(5)));
        assert_eq!(extract_field(&payload, "a.b.missing"), None);
        assert_eq!(extract_field(&payload, "x.y"), None);
        assert_eq!(extract_field(&payload, "n"), None);
    }

    #[test]
    fn test_create_builds_typed_row() {
        let engine = engine();
        let index = index(&[("age", FieldDataType::Long), ("name", FieldDataType::Text)], false);
        let doc = doc(json!({ "age": 250, "name": "ada" }));

        let op = engine.generate_create(&index, &doc).unwrap().unwrap();
        let IndexOperation::Insert(row) = op else {
            panic!("expected insert");
        };

        assert_eq!(row.bucket, 200);
        assert_eq!(row.id, doc.id);
        assert_eq!(row.table, index.table_name);
        assert_eq!(
            row.columns,
            vec![
                ("age".to_string(), FieldValue::Long(250)),
                ("name".to_string(), FieldValue::Text("ada".to_string())),
            ]
        );
        assert_eq!(row.decode_payload().unwrap(), doc.payload);
        assert_eq!(row.created_at, doc.created_at);
        assert_eq!(row.key().id, Some(doc.id));
    }

    #[test]
    fn test_missing_first_field_yields_nothing() {
        let engine = engine();
        let index = index(&[("age", FieldDataType::Long)], false);
        let doc = doc(json!({ "name": "ada" }));

        assert!(engine.generate_create(&index, &doc).unwrap().is_none());
        assert!(engine.generate_delete(&index, &doc).unwrap().is_none());
    }

    #[test]
    fn test_missing_secondary_field_yields_nothing() {
        let engine = engine();
        let index = index(&[("age", FieldDataType::Long), ("name", FieldDataType::Text)], false);
        let doc = doc(json!({ "age": 3 }));

        assert!(engine.generate_create(&index, &doc).unwrap().is_none());
    }

    #[test]
    fn test_null_and_empty_text_are_absent() {
        let engine = engine();
        let index = index(&[("name", FieldDataType::Text)], false);

        assert!(engine
            .generate_create(&index, &doc(json!({ "name": null })))
            .unwrap()
            .is_none());
        assert!(engine
            .generate_create(&index, &doc(json!({ "name": "" })))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_failure_names_field() {
        let engine = engine();
        let index = index(&[("price", FieldDataType::Double)], false);
        let err = engine
            .generate_create(&index, &doc(json!({ "price": "cheap" })))
            .unwrap_err();

        match err {
            IndexError::Field { field, source } => {
                assert_eq!(field, "price");
                assert_eq!(source.raw_value(), Some("cheap"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_create_then_delete_target_same_key() {
        let engine = engine();
        let index = index(&[("at", FieldDataType::DateTime), ("tag", FieldDataType::Text)], false);
        let doc = doc(json!({ "at": "2024-03-01T12:00:00Z", "tag": "x" }));

        let Some(IndexOperation::Insert(row)) = engine.generate_create(&index, &doc).unwrap() else {
            panic!("expected insert");
        };
        let Some(IndexOperation::Delete(key)) = engine.generate_delete(&index, &doc).unwrap() else {
            panic!("expected delete");
        };

        assert_eq!(row.key(), key);
    }

    #[test]
    fn test_unique_update_changes_value() {
        let engine = engine();
        let index = index(&[("f", FieldDataType::Text)], true);
        let old = doc(json!({ "f": "A" }));
        let new = old.with_payload(json!({ "f": "B" }));

        let ops = engine.generate_update(&index, &old, &new).unwrap();
        assert_eq!(ops.len(), 2);

        let IndexOperation::Delete(key) = &ops[0] else {
            panic!("expected delete first");
        };
        assert_eq!(key.columns, vec![("f".to_string(), FieldValue::Text("A".to_string()))]);
        assert_eq!(key.id, None);

        let IndexOperation::Insert(row) = &ops[1] else {
            panic!("expected insert second");
        };
        assert_eq!(row.first_column(), Some(&FieldValue::Text("B".to_string())));
        assert_eq!(row.id, old.id);
    }

    #[test]
    fn test_update_without_indexed_change_is_in_place() {
        let engine = engine();
        let index = index(&[("f", FieldDataType::Text)], false);
        let old = doc(json!({ "f": "A", "note": "one" }));
        let new = old.with_payload(json!({ "f": "A", "note": "two" }));

        let ops = engine.generate_update(&index, &old, &new).unwrap();
        assert_eq!(ops.len(), 1);

        let IndexOperation::Update(row) = &ops[0] else {
            panic!("expected update");
        };
        assert_eq!(row.decode_payload().unwrap(), json!({ "f": "A", "note": "two" }));
        assert_eq!(row.updated_at, new.updated_at);
    }

    #[test]
    fn test_update_field_absent_in_both() {
        let engine = engine();
        let index = index(&[("f", FieldDataType::Text)], false);
        let old = doc(json!({ "note": "one" }));
        let new = old.with_payload(json!({ "note": "two" }));

        assert!(engine.generate_update(&index, &old, &new).unwrap().is_empty());
    }

    #[test]
    fn test_update_adds_field() {
        let engine = engine();
        let index = index(&[("f", FieldDataType::Text)], false);
        let old = doc(json!({}));
        let new = old.with_payload(json!({ "f": "A" }));

        let ops = engine.generate_update(&index, &old, &new).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], IndexOperation::Insert(_)));
    }

    #[test]
    fn test_update_removes_field() {
        let engine = engine();
        let index = index(&[("f", FieldDataType::Text)], false);
        let old = doc(json!({ "f": "A" }));
        let new = old.with_payload(json!({}));

        let ops = engine.generate_update(&index, &old, &new).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], IndexOperation::Delete(_)));
    }

    #[test]
    fn test_update_moves_bucket() {
        let engine = engine();
        let index = index(&[("n", FieldDataType::Long)], false);
        let old = doc(json!({ "n": 150 }));
        let new = old.with_payload(json!({ "n": 450 }));

        let ops = engine.generate_update(&index, &old, &new).unwrap();
        assert_eq!(ops.iter().map(|op| op.bucket()).collect::<Vec<_>>(), vec![100, 400]);
    }

    #[test]
    fn test_update_with_bad_new_value_fails() {
        let engine = engine();
        let index = index(&[("n", FieldDataType::Long)], false);
        let old = doc(json!({ "n": 150 }));
        let new = old.with_payload(json!({ "n": "many" }));

        let err = engine.generate_update(&index, &old, &new).unwrap_err();
        assert!(err.is_field_error());
    }

    #[test]
    fn test_update_with_bad_old_value_skips_delete() {
        let engine = engine();
        let index = index(&[("n", FieldDataType::Long)], false);
        let old = doc(json!({ "n": "many" }));
        let new = old.with_payload(json!({ "n": 150 }));

        let ops = engine.generate_update(&index, &old, &new).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], IndexOperation::Insert(_)));
    }

    #[test]
    fn test_for_create_runs_indexes_in_order() {
        let engine = engine();
        let by_a = Index::new("db", "docs", "by_a", vec![IndexField::new("a", FieldDataType::Long)], false);
        let by_b = Index::new("db", "docs", "by_b", vec![IndexField::new("b", FieldDataType::Text)], false);
        let by_c = Index::new("db", "docs", "by_c", vec![IndexField::new("c", FieldDataType::Long)], false);
        let doc = doc(json!({ "a": 1, "b": "x" }));

        let ops = engine.for_create(&[by_a.clone(), by_b.clone(), by_c], &doc).unwrap();
        let tables: Vec<&str> = ops.iter().map(|op| op.table()).collect();
        assert_eq!(tables, vec![by_a.table_name.as_str(), by_b.table_name.as_str()]);

        let deletes = engine.for_delete(&[by_a, by_b], &doc).unwrap();
        assert_eq!(deletes.len(), 2);
        assert!(deletes.iter().all(|op| op.kind() == "delete"));
    }

    #[test]
    fn test_for_update_concatenates() {
        let engine = engine();
        let by_a = Index::new("db", "docs", "by_a", vec![IndexField::new("a", FieldDataType::Long)], false);
        let by_b = Index::new("db", "docs", "by_b", vec![IndexField::new("b", FieldDataType::Text)], false);
        let old = doc(json!({ "a": 1, "b": "x" }));
        let new = old.with_payload(json!({ "a": 2, "b": "x" }));

        let ops = engine.for_update(&[by_a, by_b], &old, &new).unwrap();
        let kinds: Vec<&str> = ops.iter().map(|op| op.kind()).collect();
        assert_eq!(kinds, vec!["delete", "insert", "update"]);
    }

    #[test]
    fn test_nested_field_index() {
        let engine = engine();
        let index = index(&[("user.age", FieldDataType::Integer)], false);
        let doc = doc(json!({ "user": { "age": "42" } }));

        let Some(IndexOperation::Insert(row)) = engine.generate_create(&index, &doc).unwrap() else {
            panic!("expected insert");
        };
        assert_eq!(row.bucket, 0);
        assert_eq!(row.first_column(), Some(&FieldValue::Integer(42)));
    }
}
