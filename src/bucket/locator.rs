//! Bucket Locator - floor lookup over immutable boundary tables
//!
//! One sorted `Arc<[i64]>` per data type, loaded once at startup and shared
//! read-only by every request task. No locking on the lookup path.
//!
//! # Lookup
//! ```text
//! token = 1_234      boundaries = [0, 1_000, 5_000, 9_999]
//! binary_search → Err(2) → floor index 1 → bucket 1_000
//! ```
//! A token below the first boundary wraps to the last one.

use crate::bucket::artifact::{find_artifacts, read_artifact};
use crate::bucket::error::{BucketError, BucketResult};
use crate::bucket::generator::BucketGenerator;
use crate::bucket::spec::BucketSpec;
use crate::codec::{token_for, FieldDataType, FieldResult, FieldValue};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Sorted bucket boundaries for one data type
#[derive(Debug, Clone)]
pub struct BucketTable {
    data_type: FieldDataType,
    boundaries: Arc<[i64]>,
}

/// Summary of a bucket table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketTableStats {
    pub count: usize,
    pub min: i64,
    pub max: i64,
}

impl BucketTable {
    /// Build a table; boundaries must be non-empty and sorted ascending
    pub fn new(data_type: FieldDataType, boundaries: Vec<i64>) -> BucketResult<Self> {
        if boundaries.is_empty() {
            return Err(BucketError::InvalidSpec(format!(
                "{}: empty bucket table",
                data_type
            )));
        }

        if boundaries.windows(2).any(|w| w[0] > w[1]) {
            return Err(BucketError::InvalidSpec(format!(
                "{}: bucket boundaries not sorted",
                data_type
            )));
        }

        Ok(Self {
            data_type,
            boundaries: boundaries.into(),
        })
    }

    pub fn data_type(&self) -> FieldDataType {
        self.data_type
    }

    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn stats(&self) -> BucketTableStats {
        BucketTableStats {
            count: self.boundaries.len(),
            min: self.boundaries[0],
            max: self.boundaries[self.boundaries.len() - 1],
        }
    }

    /// Largest boundary ≤ token, wrapping below the first boundary
    pub fn bucket_for(&self, token: i64) -> i64 {
        let idx = match self.boundaries.binary_search(&token) {
            Ok(found) => found as isize,
            Err(insertion) => insertion as isize - 1,
        };
        let len = self.boundaries.len() as isize;
        self.boundaries[idx.rem_euclid(len) as usize]
    }
}

/// Maps typed values to bucket ids for every data type
#[derive(Debug, Clone)]
pub struct BucketLocator {
    tables: Arc<[BucketTable]>,
}

impl BucketLocator {
    /// Load every type's artifact from `dir`; any missing file is fatal
    ///
    /// Each type needs exactly one `buckets_*_{type}_*_*.csv`, generated
    /// with any parameters.
    pub fn load(dir: &Path) -> BucketResult<Self> {
        let mut tables = Vec::with_capacity(FieldDataType::COUNT);

        for data_type in FieldDataType::all() {
            let mut found = find_artifacts(dir, *data_type)?;
            let path = match found.len() {
                0 => {
                    return Err(BucketError::MissingArtifact {
                        data_type: *data_type,
                        path: dir.join(BucketSpec::for_type(*data_type).artifact_name()),
                    })
                }
                1 => found.remove(0),
                _ => {
                    return Err(BucketError::AmbiguousArtifact {
                        data_type: *data_type,
                        paths: found,
                    })
                }
            };

            let table = read_artifact(&path, *data_type)?;
            tracing::debug!(
                data_type = %data_type,
                boundaries = table.len(),
                "Loaded bucket table from {:?}",
                path
            );
            tables.push(table);
        }

        tracing::info!("Loaded {} bucket tables from {:?}", tables.len(), dir);
        Self::from_tables(tables)
    }

    /// Generate every table in memory from the built-in specs
    pub fn generate() -> BucketResult<Self> {
        let tables = FieldDataType::all()
            .iter()
            .map(|dt| BucketGenerator::for_type(*dt).generate())
            .collect::<BucketResult<Vec<_>>>()?;
        Self::from_tables(tables)
    }

    /// Assemble from explicit tables; exactly one per data type is required
    pub fn from_tables(tables: impl IntoIterator<Item = BucketTable>) -> BucketResult<Self> {
        let mut slots: Vec<Option<BucketTable>> = vec![None; FieldDataType::COUNT];
        for table in tables {
            let ordinal = table.data_type().ordinal();
            slots[ordinal] = Some(table);
        }

        let tables = slots
            .into_iter()
            .zip(FieldDataType::all())
            .map(|(slot, dt)| slot.ok_or(BucketError::MissingTable(*dt)))
            .collect::<BucketResult<Vec<_>>>()?;

        Ok(Self {
            tables: tables.into(),
        })
    }

    /// Replace one type's table
    pub fn with_table(self, table: BucketTable) -> Self {
        let mut tables = self.tables.to_vec();
        let ordinal = table.data_type().ordinal();
        tables[ordinal] = table;
        Self {
            tables: tables.into(),
        }
    }

    pub fn table(&self, data_type: FieldDataType) -> &BucketTable {
        &self.tables[data_type.ordinal()]
    }

    /// Bucket for a raw JSON value declared as `data_type`
    pub fn locate(&self, raw: &Value, data_type: FieldDataType) -> FieldResult<i64> {
        let value = FieldValue::coerce(raw, data_type)?;
        self.locate_value(&value)
    }

    /// Bucket for an already coerced value
    pub fn locate_value(&self, value: &FieldValue) -> FieldResult<i64> {
        let token = token_for(value)?;
        Ok(self.table(value.data_type()).bucket_for(token))
    }
}

/// Small synthetic tables: boundaries `0, step, 2·step, …` (mirrored)
#[cfg(test)]
pub(crate) fn test_locator(step: i64) -> BucketLocator {
    let tables = FieldDataType::all().iter().map(|dt| {
        let mut boundaries: Vec<i64> = (-100..100).map(|i| i * step).collect();
        if *dt == FieldDataType::Text {
            boundaries.retain(|b| *b >= 0);
        }
        BucketTable::new(*dt, boundaries).unwrap()
    });
    BucketLocator::from_tables(tables).unwrap()
}
