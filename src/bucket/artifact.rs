//! Bucket artifact files
//!
//! One file per data type holding a single comma-delimited line of
//! ascending decimal boundaries:
//!
//! ```text
//! -9223372036854775807,...,-1,0,1,...,9223372036854775807
//! ```
//!
//! File names follow `buckets_{size}_{type}_{prune}_{max}.csv`, so a
//! directory is searched by type rather than by the built-in parameters.

use crate::bucket::error::{BucketError, BucketResult};
use crate::bucket::locator::BucketTable;
use crate::bucket::spec::BucketSpec;
use crate::codec::FieldDataType;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write `table` into `dir` as `spec.artifact_name()`
///
/// Other artifacts of the same type in `dir` are removed afterwards, so
/// regenerating with different parameters never leaves two candidates.
pub fn write_artifact(dir: &Path, spec: &BucketSpec, table: &BucketTable) -> BucketResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(spec.artifact_name());

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    for (i, boundary) in table.boundaries().iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write!(writer, "{}", boundary)?;
    }
    writer.flush()?;
    drop(writer);

    for stale in find_artifacts(dir, spec.data_type)? {
        if stale != path {
            fs::remove_file(&stale)?;
            tracing::info!(
                data_type = %spec.data_type,
                "Removed stale bucket artifact {:?}",
                stale
            );
        }
    }

    tracing::info!(
        data_type = %spec.data_type,
        boundaries = table.len(),
        "Wrote bucket artifact {:?}",
        path
    );

    Ok(path)
}

/// Artifacts for `data_type` in `dir`, whatever parameters generated them
///
/// A missing directory yields no matches.
pub fn find_artifacts(dir: &Path, data_type: FieldDataType) -> BucketResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let wanted = data_type.as_str().to_ascii_lowercase();
    let mut found = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(artifact_type)
            .map_or(false, |t| t == wanted);
        if matches && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Type segment of `buckets_{size}_{type}_{prune}_{max}.csv`
fn artifact_type(file_name: &str) -> Option<String> {
    let stem = file_name.strip_prefix("buckets_")?.strip_suffix(".csv")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 4 {
        return None;
    }

    let (size, rest) = parts.split_first()?;
    let (max, rest) = rest.split_last()?;
    let (prune, type_parts) = rest.split_last()?;
    size.parse::<usize>().ok()?;
    prune.parse::<f64>().ok()?;
    max.parse::<i64>().ok()?;

    Some(type_parts.join("_"))
}

/// Read an artifact file; malformed or unsorted content is an error
pub fn read_artifact(path: &Path, data_type: FieldDataType) -> BucketResult<BucketTable> {
    let content = fs::read_to_string(path)?;
    let corrupt = |reason: String| BucketError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let boundaries = content
        .trim()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|e| corrupt(format!("bad boundary {:?}: {}", s, e)))
        })
        .collect::<BucketResult<Vec<i64>>>()?;

    if boundaries.is_empty() {
        return Err(corrupt("no boundaries".to_string()));
    }

    if boundaries.windows(2).any(|w| w[0] > w[1]) {
        return Err(corrupt("boundaries not sorted ascending".to_string()));
    }

    BucketTable::new(data_type, boundaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let spec = BucketSpec::new(FieldDataType::Long, 4, 0.0, 400, true);
        let table = BucketTable::new(FieldDataType::Long, vec![-299, -199, -99, 0, 99, 199, 299]).unwrap();

        let path = write_artifact(dir.path(), &spec, &table).unwrap();
        assert_eq!(path.file_name().unwrap(), "buckets_4_long_0_400.csv");

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "-299,-199,-99,0,99,199,299");

        let loaded = read_artifact(&path, FieldDataType::Long).unwrap();
        assert_eq!(loaded.boundaries(), table.boundaries());
        assert_eq!(loaded.data_type(), FieldDataType::Long);
    }

    #[test]
    fn test_read_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");

        fs::write(&path, "0,1,abc,3").unwrap();
        let err = read_artifact(&path, FieldDataType::Long).unwrap_err();
        assert!(matches!(err, BucketError::Corrupt { .. }));

        fs::write(&path, "0,5,3").unwrap();
        let err = read_artifact(&path, FieldDataType::Long).unwrap_err();
        assert!(matches!(err, BucketError::Corrupt { .. }));

        fs::write(&path, "\n").unwrap();
        let err = read_artifact(&path, FieldDataType::Long).unwrap_err();
        assert!(matches!(err, BucketError::Corrupt { .. }));
    }

    #[test]
    fn test_artifact_type_from_name() {
        assert_eq!(
            artifact_type("buckets_65536_long_0.25_9223372036854775807.csv").as_deref(),
            Some("long")
        );
        assert_eq!(
            artifact_type("buckets_10_date_time_0.5_1000.csv").as_deref(),
            Some("date_time")
        );
        assert_eq!(artifact_type("buckets_x_long_0_4.csv"), None);
        assert_eq!(artifact_type("buckets_long.csv"), None);
        assert_eq!(artifact_type("notes.txt"), None);
    }

    #[test]
    fn test_rewrite_replaces_other_parameters() {
        let dir = tempdir().unwrap();
        let table = BucketTable::new(FieldDataType::Long, vec![0, 10, 20]).unwrap();

        let long_a = BucketSpec::new(FieldDataType::Long, 4, 0.0, 400, true);
        let long_b = BucketSpec::new(FieldDataType::Long, 8, 0.5, 800, true);
        let text_spec = BucketSpec::new(FieldDataType::Text, 4, 0.0, 400, false);

        let first = write_artifact(dir.path(), &long_a, &table).unwrap();
        let second = write_artifact(dir.path(), &long_b, &table).unwrap();
        let text = write_artifact(dir.path(), &text_spec, &table).unwrap();

        assert!(!first.exists());
        assert_eq!(find_artifacts(dir.path(), FieldDataType::Long).unwrap(), vec![second]);
        assert_eq!(find_artifacts(dir.path(), FieldDataType::Text).unwrap(), vec![text]);
        assert!(find_artifacts(&dir.path().join("missing"), FieldDataType::Long)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_artifact(&dir.path().join("nope.csv"), FieldDataType::Text).unwrap_err();
        assert!(matches!(err, BucketError::Io(_)));
    }
}
