//! Per-type bucket generation parameters

use crate::bucket::error::{BucketError, BucketResult};
use crate::codec::{FieldDataType, TIMEPOINT_HORIZON_MS};
use serde::{Deserialize, Serialize};

/// Parameters used to generate one type's bucket table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub data_type: FieldDataType,
    /// Number of evenly spaced seed candidates
    pub bucket_size: usize,
    /// Fraction of the seed list kept dense before pruning starts (0 = off)
    pub prune_factor: f64,
    /// Largest token value the seeds span
    pub bucket_max: i64,
    /// Add the negation of every nonzero boundary
    pub mirror_negative: bool,
}

impl BucketSpec {
    /// Built-in parameters for a data type
    pub fn for_type(data_type: FieldDataType) -> Self {
        let (bucket_size, prune_factor, bucket_max, mirror_negative) = match data_type {
            FieldDataType::Text => (65_536, 0.25, i64::MAX, false),
            FieldDataType::DateTime => (65_536, 0.5, i64::MAX, true),
            FieldDataType::Double => (32_768, 0.25, i64::MAX, true),
            FieldDataType::Integer => (32_768, 0.5, i32::MAX as i64, true),
            FieldDataType::Long => (65_536, 0.25, i64::MAX, true),
            // Two buckets: false → 0, true → 1
            FieldDataType::Boolean => (2, 0.0, 4, false),
            FieldDataType::Uuid => (65_536, 0.25, i64::MAX, true),
            FieldDataType::Binary => (65_536, 0.25, i64::MAX, false),
            FieldDataType::Timepoint => (8_192, 0.0, TIMEPOINT_HORIZON_MS, false),
        };

        Self {
            data_type,
            bucket_size,
            prune_factor,
            bucket_max,
            mirror_negative,
        }
    }

    /// Custom parameters (generator CLI overrides, tests)
    pub fn new(
        data_type: FieldDataType,
        bucket_size: usize,
        prune_factor: f64,
        bucket_max: i64,
        mirror_negative: bool,
    ) -> Self {
        Self {
            data_type,
            bucket_size,
            prune_factor,
            bucket_max,
            mirror_negative,
        }
    }

    /// Check the parameters can produce a usable table
    pub fn validate(&self) -> BucketResult<()> {
        if self.bucket_size == 0 {
            return Err(BucketError::InvalidSpec(format!(
                "{}: bucket_size must be positive",
                self.data_type
            )));
        }

        if self.bucket_max <= 0 || self.bucket_max / (self.bucket_size as i64) == 0 {
            return Err(BucketError::InvalidSpec(format!(
                "{}: bucket_max {} too small for {} buckets",
                self.data_type, self.bucket_max, self.bucket_size
            )));
        }

        if !(0.0..1.0).contains(&self.prune_factor) {
            return Err(BucketError::InvalidSpec(format!(
                "{}: prune_factor {} outside [0, 1)",
                self.data_type, self.prune_factor
            )));
        }

        Ok(())
    }

    /// Artifact file name; encodes every generation parameter
    pub fn artifact_name(&self) -> String {
        format!(
            "buckets_{}_{}_{}_{}.csv",
            self.bucket_size,
            self.data_type.as_str().to_ascii_lowercase(),
            self.prune_factor,
            self.bucket_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_specs_are_valid() {
        for dt in FieldDataType::all() {
            let spec = BucketSpec::for_type(*dt);
            assert_eq!(spec.data_type, *dt);
            spec.validate().unwrap();
        }
    }

    #[test]
    fn test_artifact_name_encodes_parameters() {
        let spec = BucketSpec::new(FieldDataType::Long, 100, 0.5, 1000, true);
        assert_eq!(spec.artifact_name(), "buckets_100_long_0.5_1000.csv");

        let spec = BucketSpec::for_type(FieldDataType::Timepoint);
        assert_eq!(
            spec.artifact_name(),
            "buckets_8192_timepoint_0_946771200000.csv"
        );
    }

    #[test]
    fn test_invalid_specs() {
        assert!(BucketSpec::new(FieldDataType::Long, 0, 0.5, 1000, false)
            .validate()
            .is_err());
        assert!(BucketSpec::new(FieldDataType::Long, 100, 1.5, 1000, false)
            .validate()
            .is_err());
        assert!(BucketSpec::new(FieldDataType::Long, 100, 0.5, 50, false)
            .validate()
            .is_err());
    }
}
