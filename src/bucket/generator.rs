//! Bucket table generator
//!
//! Offline pipeline producing one type's boundary list:
//!
//! ```text
//! seed (evenly spaced) → prune (k² × 32 chunks past the start index)
//!     → densify (DOUBLE only) → mirror (optional) → sort + dedup
//! ```
//!
//! Pruning keeps the low end of the token range dense and thins the tail
//! quadratically: round k drops `k² × 32` consecutive candidates and keeps
//! the next one. The last candidate always survives as the upper sentinel.

use crate::bucket::error::BucketResult;
use crate::bucket::locator::BucketTable;
use crate::bucket::spec::BucketSpec;
use crate::codec::FieldDataType;

/// Base chunk size of a pruning round (multiplied by k²)
pub const PRUNE_CHUNK: usize = 32;

/// Generates a bucket table from a `BucketSpec`
#[derive(Debug, Clone)]
pub struct BucketGenerator {
    spec: BucketSpec,
}

impl BucketGenerator {
    pub fn new(spec: BucketSpec) -> Self {
        Self { spec }
    }

    /// Generator with the built-in parameters for a type
    pub fn for_type(data_type: FieldDataType) -> Self {
        Self::new(BucketSpec::for_type(data_type))
    }

    pub fn spec(&self) -> &BucketSpec {
        &self.spec
    }

    /// Run the full pipeline
    pub fn generate(&self) -> BucketResult<BucketTable> {
        self.spec.validate()?;

        let mut boundaries = self.prune(self.seed());

        if self.spec.data_type == FieldDataType::Double {
            densify_small_doubles(&mut boundaries);
        }

        if self.spec.mirror_negative {
            mirror_negative(&mut boundaries);
        }

        boundaries.sort_unstable();
        boundaries.dedup();

        tracing::debug!(
            data_type = %self.spec.data_type,
            boundaries = boundaries.len(),
            "Generated bucket table"
        );

        BucketTable::new(self.spec.data_type, boundaries)
    }

    /// Evenly spaced candidates over `[0, bucket_max]`
    pub fn seed(&self) -> Vec<i64> {
        let size = self.spec.bucket_size;
        let step = self.spec.bucket_max / size as i64;

        let mut candidates: Vec<i64> = (0..size as i64).map(|i| step * i - 1).collect();
        if let Some(first) = candidates.first_mut() {
            *first = 0;
        }
        candidates
    }

    /// Quadratic thinning past `floor(len × prune_factor)`
    pub fn prune(&self, mut values: Vec<i64>) -> Vec<i64> {
        if self.spec.prune_factor <= 0.0 || values.len() < 2 {
            return values;
        }

        let mut cursor = (values.len() as f64 * self.spec.prune_factor).floor() as usize;
        let mut round = 1usize;

        while cursor < values.len() {
            let chunk = round * round * PRUNE_CHUNK;
            // Never drain the last value: it is the upper sentinel
            let end = (cursor + chunk).min(values.len() - 1);
            if cursor < end {
                values.drain(cursor..end);
            }
            cursor += 1;
            round += 1;
        }

        values
    }
}

/// Dense ramp for small magnitudes: 1-step to 10k, 2-step to 100k, 10-step to 1M
fn densify_small_doubles(boundaries: &mut Vec<i64>) {
    boundaries.extend(0..10_000);
    boundaries.extend((10_000..100_000).step_by(2));
    boundaries.extend((100_000..1_000_000).step_by(10));
}

fn mirror_negative(boundaries: &mut Vec<i64>) {
    let negatives: Vec<i64> = boundaries
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| -b)
        .collect();
    boundaries.extend(negatives);
}
