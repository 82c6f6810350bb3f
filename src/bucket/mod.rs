//! Bucket Tables
//!
//! Precomputed, per data type, sorted lists of i64 bucket boundaries, and
//! the runtime locator that maps a token onto its owning bucket.
//!
//! - **spec**: per-type generation parameters (`BucketSpec`)
//! - **generator**: offline seed / prune / densify / mirror pipeline
//! - **artifact**: flat comma-delimited file format, one file per type
//! - **locator**: immutable in-memory tables and floor lookup
//!
//! # Architecture
//!
//! ```text
//! bucketgen (offline)             server startup                 request path
//! BucketSpec → generator → .csv ─▶ BucketLocator::load(dir) ─▶ locate(value, type)
//! ```
//!
//! Boundaries are the bucket identifiers: a row whose token falls in
//! `[b_i, b_{i+1})` lives in partition `b_i`.

mod artifact;
mod error;
mod generator;
mod locator;
mod spec;

pub use artifact::{find_artifacts, read_artifact, write_artifact};
pub use error::{BucketError, BucketResult};
pub use generator::{BucketGenerator, PRUNE_CHUNK};
pub use locator::{BucketLocator, BucketTable, BucketTableStats};
pub use spec::BucketSpec;

#[cfg(test)]
pub(crate) use locator::test_locator;
