//! Field Codec
//!
//! Turns a typed field value into a 64-bit bucketing token.
//!
//! - **types**: `FieldDataType` and the `FieldValue` sum type
//! - **parse**: string → typed value parsers for raw string input
//! - **token**: the order-preserving token rules, one per data type
//! - **error**: `FieldError`
//!
//! # Ordering
//!
//! Within one data type, `a < b` implies `token_for(a) < token_for(b)`
//! wherever the type's encoding is monotonic (all numeric and temporal
//! types, ASCII text prefixes). The bucket locator relies on this to
//! binary-search tokens against sorted bucket boundaries.
//!
//! ```text
//! JSON value ──coerce──▶ FieldValue ──token_for──▶ i64 ──locate──▶ bucket
//! ```

mod error;
mod parse;
mod token;
mod types;

pub use error::{FieldError, FieldResult};
pub use parse::{parse_datetime, parse_str};
pub use token::{token_for, TIMEPOINT_EPOCH_MS, TIMEPOINT_HORIZON_MS};
pub use types::{FieldDataType, FieldValue};
