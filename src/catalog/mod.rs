//! Metadata catalog
//!
//! - **repository**: databases, tables and index definitions
//! - **cache**: read-through per-table index catalog cache used on the
//!   document write path

mod cache;
mod error;
mod repository;

pub use cache::{CacheStats, CatalogKey, IndexCatalogCache};
pub use error::{CatalogError, CatalogResult};
pub use repository::{validate_name, DatabaseInfo, MetadataRepository, TableInfo, MAX_NAME_LEN};
