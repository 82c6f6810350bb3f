//! # Bucketdex
//!
//! Bucketed secondary indexes for a schemaless document store on a
//! wide-column backend.
//!
//! Every indexed field value is mapped to an order-preserving 64-bit token,
//! and the token to a bucket id by binary search over a precomputed boundary
//! table. The bucket id is the partition key of the index table, so rows for
//! nearby values share a partition and equality lookups read one bucket.
//!
//! ## Modules
//!
//! - [`codec`]: typed field values and their order-preserving tokens
//! - [`bucket`]: offline boundary generation and the runtime locator
//! - [`index`]: index model, per-write index maintenance, bulk builds
//! - [`store`]: the document store boundary and an in-memory backend
//! - [`catalog`]: database/table/index metadata and the index cache
//! - [`service`]: document and index operations composed over the above
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bucketdex::bucket::BucketLocator;
//! use bucketdex::catalog::MetadataRepository;
//! use bucketdex::index::IndexField;
//! use bucketdex::service::{CreateIndexRequest, IndexService, ServiceOptions};
//! use bucketdex::store::MemoryStore;
//! use bucketdex::FieldDataType;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = IndexService::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MetadataRepository::new()),
//!         Arc::new(BucketLocator::generate()?),
//!         ServiceOptions::default(),
//!     );
//!
//!     service.create_database("shop").await?;
//!     service.create_table("shop", "orders").await?;
//!     service
//!         .create_document("shop", "orders", json!({"customer": "ada"}))
//!         .await?;
//!
//!     let created = service
//!         .create_index(
//!             "shop",
//!             "orders",
//!             CreateIndexRequest {
//!                 name: "by_customer".into(),
//!                 fields: vec![IndexField::new("customer", FieldDataType::Text)],
//!                 unique: false,
//!             },
//!         )
//!         .await?;
//!
//!     if let Some(build) = service.take_build(created.status_id).await {
//!         build.join().await?;
//!     }
//!
//!     let found = service
//!         .find_by_index("shop", "orders", "by_customer", &json!("ada"))
//!         .await?;
//!     println!("Found {} orders", found.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bucket;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod index;
pub mod service;
pub mod store;

// Re-export top-level types for convenience
pub use codec::{token_for, FieldDataType, FieldError, FieldResult, FieldValue};

pub use bucket::{BucketError, BucketGenerator, BucketLocator, BucketSpec, BucketTable};

pub use index::{
    Index, IndexBuildStatus, IndexError, IndexField, IndexMaintenance, IndexOperation, IndexRow,
};

pub use store::{Document, DocumentStore, MemoryStore, StoreError};

pub use catalog::{CatalogError, IndexCatalogCache, MetadataRepository};

pub use service::{IndexService, ServiceError};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
