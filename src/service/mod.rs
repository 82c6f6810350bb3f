//! Document service
//!
//! Front door for every operation the HTTP layer exposes: database and
//! table management, document writes with index maintenance, index
//! creation and deletion, equality lookups and build status.

mod error;
mod index_service;

pub use error::{ServiceError, ServiceResult};
pub use index_service::{CreateIndexRequest, CreatedIndex, IndexService, ServiceOptions};
