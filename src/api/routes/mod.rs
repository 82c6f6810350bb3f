//! API Routes
//!
//! Route handlers organized by resource.

pub mod databases;
pub mod documents;
pub mod health;
pub mod indexes;
pub mod status;
