//! Document storage module
//!
//! This module provides:
//! - `DocumentStore` trait for abstracting document storage
//! - `LocalDocumentStore` for storing uploads on the local filesystem
//! - HTTP routes for uploading and downloading session documents

mod local;
pub mod routes;
mod store;
mod types;

pub use local::LocalDocumentStore;
pub use routes::{document_routes, uploads_routes};
pub use store::DocumentStore;
pub use types::DocumentError;
