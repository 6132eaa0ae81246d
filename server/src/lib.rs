//! PageCast Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod config;
pub mod document;
pub mod protocol;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use document::{DocumentError, DocumentStore, LocalDocumentStore};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{AppState, SessionCoordinator};
pub use session::{SessionError, SessionRegistry};
