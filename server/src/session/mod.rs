//! Session module: registry, admission control and presentation state
//!
//! This module provides:
//! - `SessionRegistry` for process-wide session state and all mutations
//! - session/participant types and id/secret generation
//! - HTTP routes for creating, joining and listing sessions

pub mod registry;
pub mod routes;
pub mod state;

pub use registry::{SessionError, SessionRegistry};
pub use routes::session_routes;
pub use state::{Participant, Role, Session, SessionId, SessionSnapshot, SessionSummary};
