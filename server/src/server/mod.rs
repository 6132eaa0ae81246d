//! Server module: application state, rooms, coordinator and WebSocket plumbing

pub mod coordinator;
pub mod rooms;
pub mod websocket;

pub use coordinator::{Credential, SessionCoordinator, UploadError};
pub use rooms::RoomRegistry;
pub use websocket::{WsConfig, ws_handler};

use crate::document::DocumentStore;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub rooms: Arc<RoomRegistry>,
    pub documents: Arc<dyn DocumentStore>,
    pub coordinator: Arc<SessionCoordinator>,
    /// Upload size ceiling in bytes, enforced on the document route
    pub max_upload_size: usize,
    pub ws_config: WsConfig,
}

impl AppState {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let rooms = Arc::new(RoomRegistry::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            registry.clone(),
            rooms.clone(),
            documents.clone(),
        ));

        Self {
            registry,
            rooms,
            documents,
            coordinator,
            max_upload_size: 16 * 1024 * 1024,
            ws_config: WsConfig::default(),
        }
    }

    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn with_ws_config(mut self, ws_config: WsConfig) -> Self {
        self.ws_config = ws_config;
        self
    }

    /// (live sessions, connections holding a room membership)
    pub async fn get_stats(&self) -> (usize, usize) {
        (
            self.registry.session_count().await,
            self.rooms.connection_count(),
        )
    }
}
