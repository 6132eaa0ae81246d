//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use bytes::Bytes;
use pagecast_server::document::{DocumentError, DocumentStore, document_routes, uploads_routes};
use pagecast_server::server::{AppState, ws_handler};
use pagecast_server::session::session_routes;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

/// Upload ceiling for test apps; small enough to exercise the body limit
pub const TEST_MAX_UPLOAD_SIZE: usize = 64 * 1024;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// In-memory document store so tests never touch the filesystem
pub struct MemoryDocumentStore {
    files: Mutex<HashMap<String, Bytes>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn store(
        &self,
        session_id: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<String, DocumentError> {
        let reference = format!("{}_{}", session_id, filename);
        self.files.lock().unwrap().insert(reference.clone(), bytes);
        Ok(reference)
    }

    async fn retrieve(&self, reference: &str) -> Result<Bytes, DocumentError> {
        self.files
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(reference.to_string()))
    }
}

/// Create a test application router with state
pub fn create_test_app_with_state() -> (Router, AppState) {
    let app_state = AppState::new(Arc::new(MemoryDocumentStore::new()))
        .with_max_upload_size(TEST_MAX_UPLOAD_SIZE);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = session_routes().merge(document_routes(TEST_MAX_UPLOAD_SIZE));

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest("/api", api)
        .merge(uploads_routes())
        .with_state(app_state.clone())
        .layer(cors);

    (app, app_state)
}

/// Create a test application router with all routes configured
#[allow(dead_code)]
pub fn create_test_app() -> Router {
    create_test_app_with_state().0
}

/// Bind the test app on an ephemeral port for real WebSocket clients
#[allow(dead_code)]
pub async fn spawn_test_server() -> (SocketAddr, AppState) {
    let (app, state) = create_test_app_with_state();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server");
    });

    (addr, state)
}

/// Initialize test logging for detailed output
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagecast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
