//! HTTP route handlers for session creation, join and listing

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::server::AppState;
use crate::session::registry::SessionError;
use crate::session::state::{SessionSnapshot, SessionSummary};

/// Error response for the session API
#[derive(Debug, Serialize)]
pub struct SessionErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<SessionError> for SessionErrorResponse {
    fn from(e: SessionError) -> Self {
        let code = match &e {
            SessionError::NotFound(_) => "not_found",
            SessionError::Unauthorized => "unauthorized",
            SessionError::Conflict => "conflict",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for SessionErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub name: String,
    /// Returned once; only its hash is stored server-side
    pub admin_key: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    pub user_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinSessionResponse {
    pub session_id: String,
    pub name: String,
}

/// Origin token for a request. Falls back when the listener was not set up
/// with connect info (tower `oneshot` tests).
fn origin(addr: Option<ConnectInfo<SocketAddr>>) -> String {
    addr.map(|ConnectInfo(a)| a.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// POST /api/sessions - Create a session; the caller becomes its admin
pub async fn create_session(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<CreateSessionRequest>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let (session_id, admin_key) = state.registry.create(&req.name, &origin(addr)).await;

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            name: req.name,
            admin_key,
        }),
    )
}

/// GET /api/sessions - List all live sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.registry.list().await)
}

/// GET /api/session/:id - Snapshot of one session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, SessionErrorResponse> {
    let snapshot = state.registry.snapshot(&id).await.map_err(|e| {
        tracing::debug!("Snapshot for unknown session {}", id);
        SessionErrorResponse::from(e)
    })?;
    Ok(Json(snapshot))
}

/// POST /api/session/:id/join - Request to join as a viewer (lands in pending)
pub async fn join_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<JoinSessionRequest>,
) -> Result<Json<JoinSessionResponse>, SessionErrorResponse> {
    state
        .registry
        .request_join(&id, &req.user_name, &origin(addr))
        .await
        .map_err(SessionErrorResponse::from)?;

    Ok(Json(JoinSessionResponse {
        session_id: id,
        name: req.user_name,
    }))
}

/// Build session API routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/session/:id", get(get_session))
        .route("/session/:id/join", post(join_session))
}
