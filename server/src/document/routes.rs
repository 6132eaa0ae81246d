//! HTTP route handlers for document upload and download

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::server::{AppState, UploadError};
use crate::session::registry::SessionError;

use super::types::DocumentError;

/// Error response for the document API
#[derive(Debug, Serialize)]
pub struct DocumentErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<UploadError> for DocumentErrorResponse {
    fn from(e: UploadError) -> Self {
        let code = match &e {
            UploadError::Session(SessionError::NotFound(_)) => "not_found",
            UploadError::Session(SessionError::Unauthorized) => "unauthorized",
            UploadError::Session(SessionError::Conflict) => "conflict",
            UploadError::Document(DocumentError::NotFound(_)) => "not_found",
            UploadError::Document(DocumentError::InvalidFilename(_)) => "invalid_filename",
            UploadError::Document(DocumentError::IoError(_)) => "io_error",
        };
        Self {
            error: e.to_string(),
            code: code.to_string(),
        }
    }
}

impl IntoResponse for DocumentErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "conflict" => StatusCode::CONFLICT,
            "invalid_filename" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Query parameters for document upload
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

/// POST /api/session/:id/document - Upload the session document (admin only,
/// at most once per session). Raw body bytes, admin key in `x-admin-key`.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, DocumentErrorResponse> {
    let admin_key = headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let reference = state
        .coordinator
        .upload_document(&id, admin_key, &params.filename, body)
        .await
        .map_err(|e| {
            tracing::warn!("Document upload for session {} failed: {}", id, e);
            DocumentErrorResponse::from(e)
        })?;

    Ok(Json(UploadResponse {
        filename: reference,
    }))
}

/// GET /uploads/:filename - Serve a stored document
pub async fn download_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, DocumentErrorResponse> {
    let bytes = state.documents.retrieve(&filename).await.map_err(|e| {
        tracing::debug!("Document {} not served: {}", filename, e);
        DocumentErrorResponse::from(UploadError::Document(e))
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
            // Documents are immutable once stored
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        Body::from(bytes),
    )
        .into_response())
}

/// Build document API routes (nested under /api)
pub fn document_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/session/:id/document", post(upload_document))
        .layer(DefaultBodyLimit::max(max_upload_size))
}

/// Build the document serving route (mounted at the root)
pub fn uploads_routes() -> Router<AppState> {
    Router::new().route("/uploads/:filename", get(download_document))
}
