//! Session coordinator: credential validation and mutation/broadcast glue
//!
//! Every state-changing or room-joining action re-validates the caller's
//! credential against the session registry. A credential naming a missing
//! session, or a role mismatched with the action, is treated as a no-op:
//! nothing is emitted and the connection stays up, so a stale or forged
//! client cannot disrupt the rest of the room. The drops are logged and
//! counted rather than truly silent.

use crate::document::{DocumentError, DocumentStore};
use crate::protocol::ServerMessage;
use crate::server::rooms::RoomRegistry;
use crate::session::state::Role;
use crate::session::{SessionError, SessionId, SessionRegistry};
use bytes::Bytes;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Credential a connection was issued over HTTP and presents at connect
/// time. Re-validated on every event; never trusted from memory alone.
#[derive(Debug, Clone)]
pub struct Credential {
    pub session_id: SessionId,
    pub role: Role,
    /// Display name; present for viewers
    pub name: Option<String>,
}

/// Errors surfaced by the document upload path. Realtime paths swallow
/// their errors; upload is request/response and reports them distinctly.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub struct SessionCoordinator {
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomRegistry>,
    documents: Arc<dyn DocumentStore>,
}

impl SessionCoordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomRegistry>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            registry,
            rooms,
            documents,
        }
    }

    /// Bind a new connection to its session room.
    ///
    /// Viewers enter the room and the room is told `user_joined`; admins
    /// must present the admin key and receive a direct `admin_connected`
    /// notice that never reaches other members. An invalid credential
    /// leaves the connection open but roomless: every later event no-ops.
    pub async fn connect(
        &self,
        conn_id: Uuid,
        session_id: &str,
        role: Role,
        name: Option<String>,
        admin_key: Option<&str>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Option<Credential> {
        if !self.registry.exists(session_id).await {
            self.observe_drop("connect", SessionError::NotFound(session_id.to_string()));
            return None;
        }

        match role {
            Role::Admin => {
                let key = admin_key.unwrap_or_default();
                if let Err(e) = self.registry.verify_admin_key(session_id, key).await {
                    self.observe_drop("connect", e);
                    return None;
                }

                // has_document cannot fail here: existence checked above and
                // sessions are never removed
                let has_document = self
                    .registry
                    .has_document(session_id)
                    .await
                    .unwrap_or(false);

                self.rooms.join(session_id, conn_id, sender.clone());
                let _ = sender
                    .send(ServerMessage::AdminConnected { has_document })
                    .await;

                info!("Admin connected to session {}", session_id);
            }
            Role::Viewer => {
                let Some(viewer_name) = name.clone() else {
                    debug!("Viewer connect without a name for session {}", session_id);
                    return None;
                };

                self.rooms.join(session_id, conn_id, sender);
                self.rooms
                    .broadcast(session_id, ServerMessage::UserJoined { name: viewer_name })
                    .await;
            }
        }

        Some(Credential {
            session_id: session_id.to_string(),
            role,
            name,
        })
    }

    /// Unbind a connection from its room. Disconnection never cancels an
    /// in-flight mutation; it only affects membership going forward.
    pub fn disconnect(&self, conn_id: Uuid) {
        self.rooms.leave(conn_id);
    }

    /// Admin moved to a new page: update state, tell the room
    pub async fn change_page(&self, credential: &Credential, page: u32) {
        match self
            .registry
            .set_page(&credential.session_id, credential.role, page)
            .await
        {
            Ok(applied) => {
                self.rooms
                    .broadcast(
                        &credential.session_id,
                        ServerMessage::PageChanged { page: applied },
                    )
                    .await;
            }
            Err(e) => self.observe_drop("change_page", e),
        }
    }

    /// Current page for the caller only; used to sync after (re)connect
    pub async fn admin_page(&self, credential: &Credential) -> Option<u32> {
        match self.registry.current_page(&credential.session_id).await {
            Ok(page) => Some(page),
            Err(e) => {
                self.observe_drop("get_admin_page", e);
                None
            }
        }
    }

    /// Admin accepted a pending viewer
    pub async fn accept_user(&self, credential: &Credential, user_name: &str) {
        match self
            .registry
            .accept(&credential.session_id, credential.role, user_name)
            .await
        {
            Ok(Some(participant)) => {
                self.rooms
                    .broadcast(
                        &credential.session_id,
                        ServerMessage::UserAccepted {
                            name: participant.name,
                        },
                    )
                    .await;
            }
            // No pending match: idempotent no-op, no broadcast
            Ok(None) => {}
            Err(e) => self.observe_drop("accept_user", e),
        }
    }

    /// Admin rejected a pending viewer
    pub async fn reject_user(&self, credential: &Credential, user_name: &str) {
        match self
            .registry
            .reject(&credential.session_id, credential.role, user_name)
            .await
        {
            Ok(Some(participant)) => {
                self.rooms
                    .broadcast(
                        &credential.session_id,
                        ServerMessage::UserRejected {
                            name: participant.name,
                        },
                    )
                    .await;
            }
            Ok(None) => {}
            Err(e) => self.observe_drop("reject_user", e),
        }
    }

    /// Document upload: verify the admin key, store the bytes, set the
    /// session's document reference and tell the room. The registry is the
    /// authority for the at-most-once rule; the early has_document check
    /// just avoids writing a file that can never be referenced.
    pub async fn upload_document(
        &self,
        session_id: &str,
        admin_key: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<String, UploadError> {
        self.registry.verify_admin_key(session_id, admin_key).await?;

        if self.registry.has_document(session_id).await? {
            return Err(SessionError::Conflict.into());
        }

        if !filename.ends_with(".pdf") {
            return Err(DocumentError::InvalidFilename(filename.to_string()).into());
        }

        let reference = self.documents.store(session_id, filename, bytes).await?;
        self.registry
            .set_document(session_id, Role::Admin, &reference)
            .await?;

        self.rooms
            .broadcast(
                session_id,
                ServerMessage::PdfUploaded {
                    filename: reference.clone(),
                },
            )
            .await;

        info!("Session {} document uploaded: {}", session_id, reference);
        Ok(reference)
    }

    fn observe_drop(&self, event: &'static str, error: SessionError) {
        let reason = match &error {
            SessionError::NotFound(_) => "not_found",
            SessionError::Unauthorized => "unauthorized",
            SessionError::Conflict => "conflict",
        };
        counter!("pagecast_rejected_events_total", "event" => event, "reason" => reason)
            .increment(1);
        warn!("Dropped {} event: {}", event, error);
    }
}
