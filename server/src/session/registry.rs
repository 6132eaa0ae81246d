use crate::session::state::{
    Participant, Role, Session, SessionId, SessionSnapshot, SessionSummary, generate_secret,
    generate_session_id, now_millis,
};
use metrics::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Session registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Not authorized for this operation")]
    Unauthorized,

    #[error("Session already has a document")]
    Conflict,
}

/// Process-wide session registry: creation, lookup, and every mutation of
/// session state. Entries persist for the life of the process; there is no
/// deletion path.
///
/// All read-modify-write sequences run under the write lock, so concurrent
/// accept/reject/join calls on the same session can never observe a
/// participant in both lists or lose an update.
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new session. Returns the generated session id together with
    /// the admin key; only the key's hash is retained.
    pub async fn create(&self, name: &str, admin_identity: &str) -> (SessionId, String) {
        let start = Instant::now();
        counter!("pagecast_sessions_created_total").increment(1);

        let session_id = generate_session_id();
        let admin_key = generate_secret(192);

        let session = Session {
            id: session_id.clone(),
            name: name.to_string(),
            admin_identity: admin_identity.to_string(),
            admin_key_hash: hash_secret(&admin_key),
            created_at: now_millis(),
            current_page: 1,
            document: None,
            accepted: Vec::new(),
            pending: Vec::new(),
        };

        info!("Created session {} ({})", session_id, name);

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id.clone(), session);
        }

        histogram!("pagecast_session_create_duration_seconds").record(start.elapsed());
        (session_id, admin_key)
    }

    /// Get a read-only snapshot of one session
    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        Ok(create_snapshot(session))
    }

    /// Summaries for every live session, creation order not guaranteed
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id.clone(),
                name: s.name.clone(),
                has_document: s.has_document(),
                accepted: s.accepted.len(),
                pending: s.pending.len(),
            })
            .collect()
    }

    pub async fn exists(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Verify the admin key presented by a connection or upload request
    pub async fn verify_admin_key(
        &self,
        session_id: &str,
        admin_key: &str,
    ) -> Result<(), SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        if !verify_secret(admin_key, &session.admin_key_hash) {
            return Err(SessionError::Unauthorized);
        }
        Ok(())
    }

    /// Append a viewer to the pending list. Duplicate names are permitted;
    /// admission resolves them first-match.
    pub async fn request_join(
        &self,
        session_id: &str,
        name: &str,
        identity: &str,
    ) -> Result<(), SessionError> {
        counter!("pagecast_join_requests_total").increment(1);

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        session.pending.push(Participant {
            name: name.to_string(),
            identity: identity.to_string(),
            requested_at: now_millis(),
        });

        info!("Viewer {} requested to join session {}", name, session_id);
        histogram!("pagecast_session_pending_size").record(session.pending.len() as f64);
        Ok(())
    }

    /// Move the first pending entry with this exact name to accepted.
    /// Returns the moved participant, or None when no pending entry matches
    /// (idempotent no-op, not an error).
    pub async fn accept(
        &self,
        session_id: &str,
        role: Role,
        name: &str,
    ) -> Result<Option<Participant>, SessionError> {
        ensure_admin(role)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let Some(idx) = session.pending.iter().position(|p| p.name == name) else {
            debug!("Accept for {} in session {}: no pending match", name, session_id);
            return Ok(None);
        };

        let participant = session.pending.remove(idx);
        session.accepted.push(participant.clone());

        counter!("pagecast_admissions_total", "decision" => "accepted").increment(1);
        info!("Accepted viewer {} into session {}", name, session_id);
        Ok(Some(participant))
    }

    /// Remove the first pending entry with this exact name without
    /// accepting it. Same no-match semantics as `accept`.
    pub async fn reject(
        &self,
        session_id: &str,
        role: Role,
        name: &str,
    ) -> Result<Option<Participant>, SessionError> {
        ensure_admin(role)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let Some(idx) = session.pending.iter().position(|p| p.name == name) else {
            debug!("Reject for {} in session {}: no pending match", name, session_id);
            return Ok(None);
        };

        let participant = session.pending.remove(idx);

        counter!("pagecast_admissions_total", "decision" => "rejected").increment(1);
        info!("Rejected viewer {} from session {}", name, session_id);
        Ok(Some(participant))
    }

    /// Store the document reference and reset the page to 1. At most one
    /// document per session; a second call is a Conflict and leaves the
    /// stored reference unchanged.
    pub async fn set_document(
        &self,
        session_id: &str,
        role: Role,
        reference: &str,
    ) -> Result<(), SessionError> {
        ensure_admin(role)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        if session.document.is_some() {
            return Err(SessionError::Conflict);
        }

        session.document = Some(reference.to_string());
        session.current_page = 1;

        counter!("pagecast_documents_set_total").increment(1);
        info!("Session {} document set to {}", session_id, reference);
        Ok(())
    }

    /// Set the current page. No bounds check against the document length;
    /// the admin's client is trusted for range. Values below 1 are clamped
    /// so the page invariant holds. Returns the applied page.
    pub async fn set_page(
        &self,
        session_id: &str,
        role: Role,
        page: u32,
    ) -> Result<u32, SessionError> {
        ensure_admin(role)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let page = page.max(1);
        session.current_page = page;

        counter!("pagecast_page_changes_total").increment(1);
        debug!("Session {} page set to {}", session_id, page);
        Ok(page)
    }

    /// Read the current page; available to any valid session member
    pub async fn current_page(&self, session_id: &str) -> Result<u32, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        Ok(session.current_page)
    }

    pub async fn has_document(&self, session_id: &str) -> Result<bool, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        Ok(session.has_document())
    }

    /// Get count of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_admin(role: Role) -> Result<(), SessionError> {
    if role != Role::Admin {
        return Err(SessionError::Unauthorized);
    }
    Ok(())
}

/// Create snapshot from session
fn create_snapshot(session: &Session) -> SessionSnapshot {
    SessionSnapshot {
        id: session.id.clone(),
        name: session.name.clone(),
        current_page: session.current_page,
        document: session.document.clone(),
        has_document: session.has_document(),
        accepted: session.accepted.iter().map(|p| p.name.clone()).collect(),
        pending: session.pending.iter().map(|p| p.name.clone()).collect(),
        created_at: session.created_at,
    }
}

/// Hash secrets using SHA256 for secure comparison
fn hash_secret(secret: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Verify secret against hash
fn verify_secret(secret: &str, hash: &str) -> bool {
    hash_secret(secret) == hash
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry_with_session() -> (SessionRegistry, SessionId, String) {
        let registry = SessionRegistry::new();
        let (id, key) = registry.create("Lecture1", "127.0.0.1:4000").await;
        (registry, id, key)
    }

    #[tokio::test]
    async fn test_create_session() {
        let (registry, id, key) = registry_with_session().await;

        assert_eq!(id.len(), 10);
        assert!(!key.is_empty());

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.name, "Lecture1");
        assert_eq!(snapshot.current_page, 1);
        assert!(!snapshot.has_document);
        assert!(snapshot.accepted.is_empty());
        assert!(snapshot.pending.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_unknown_session() {
        let registry = SessionRegistry::new();
        let result = registry.snapshot("nonexistent").await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_key_verification() {
        let (registry, id, key) = registry_with_session().await;

        assert!(registry.verify_admin_key(&id, &key).await.is_ok());
        assert_eq!(
            registry.verify_admin_key(&id, "wrong").await,
            Err(SessionError::Unauthorized)
        );
        assert!(matches!(
            registry.verify_admin_key("nonexistent", &key).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_join_then_accept_moves_to_accepted() {
        let (registry, id, _) = registry_with_session().await;

        registry.request_join(&id, "Alice", "10.0.0.1:5000").await.unwrap();

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.pending, vec!["Alice"]);

        let moved = registry.accept(&id, Role::Admin, "Alice").await.unwrap();
        assert_eq!(moved.unwrap().name, "Alice");

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.accepted, vec!["Alice"]);
        assert!(snapshot.pending.is_empty());
    }

    #[tokio::test]
    async fn test_name_never_in_both_lists() {
        let (registry, id, _) = registry_with_session().await;

        registry.request_join(&id, "Alice", "10.0.0.1:5000").await.unwrap();
        registry.accept(&id, Role::Admin, "Alice").await.unwrap();

        let snapshot = registry.snapshot(&id).await.unwrap();
        let in_pending = snapshot.pending.contains(&"Alice".to_string());
        let in_accepted = snapshot.accepted.contains(&"Alice".to_string());
        assert!(in_accepted && !in_pending);
    }

    #[tokio::test]
    async fn test_accept_no_match_is_noop() {
        let (registry, id, _) = registry_with_session().await;

        let moved = registry.accept(&id, Role::Admin, "Nobody").await.unwrap();
        assert!(moved.is_none());

        // Second accept of an already-resolved name is also a no-op
        registry.request_join(&id, "Alice", "10.0.0.1:5000").await.unwrap();
        registry.accept(&id, Role::Admin, "Alice").await.unwrap();
        let again = registry.accept(&id, Role::Admin, "Alice").await.unwrap();
        assert!(again.is_none());

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.accepted, vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_duplicate_names_first_match_wins() {
        let (registry, id, _) = registry_with_session().await;

        registry.request_join(&id, "Alice", "10.0.0.1:5000").await.unwrap();
        registry.request_join(&id, "Alice", "10.0.0.2:5000").await.unwrap();

        let moved = registry.accept(&id, Role::Admin, "Alice").await.unwrap().unwrap();
        assert_eq!(moved.identity, "10.0.0.1:5000");

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.pending, vec!["Alice"]);
        assert_eq!(snapshot.accepted, vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_reject_removes_without_accepting() {
        let (registry, id, _) = registry_with_session().await;

        registry.request_join(&id, "Mallory", "10.0.0.3:5000").await.unwrap();
        let removed = registry.reject(&id, Role::Admin, "Mallory").await.unwrap();
        assert_eq!(removed.unwrap().name, "Mallory");

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert!(snapshot.pending.is_empty());
        assert!(snapshot.accepted.is_empty());
    }

    #[tokio::test]
    async fn test_viewer_cannot_accept() {
        let (registry, id, _) = registry_with_session().await;

        registry.request_join(&id, "Alice", "10.0.0.1:5000").await.unwrap();
        let result = registry.accept(&id, Role::Viewer, "Alice").await;
        assert_eq!(result, Err(SessionError::Unauthorized));

        // State unchanged
        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.pending, vec!["Alice"]);
        assert!(snapshot.accepted.is_empty());
    }

    #[tokio::test]
    async fn test_set_document_resets_page() {
        let (registry, id, _) = registry_with_session().await;

        registry.set_page(&id, Role::Admin, 7).await.unwrap();
        assert_eq!(registry.current_page(&id).await.unwrap(), 7);

        registry
            .set_document(&id, Role::Admin, "abc_slides.pdf")
            .await
            .unwrap();

        assert_eq!(registry.current_page(&id).await.unwrap(), 1);
        assert!(registry.has_document(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_second_document_is_conflict() {
        let (registry, id, _) = registry_with_session().await;

        registry
            .set_document(&id, Role::Admin, "first.pdf")
            .await
            .unwrap();
        let result = registry.set_document(&id, Role::Admin, "second.pdf").await;
        assert_eq!(result, Err(SessionError::Conflict));

        // Stored reference unchanged
        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.document.as_deref(), Some("first.pdf"));
    }

    #[tokio::test]
    async fn test_viewer_cannot_set_document_or_page() {
        let (registry, id, _) = registry_with_session().await;

        assert_eq!(
            registry.set_document(&id, Role::Viewer, "x.pdf").await,
            Err(SessionError::Unauthorized)
        );
        assert_eq!(
            registry.set_page(&id, Role::Viewer, 3).await,
            Err(SessionError::Unauthorized)
        );

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert!(!snapshot.has_document);
        assert_eq!(snapshot.current_page, 1);
    }

    #[tokio::test]
    async fn test_page_always_at_least_one() {
        let (registry, id, _) = registry_with_session().await;

        let applied = registry.set_page(&id, Role::Admin, 0).await.unwrap();
        assert_eq!(applied, 1);
        assert_eq!(registry.current_page(&id).await.unwrap(), 1);

        let applied = registry.set_page(&id, Role::Admin, 42).await.unwrap();
        assert_eq!(applied, 42);
    }

    #[tokio::test]
    async fn test_list_summaries() {
        let registry = SessionRegistry::new();
        let (id_a, _) = registry.create("Lecture A", "127.0.0.1:1").await;
        let (_id_b, _) = registry.create("Lecture B", "127.0.0.1:2").await;

        registry.request_join(&id_a, "Alice", "10.0.0.1:5000").await.unwrap();

        let mut summaries = registry.list().await;
        summaries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Lecture A");
        assert_eq!(summaries[0].pending, 1);
        assert_eq!(summaries[1].pending, 0);
        assert_eq!(registry.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_accepts_move_once() {
        use std::sync::Arc;

        let registry = Arc::new(SessionRegistry::new());
        let (id, _) = registry.create("Lecture1", "127.0.0.1:4000").await;
        registry.request_join(&id, "Alice", "10.0.0.1:5000").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                registry.accept(&id, Role::Admin, "Alice").await.unwrap()
            }));
        }

        let mut moved = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                moved += 1;
            }
        }

        // Exactly one task wins the pending -> accepted move
        assert_eq!(moved, 1);
        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.accepted, vec!["Alice"]);
        assert!(snapshot.pending.is_empty());
    }
}
