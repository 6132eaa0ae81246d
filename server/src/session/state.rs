use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Session ID: 10-character base32 string (lowercase, a-z + 2-7)
pub type SessionId = String;

/// Charset for session IDs: lowercase base32 (a-z, 2-7) to avoid 0/1 confusion
const SESSION_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
const SESSION_ID_LENGTH: usize = 10;

/// Generate a cryptographically random session ID
pub fn generate_session_id() -> SessionId {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut id = String::with_capacity(SESSION_ID_LENGTH);
    let hasher = RandomState::new();

    // Use multiple hash sources for randomness
    for i in 0..SESSION_ID_LENGTH {
        let mut h = hasher.build_hasher();
        h.write_usize(i);
        h.write_u128(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
        );
        h.write_u128(Uuid::new_v4().as_u128());

        let idx = (h.finish() as usize) % SESSION_ID_CHARSET.len();
        id.push(SESSION_ID_CHARSET[idx] as char);
    }

    id
}

/// Generate a high-entropy secret (for admin keys)
pub fn generate_secret(bits: usize) -> String {
    let bytes_needed = bits.div_ceil(8);
    let mut secret = String::with_capacity(bytes_needed * 2);

    for _ in 0..bytes_needed {
        let byte = (Uuid::new_v4().as_u128() & 0xFF) as u8;
        secret.push_str(&format!("{:02x}", byte));
    }

    secret
}

/// Role a connection holds within a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Viewer,
}

/// One viewer join attempt. Names are not deduplicated; admission resolves
/// duplicates first-match in pending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    /// Originating network identity (client socket address)
    pub identity: String,
    pub requested_at: u64,
}

/// Full session data
#[derive(Debug, Clone)]
pub struct Session {
    // Identity
    pub id: SessionId,
    pub name: String,
    /// Origin token of the creator, fixed for the session's lifetime
    pub admin_identity: String,
    pub admin_key_hash: String,

    // Timestamps
    pub created_at: u64,

    // Presentation state
    pub current_page: u32,
    /// Stored document reference; set at most once, then immutable
    pub document: Option<String>,

    // Admission state
    pub accepted: Vec<Participant>,
    pub pending: Vec<Participant>,
}

impl Session {
    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }
}

/// Read-only view of one session, for HTTP responses and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub name: String,
    pub current_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub has_document: bool,
    pub accepted: Vec<String>,
    pub pending: Vec<String>,
    pub created_at: u64,
}

/// Summary line for the session index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub has_document: bool,
    pub accepted: usize,
    pub pending: usize,
}

/// Validation rules
pub fn validate_session_id(id: &str) -> bool {
    if id.len() != SESSION_ID_LENGTH {
        return false;
    }
    id.chars().all(|c| SESSION_ID_CHARSET.contains(&(c as u8)))
}

/// Get current timestamp in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
