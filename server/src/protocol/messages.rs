use serde::{Deserialize, Serialize};

/// Client to Server messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Change the current page (admin only)
    ChangePage { page: u32 },
    /// Ask for the admin's current page (any session member)
    GetAdminPage,
    /// Move a pending viewer to accepted (admin only)
    AcceptUser { user_name: String },
    /// Remove a pending viewer without accepting (admin only)
    RejectUser { user_name: String },
    /// Ping for keepalive
    Ping,
}

/// Server to Client messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A viewer's connection entered the room (broadcast)
    UserJoined { name: String },
    /// Sent directly to the admin connection on connect, never broadcast
    AdminConnected { has_document: bool },
    /// The admin moved to a new page (broadcast)
    PageChanged { page: u32 },
    /// Reply to GetAdminPage, sent to the caller only
    AdminPage { page: u32 },
    /// A pending viewer was accepted (broadcast)
    UserAccepted { name: String },
    /// A pending viewer was rejected (broadcast)
    UserRejected { name: String },
    /// The session document was uploaded (broadcast)
    PdfUploaded { filename: String },
    /// Protocol error, sent to the offending connection only
    Error { code: ErrorCode, message: String },
    /// Pong response (to client's Ping)
    Pong,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidMessage,
}

impl ClientMessage {
    /// Get the message type name for metrics
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::ChangePage { .. } => "change_page",
            ClientMessage::GetAdminPage => "get_admin_page",
            ClientMessage::AcceptUser { .. } => "accept_user",
            ClientMessage::RejectUser { .. } => "reject_user",
            ClientMessage::Ping => "ping",
        }
    }
}

impl ServerMessage {
    /// Get the message type name for metrics
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::UserJoined { .. } => "user_joined",
            ServerMessage::AdminConnected { .. } => "admin_connected",
            ServerMessage::PageChanged { .. } => "page_changed",
            ServerMessage::AdminPage { .. } => "admin_page",
            ServerMessage::UserAccepted { .. } => "user_accepted",
            ServerMessage::UserRejected { .. } => "user_rejected",
            ServerMessage::PdfUploaded { .. } => "pdf_uploaded",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"change_page","page":5}"#).unwrap();
        assert!(matches!(msg, ClientMessage::ChangePage { page: 5 }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"accept_user","user_name":"Alice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::AcceptUser { user_name } if user_name == "Alice"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"get_admin_page"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GetAdminPage));
    }

    #[test]
    fn server_messages_serialize_to_wire_names() {
        let json = serde_json::to_string(&ServerMessage::PageChanged { page: 5 }).unwrap();
        assert_eq!(json, r#"{"type":"page_changed","page":5}"#);

        let json = serde_json::to_string(&ServerMessage::UserAccepted {
            name: "Alice".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"user_accepted","name":"Alice"}"#);

        let json = serde_json::to_string(&ServerMessage::PdfUploaded {
            filename: "abc_slides.pdf".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"pdf_uploaded","filename":"abc_slides.pdf"}"#);

        let json =
            serde_json::to_string(&ServerMessage::AdminConnected { has_document: true }).unwrap();
        assert_eq!(json, r#"{"type":"admin_connected","has_document":true}"#);
    }

    #[test]
    fn message_type_names_match_wire_tags() {
        assert_eq!(
            ClientMessage::ChangePage { page: 1 }.message_type(),
            "change_page"
        );
        assert_eq!(
            ServerMessage::AdminPage { page: 1 }.message_type(),
            "admin_page"
        );
    }
}
