use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::AppState;
use crate::server::coordinator::Credential;
use crate::session::state::Role;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use metrics::counter;
use serde::Deserialize;
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Credential presented at connect time, previously issued over HTTP
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub session_id: String,
    pub role: Role,
    /// Display name; required for viewers
    pub name: Option<String>,
    /// Admin key; required for admins
    pub key: Option<String>,
}

/// Configuration for WebSocket connections
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    pub max_message_size: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(10),
            max_message_size: 64 * 1024, // 64KB
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let max = state.ws_config.max_message_size;
    ws.max_message_size(max)
        .on_upgrade(|socket| handle_socket(socket, params, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, params: ConnectParams, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(
        "New WebSocket connection {} for session {} as {:?}",
        connection_id, params.session_id, params.role
    );

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // Validate the credential and enter the room. A stale or forged
    // credential leaves the connection open but roomless; every event on
    // it is then a no-op.
    let credential: Option<Credential> = state
        .coordinator
        .connect(
            connection_id,
            &params.session_id,
            params.role,
            params.name.clone(),
            params.key.as_deref(),
            tx.clone(),
        )
        .await;

    let last_ping = Arc::new(Mutex::new(Instant::now()));

    // Split socket into sender and receiver
    use futures_util::{SinkExt, StreamExt};
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Spawn task to forward outgoing messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            counter!("pagecast_ws_messages_sent_total", "type" => msg.message_type())
                .increment(1);
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    // Spawn keepalive ping task
    let ping_tx = tx.clone();
    let ping_last = last_ping.clone();
    let ping_config = state.ws_config.clone();
    let ping_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ping_config.ping_interval);

        loop {
            interval.tick().await;

            let stale = {
                let last = ping_last.lock().unwrap_or_else(|e| e.into_inner());
                last.elapsed() > ping_config.ping_timeout + ping_config.ping_interval
            };
            if stale {
                debug!("Connection timed out on keepalive");
                break;
            }

            if ping_tx.send(ServerMessage::Pong).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(msg) => match msg {
                Message::Text(text) => {
                    {
                        let mut last = last_ping.lock().unwrap_or_else(|e| e.into_inner());
                        *last = Instant::now();
                    }

                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => {
                            counter!("pagecast_ws_messages_received_total",
                                "type" => client_msg.message_type())
                            .increment(1);
                            handle_client_message(client_msg, &credential, &state, &tx).await;
                        }
                        Err(e) => {
                            warn!("Failed to parse client message: {}", e);
                            let _ = tx
                                .send(ServerMessage::Error {
                                    code: ErrorCode::InvalidMessage,
                                    message: format!("Invalid message format: {}", e),
                                })
                                .await;
                        }
                    }
                }
                Message::Binary(_) => {
                    debug!("Ignoring binary message from {}", connection_id);
                }
                Message::Ping(data) => {
                    // Handled by axum automatically with pong
                    debug!("Received ping: {:?}", data);
                }
                Message::Pong(_) => {
                    let mut last = last_ping.lock().unwrap_or_else(|e| e.into_inner());
                    *last = Instant::now();
                }
                Message::Close(_) => {
                    info!("Client {} requested close", connection_id);
                    break;
                }
            },
            Err(e) => {
                error!("WebSocket error for {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Cleanup
    ping_task.abort();
    send_task.abort();
    state.coordinator.disconnect(connection_id);

    info!("WebSocket connection closed: {}", connection_id);
}

/// Handle a parsed client message
async fn handle_client_message(
    msg: ClientMessage,
    credential: &Option<Credential>,
    state: &AppState,
    tx: &mpsc::Sender<ServerMessage>,
) {
    // Keepalive works even on an unauthenticated connection
    if let ClientMessage::Ping = msg {
        let _ = tx.send(ServerMessage::Pong).await;
        return;
    }

    let Some(credential) = credential else {
        debug!("Dropping {} from unauthenticated connection", msg.message_type());
        counter!("pagecast_rejected_events_total", "event" => msg.message_type(),
            "reason" => "no_credential")
        .increment(1);
        return;
    };

    match msg {
        ClientMessage::ChangePage { page } => {
            state.coordinator.change_page(credential, page).await;
        }
        ClientMessage::GetAdminPage => {
            if let Some(page) = state.coordinator.admin_page(credential).await {
                let _ = tx.send(ServerMessage::AdminPage { page }).await;
            }
        }
        ClientMessage::AcceptUser { user_name } => {
            state.coordinator.accept_user(credential, &user_name).await;
        }
        ClientMessage::RejectUser { user_name } => {
            state.coordinator.reject_user(credential, &user_name).await;
        }
        ClientMessage::Ping => unreachable!("handled above"),
    }
}
