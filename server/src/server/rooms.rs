//! Room membership and broadcast fan-out
//!
//! A room is the set of currently connected participants of one session.
//! Delivery is fire-and-forget: at most once per currently-connected member,
//! no persistence or replay for members who join later. A dropped event is
//! recovered by the client through `get_admin_page` polling.

use crate::protocol::ServerMessage;
use crate::session::SessionId;
use dashmap::DashMap;
use metrics::{counter, histogram};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Connection membership registry. DashMap keeps joins/leaves on one
/// connection from contending with broadcasts fanning out to another room.
pub struct RoomRegistry {
    rooms: DashMap<SessionId, HashMap<Uuid, mpsc::Sender<ServerMessage>>>,
    memberships: DashMap<Uuid, SessionId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Add a connection to the room named by the session id. The caller has
    /// already validated the session against the registry.
    pub fn join(&self, session_id: &str, conn_id: Uuid, sender: mpsc::Sender<ServerMessage>) {
        self.rooms
            .entry(session_id.to_string())
            .or_default()
            .insert(conn_id, sender);
        self.memberships.insert(conn_id, session_id.to_string());
        debug!("Connection {} joined room {}", conn_id, session_id);
    }

    /// Remove a connection from whatever room holds it (no-op if none)
    pub fn leave(&self, conn_id: Uuid) {
        let Some((_, session_id)) = self.memberships.remove(&conn_id) else {
            return;
        };
        if let Some(mut members) = self.rooms.get_mut(&session_id) {
            members.remove(&conn_id);
        }
        debug!("Connection {} left room {}", conn_id, session_id);
    }

    /// Deliver a message to every current member of the room. Senders are
    /// cloned out of the map first so fan-out never holds a shard lock
    /// across an await.
    pub async fn broadcast(&self, session_id: &str, msg: ServerMessage) {
        let senders: Vec<mpsc::Sender<ServerMessage>> = match self.rooms.get(session_id) {
            Some(members) => members.values().cloned().collect(),
            None => {
                trace!("Broadcast to empty room {}", session_id);
                return;
            }
        };

        counter!("pagecast_broadcasts_total", "event" => msg.message_type()).increment(1);
        histogram!("pagecast_broadcast_fanout").record(senders.len() as f64);

        for sender in senders {
            // A closed or full receiver just misses this event
            let _ = sender.send(msg.clone()).await;
        }
    }

    /// Number of current members in a room
    pub fn room_size(&self, session_id: &str) -> usize {
        self.rooms.get(session_id).map(|m| m.len()).unwrap_or(0)
    }

    /// Total connections holding a room membership
    pub fn connection_count(&self) -> usize {
        self.memberships.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
