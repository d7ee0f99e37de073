//! Connected-socket bookkeeping for the game server.
//!
//! This module tracks every live connection, assigns the opaque ids that
//! double as player ids inside rooms, and owns the outbound delivery
//! channels. Handlers address connections by id; the network layer wires
//! each id to a writer task draining the connection's channel.

use log::{info, warn};
use shared::protocol::{PlayerId, ServerMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One live connection and the room-scoped identity attached to it.
///
/// `username` and `room_id` are set on a successful `room:join` and
/// cleared on leave, mirroring the session data the transport keeps for
/// routing disconnects back to the right room.
#[derive(Debug)]
pub struct Connection {
    /// Opaque identity, also used as the player id inside rooms
    pub id: PlayerId,
    /// Display name announced on join
    pub username: Option<String>,
    /// The room this connection currently sits in, if any
    pub room_id: Option<String>,
    /// Outbound channel drained by the connection's writer task
    sender: mpsc::UnboundedSender<ServerMessage>,
}

/// Registry of all live connections.
///
/// Delivery is fire-and-forget: a closed channel means the connection is
/// on its way out and the disconnect path will clean it up, so failed
/// sends are logged and dropped rather than treated as errors.
pub struct ConnectionManager {
    connections: HashMap<PlayerId, Connection>,
    next_conn_id: u64,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_conn_id: 1,
        }
    }

    /// Registers a new connection and returns its assigned id.
    pub fn register(&mut self, sender: mpsc::UnboundedSender<ServerMessage>) -> PlayerId {
        let id = format!("conn-{}", self.next_conn_id);
        self.next_conn_id += 1;

        let connection = Connection {
            id: id.clone(),
            username: None,
            room_id: None,
            sender,
        };
        info!("Connection {} registered", id);
        self.connections.insert(id.clone(), connection);
        id
    }

    /// Drops a connection. Returns false if it was already gone.
    pub fn unregister(&mut self, id: &str) -> bool {
        if self.connections.remove(id).is_some() {
            info!("Connection {} unregistered", id);
            true
        } else {
            false
        }
    }

    /// Records the room and username a connection joined under, so a later
    /// disconnect can be routed like an explicit leave.
    pub fn set_session(&mut self, id: &str, username: &str, room_id: &str) {
        if let Some(connection) = self.connections.get_mut(id) {
            connection.username = Some(username.to_string());
            connection.room_id = Some(room_id.to_string());
            info!("Connection {} is now {} in room {}", id, username, room_id);
        }
    }

    /// Clears the room association after a leave.
    pub fn clear_session(&mut self, id: &str) {
        if let Some(connection) = self.connections.get_mut(id) {
            if let (Some(username), Some(room_id)) =
                (connection.username.take(), connection.room_id.take())
            {
                info!("Connection {} ({}) left room {}", id, username, room_id);
            }
        }
    }

    /// The room a connection currently sits in, if any.
    pub fn room_of(&self, id: &str) -> Option<String> {
        self.connections.get(id).and_then(|c| c.room_id.clone())
    }

    /// Queues a message for one connection.
    pub fn send_to(&self, id: &str, message: ServerMessage) {
        if let Some(connection) = self.connections.get(id) {
            if connection.sender.send(message).is_err() {
                warn!("Connection {} channel closed, dropping message", id);
            }
        }
    }

    /// Queues a message for a set of connections, optionally skipping one.
    /// Used for room-scoped fan-out where the actor already received a
    /// private snapshot.
    pub fn send_to_many(&self, ids: &[PlayerId], exclude: Option<&str>, message: &ServerMessage) {
        for id in ids {
            if Some(id.as_str()) == exclude {
                continue;
            }
            self.send_to(id, message.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::ServerEvent;

    fn test_message(event: ServerEvent) -> ServerMessage {
        ServerMessage {
            room_id: "ABCDEF".to_string(),
            event,
        }
    }

    fn register_pair(
        manager: &mut ConnectionManager,
    ) -> (PlayerId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (manager.register(tx), rx)
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut manager = ConnectionManager::new();
        let (first, _rx1) = register_pair(&mut manager);
        let (second, _rx2) = register_pair(&mut manager);

        assert_eq!(first, "conn-1");
        assert_eq!(second, "conn-2");
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut manager = ConnectionManager::new();
        let (id, _rx) = register_pair(&mut manager);

        assert!(manager.unregister(&id));
        assert!(!manager.unregister(&id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_session_round_trip() {
        let mut manager = ConnectionManager::new();
        let (id, _rx) = register_pair(&mut manager);

        assert_eq!(manager.room_of(&id), None);
        manager.set_session(&id, "alice", "ABCDEF");
        assert_eq!(manager.room_of(&id), Some("ABCDEF".to_string()));
        assert_eq!(manager.connections[&id].username.as_deref(), Some("alice"));

        manager.clear_session(&id);
        assert_eq!(manager.room_of(&id), None);
        assert_eq!(manager.connections[&id].username, None);
    }

    #[test]
    fn test_send_to_delivers_to_one_connection() {
        let mut manager = ConnectionManager::new();
        let (first, mut rx1) = register_pair(&mut manager);
        let (_second, mut rx2) = register_pair(&mut manager);

        manager.send_to(&first, test_message(ServerEvent::GameWin));

        assert!(matches!(rx1.try_recv().unwrap().event, ServerEvent::GameWin));
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_send_to_many_respects_exclusion() {
        let mut manager = ConnectionManager::new();
        let (first, mut rx1) = register_pair(&mut manager);
        let (second, mut rx2) = register_pair(&mut manager);

        let ids = vec![first.clone(), second.clone()];
        manager.send_to_many(&ids, Some(first.as_str()), &test_message(ServerEvent::GameWin));

        assert!(rx1.try_recv().is_err());
        assert!(matches!(rx2.try_recv().unwrap().event, ServerEvent::GameWin));
    }

    #[test]
    fn test_send_to_closed_channel_is_dropped_quietly() {
        let mut manager = ConnectionManager::new();
        let (id, rx) = register_pair(&mut manager);
        drop(rx);

        // Must not panic or error, just log and move on
        manager.send_to(&id, test_message(ServerEvent::GameWin));
    }
}
