//! Translates inbound protocol events into game operations and fans the
//! resulting snapshots back out to the room.
//!
//! The router is stateless: all state lives in the injected registry and
//! connection manager. Every failure inside an action is converted into a
//! single `error` event for the acting connection — nothing here may take
//! down the handling task or touch other rooms. Fan-out happens while the
//! room's game lock is held, so two serialized actions can never deliver
//! their snapshots out of order.

use crate::connection::ConnectionManager;
use crate::error::GameError;
use crate::game::Game;
use crate::registry::RoomRegistry;
use log::{debug, warn};
use shared::protocol::{ClientEvent, ClientMessage, PlayerId, ServerEvent, ServerMessage};
use shared::{Card, GameStatus, StackId};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct EventRouter {
    registry: Arc<RoomRegistry>,
    connections: Arc<RwLock<ConnectionManager>>,
}

impl EventRouter {
    pub fn new(registry: Arc<RoomRegistry>, connections: Arc<RwLock<ConnectionManager>>) -> Self {
        Self {
            registry,
            connections,
        }
    }

    /// Dispatches one inbound message. Errors end up as an `error` event on
    /// the acting connection and nowhere else.
    pub async fn handle_message(&self, conn_id: &str, message: ClientMessage) {
        let room_id = message.room_id.clone();
        let result = match message.event {
            ClientEvent::RoomJoin { username } => {
                self.join_room(conn_id, &room_id, &username).await
            }
            ClientEvent::RoomLeave => self.leave_room(conn_id).await,
            ClientEvent::GameStart => self.start_game(conn_id, &room_id).await,
            ClientEvent::CardPlace { card, stack_id } => {
                self.place_card(conn_id, &room_id, card, stack_id).await
            }
            ClientEvent::CardDraw => self.draw_card(conn_id, &room_id).await,
            ClientEvent::TurnFinish => self.finish_turn(conn_id, &room_id).await,
            ClientEvent::ChatSend { text, author } => {
                self.relay_chat(conn_id, &room_id, &text, &author).await
            }
        };

        if let Err(error) = result {
            warn!("Action from {} in room {} failed: {}", conn_id, room_id, error);
            self.connections.read().await.send_to(
                conn_id,
                ServerMessage {
                    room_id,
                    event: ServerEvent::Error {
                        error: error.to_string(),
                    },
                },
            );
        }
    }

    /// Transport-level disconnect: routed exactly like an explicit leave.
    /// A connection that never joined a room has nothing to clean up.
    pub async fn handle_disconnect(&self, conn_id: &str) {
        if let Err(error) = self.leave_room(conn_id).await {
            debug!("Disconnect cleanup for {}: {}", conn_id, error);
        }
    }

    async fn join_room(
        &self,
        conn_id: &str,
        room_id: &str,
        username: &str,
    ) -> Result<(), GameError> {
        let (shared, _created) = self.registry.get_or_create(room_id, conn_id).await?;
        let mut game = shared.lock().await;
        game.add_player(conn_id, username)?;
        self.connections
            .write()
            .await
            .set_session(conn_id, username, room_id);

        let ids = game.join_order.clone();
        let connections = self.connections.read().await;
        connections.send_to_many(
            &ids,
            Some(conn_id),
            &ServerMessage {
                room_id: room_id.to_string(),
                event: ServerEvent::PlayerJoined {
                    id: conn_id.to_string(),
                    username: username.to_string(),
                },
            },
        );
        if let Some(state) = game.player_state(conn_id) {
            connections.send_to(
                conn_id,
                ServerMessage {
                    room_id: room_id.to_string(),
                    event: ServerEvent::PlayerState(state),
                },
            );
        }
        Ok(())
    }

    /// Leaves whatever room the connection joined. The recorded session,
    /// not the payload, decides the room — a disconnect carries no payload.
    async fn leave_room(&self, conn_id: &str) -> Result<(), GameError> {
        let room_id = self
            .connections
            .read()
            .await
            .room_of(conn_id)
            .ok_or(GameError::RoomNotFound)?;

        let shared = match self.registry.get(&room_id).await {
            Some(shared) => shared,
            None => {
                // Room already swept; drop the stale session quietly
                self.connections.write().await.clear_session(conn_id);
                return Err(GameError::RoomNotFound);
            }
        };

        let mut game = shared.lock().await;
        let status_before = game.status;
        game.remove_player(conn_id);
        self.connections.write().await.clear_session(conn_id);

        let ids = game.join_order.clone();
        {
            let connections = self.connections.read().await;
            connections.send_to_many(
                &ids,
                None,
                &ServerMessage {
                    room_id: room_id.clone(),
                    event: ServerEvent::PlayerLeft {
                        id: conn_id.to_string(),
                    },
                },
            );
            // A departure can end the round (turn passed to a stuck player,
            // or the room dropped below the minimum); the outcome reaches
            // the remaining members exactly once
            if status_before == GameStatus::InProgress && game.status != status_before {
                announce_outcome(&connections, &game, &ids);
            }
            connections.send_to_many(
                &ids,
                None,
                &ServerMessage {
                    room_id: room_id.clone(),
                    event: ServerEvent::GameState(game.public_state()),
                },
            );
        }

        if game.is_empty() {
            self.registry.delete(&room_id).await;
        }
        Ok(())
    }

    async fn start_game(&self, conn_id: &str, room_id: &str) -> Result<(), GameError> {
        let shared = self
            .registry
            .get(room_id)
            .await
            .ok_or(GameError::RoomNotFound)?;
        let mut game = shared.lock().await;

        // Start requests from anyone but the host are dropped without an
        // error event
        if game.host_id != conn_id {
            debug!("Ignoring start request from non-host {} in {}", conn_id, room_id);
            return Ok(());
        }

        game.start()?;

        let ids = game.join_order.clone();
        let connections = self.connections.read().await;
        connections.send_to_many(
            &ids,
            Some(conn_id),
            &ServerMessage {
                room_id: room_id.to_string(),
                event: ServerEvent::GameStarted(game.public_state()),
            },
        );
        for id in &ids {
            if let Some(state) = game.player_state(id) {
                connections.send_to(
                    id,
                    ServerMessage {
                        room_id: room_id.to_string(),
                        event: ServerEvent::PlayerState(state),
                    },
                );
            }
        }
        Ok(())
    }

    async fn place_card(
        &self,
        conn_id: &str,
        room_id: &str,
        card: Card,
        stack_id: StackId,
    ) -> Result<(), GameError> {
        let shared = self
            .registry
            .get(room_id)
            .await
            .ok_or(GameError::RoomNotFound)?;
        let mut game = shared.lock().await;

        let accepted = game.play_card(conn_id, card, stack_id)?;
        let verdict = if accepted {
            ServerEvent::CardPlaceValid
        } else {
            ServerEvent::CardPlaceInvalid
        };
        self.connections.read().await.send_to(
            conn_id,
            ServerMessage {
                room_id: room_id.to_string(),
                event: verdict,
            },
        );
        self.push_state(&game, conn_id).await;
        Ok(())
    }

    async fn draw_card(&self, conn_id: &str, room_id: &str) -> Result<(), GameError> {
        let shared = self
            .registry
            .get(room_id)
            .await
            .ok_or(GameError::RoomNotFound)?;
        let mut game = shared.lock().await;
        game.draw_card(conn_id)?;
        self.push_state(&game, conn_id).await;
        Ok(())
    }

    async fn finish_turn(&self, conn_id: &str, room_id: &str) -> Result<(), GameError> {
        let shared = self
            .registry
            .get(room_id)
            .await
            .ok_or(GameError::RoomNotFound)?;
        let mut game = shared.lock().await;
        game.next_turn()?;
        self.push_state(&game, conn_id).await;
        Ok(())
    }

    /// Pure relay: no game state changes. An unknown room follows the same
    /// recoverable error path as every other action.
    async fn relay_chat(
        &self,
        conn_id: &str,
        room_id: &str,
        text: &str,
        author: &str,
    ) -> Result<(), GameError> {
        if text.is_empty() || author.is_empty() {
            return Ok(());
        }

        let shared = self
            .registry
            .get(room_id)
            .await
            .ok_or(GameError::RoomNotFound)?;
        let ids = shared.lock().await.join_order.clone();
        self.connections.read().await.send_to_many(
            &ids,
            Some(conn_id),
            &ServerMessage {
                room_id: room_id.to_string(),
                event: ServerEvent::ChatReceive {
                    text: text.to_string(),
                    author: author.to_string(),
                },
            },
        );
        Ok(())
    }

    /// Full-snapshot fan-out after a state mutation: the actor gets their
    /// private view, everyone else the public one, and terminal statuses
    /// announce the outcome to the whole room.
    async fn push_state(&self, game: &Game, actor_id: &str) {
        let ids = game.join_order.clone();
        let connections = self.connections.read().await;

        announce_outcome(&connections, game, &ids);

        if let Some(state) = game.player_state(actor_id) {
            connections.send_to(
                actor_id,
                ServerMessage {
                    room_id: game.room_id.clone(),
                    event: ServerEvent::PlayerState(state),
                },
            );
        }
        connections.send_to_many(
            &ids,
            Some(actor_id),
            &ServerMessage {
                room_id: game.room_id.clone(),
                event: ServerEvent::GameState(game.public_state()),
            },
        );
    }
}

/// Announces a terminal outcome to the whole room. A no-op while the game
/// is still running.
fn announce_outcome(connections: &ConnectionManager, game: &Game, ids: &[PlayerId]) {
    match game.status {
        GameStatus::Finished => connections.send_to_many(
            ids,
            None,
            &ServerMessage {
                room_id: game.room_id.clone(),
                event: ServerEvent::GameWin,
            },
        ),
        GameStatus::Lost => connections.send_to_many(
            ids,
            None,
            &ServerMessage {
                room_id: game.room_id.clone(),
                event: ServerEvent::GameLose {
                    remaining_cards: game.remaining_cards(),
                },
            },
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{PlayerId, PlayerState};
    use shared::Stack;
    use tokio::sync::mpsc;

    fn new_router() -> (Arc<EventRouter>, Arc<RoomRegistry>, Arc<RwLock<ConnectionManager>>) {
        let registry = Arc::new(RoomRegistry::new());
        let connections = Arc::new(RwLock::new(ConnectionManager::new()));
        let router = Arc::new(EventRouter::new(
            Arc::clone(&registry),
            Arc::clone(&connections),
        ));
        (router, registry, connections)
    }

    async fn connect(
        connections: &Arc<RwLock<ConnectionManager>>,
    ) -> (PlayerId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = connections.write().await.register(tx);
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn message(room_id: &str, event: ClientEvent) -> ClientMessage {
        ClientMessage {
            room_id: room_id.to_string(),
            event,
        }
    }

    async fn join(router: &EventRouter, conn_id: &str, room_id: &str, username: &str) {
        router
            .handle_message(
                conn_id,
                message(
                    room_id,
                    ClientEvent::RoomJoin {
                        username: username.to_string(),
                    },
                ),
            )
            .await;
    }

    fn player_states(messages: &[ServerMessage]) -> Vec<PlayerState> {
        messages
            .iter()
            .filter_map(|m| match &m.event {
                ServerEvent::PlayerState(state) => Some(state.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_join_creates_room_and_sends_private_snapshot() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;

        join(&router, &c1, "ABCDEF", "alice").await;

        assert!(registry.get("ABCDEF").await.is_some());
        let messages = drain(&mut rx1);
        let states = player_states(&messages);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].your_id, c1);
        assert_eq!(states[0].game.host_id, c1);
        assert!(!messages
            .iter()
            .any(|m| matches!(m.event, ServerEvent::PlayerJoined { .. })));
    }

    #[tokio::test]
    async fn test_second_join_notifies_existing_members() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;

        join(&router, &c1, "ABCDEF", "alice").await;
        drain(&mut rx1);
        join(&router, &c2, "ABCDEF", "bob").await;

        let joined: Vec<_> = drain(&mut rx1)
            .into_iter()
            .filter_map(|m| match m.event {
                ServerEvent::PlayerJoined { id, username } => Some((id, username)),
                _ => None,
            })
            .collect();
        assert_eq!(joined, vec![(c2.clone(), "bob".to_string())]);

        let states = player_states(&drain(&mut rx2));
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].game.players.len(), 2);
        assert_eq!(states[0].game.host_id, c1);
    }

    #[tokio::test]
    async fn test_join_full_room_reports_error_to_joiner_only() {
        let (router, _registry, connections) = new_router();
        let mut members = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let (id, rx) = connect(&connections).await;
            join(&router, &id, "ABCDEF", name).await;
            members.push((id, rx));
        }
        let (c5, mut rx5) = connect(&connections).await;

        join(&router, &c5, "ABCDEF", "e").await;

        let messages = drain(&mut rx5);
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0].event,
            ServerEvent::Error { error } if error == "game is full"
        ));
        for (_, rx) in members.iter_mut() {
            assert!(!drain(rx)
                .iter()
                .any(|m| matches!(m.event, ServerEvent::Error { .. })));
        }
    }

    #[tokio::test]
    async fn test_non_host_start_is_silently_ignored() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);

        router
            .handle_message(&c2, message("ABCDEF", ClientEvent::GameStart))
            .await;

        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
        let game = registry.get("ABCDEF").await.unwrap();
        assert_eq!(game.lock().await.status, GameStatus::Waiting);
    }

    #[tokio::test]
    async fn test_host_start_fans_out_snapshots() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);

        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::GameStart))
            .await;

        // Host gets a private snapshot, never the room-wide start event
        let host_messages = drain(&mut rx1);
        assert!(!host_messages
            .iter()
            .any(|m| matches!(m.event, ServerEvent::GameStarted(_))));
        let host_states = player_states(&host_messages);
        assert_eq!(host_states.len(), 1);
        assert_eq!(host_states[0].your_id, c1);
        assert_eq!(host_states[0].your_hand.len(), 7);

        let other_messages = drain(&mut rx2);
        assert!(other_messages
            .iter()
            .any(|m| matches!(m.event, ServerEvent::GameStarted(_))));
        let other_states = player_states(&other_messages);
        assert_eq!(other_states.len(), 1);
        assert_eq!(other_states[0].your_id, c2);

        // Hands never leak between recipients
        assert!(host_states[0]
            .your_hand
            .iter()
            .all(|card| !other_states[0].your_hand.contains(card)));
    }

    #[tokio::test]
    async fn test_place_card_verdicts_and_snapshots() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);
        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::GameStart))
            .await;
        drain(&mut rx2);
        let states = player_states(&drain(&mut rx1));
        let card = states[0].your_hand[0];

        // Empty stacks take anything
        router
            .handle_message(
                &c1,
                message(
                    "ABCDEF",
                    ClientEvent::CardPlace {
                        card,
                        stack_id: StackId::Up1,
                    },
                ),
            )
            .await;

        let actor_messages = drain(&mut rx1);
        assert!(actor_messages
            .iter()
            .any(|m| matches!(m.event, ServerEvent::CardPlaceValid)));
        let actor_states = player_states(&actor_messages);
        assert!(!actor_states[0].your_hand.contains(&card));

        // The rest of the room sees the public snapshot, not the verdict
        let room_messages = drain(&mut rx2);
        assert!(room_messages
            .iter()
            .any(|m| matches!(m.event, ServerEvent::GameState(_))));
        assert!(!room_messages
            .iter()
            .any(|m| matches!(m.event, ServerEvent::CardPlaceValid)));

        // Rejected placement: the stack now tops at `card`, replay a card
        // that cannot follow it
        let game = registry.get("ABCDEF").await.unwrap();
        let blocked = Card::new(if card.value > 2 { card.value - 1 } else { 3 });
        game.lock()
            .await
            .players
            .get_mut(&c1)
            .unwrap()
            .hand
            .push(blocked);
        let expect_invalid = blocked.value < card.value && blocked.value + 10 != card.value;
        router
            .handle_message(
                &c1,
                message(
                    "ABCDEF",
                    ClientEvent::CardPlace {
                        card: blocked,
                        stack_id: StackId::Up1,
                    },
                ),
            )
            .await;
        if expect_invalid {
            assert!(drain(&mut rx1)
                .iter()
                .any(|m| matches!(m.event, ServerEvent::CardPlaceInvalid)));
        }
    }

    #[tokio::test]
    async fn test_unknown_room_error_goes_only_to_actor() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (_c2, mut rx2) = connect(&connections).await;

        router
            .handle_message(&c1, message("NOROOM", ClientEvent::CardDraw))
            .await;

        let messages = drain(&mut rx1);
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0].event,
            ServerEvent::Error { error } if error == "room not found"
        ));
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_last_leaver_deletes_the_room() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        drain(&mut rx1);

        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::RoomLeave))
            .await;

        assert!(registry.get("ABCDEF").await.is_none());
        assert_eq!(connections.read().await.room_of(&c1), None);

        // The code is free again
        join(&router, &c1, "ABCDEF", "alice").await;
        assert!(registry.get("ABCDEF").await.is_some());
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_members() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);

        router
            .handle_message(&c2, message("ABCDEF", ClientEvent::RoomLeave))
            .await;

        let messages = drain(&mut rx1);
        assert!(messages
            .iter()
            .any(|m| matches!(&m.event, ServerEvent::PlayerLeft { id } if *id == c2)));
        let snapshot = messages.iter().find_map(|m| match &m.event {
            ServerEvent::GameState(state) => Some(state.clone()),
            _ => None,
        });
        assert_eq!(snapshot.unwrap().players.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_that_strands_the_next_player_announces_the_loss() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        let (c3, mut rx3) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        join(&router, &c3, "ABCDEF", "carol").await;
        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::GameStart))
            .await;
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx3);

        // Rig the board so the player after the host has no legal move
        {
            let game = registry.get("ABCDEF").await.unwrap();
            let mut game = game.lock().await;
            game.deck.clear();
            for (stack, top) in game.stacks.iter_mut().zip([90u8, 95, 5, 4]) {
                stack.cards = vec![Card::new(top)];
            }
            game.players.get_mut(&c2).unwrap().hand = vec![Card::new(6)];
            game.players.get_mut(&c3).unwrap().hand = vec![Card::new(50)];
        }

        // The current player leaving passes the turn to the stuck player
        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::RoomLeave))
            .await;

        for rx in [&mut rx2, &mut rx3] {
            let messages = drain(rx);
            assert!(messages
                .iter()
                .any(|m| matches!(m.event, ServerEvent::PlayerLeft { .. })));
            assert!(
                messages
                    .iter()
                    .any(|m| matches!(m.event, ServerEvent::GameLose { remaining_cards: 2 })),
                "loss must reach the remaining members"
            );
            let snapshot = messages.iter().find_map(|m| match &m.event {
                ServerEvent::GameState(state) => Some(state.clone()),
                _ => None,
            });
            assert_eq!(snapshot.unwrap().status, GameStatus::Lost);
        }
        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_is_equivalent_to_leave() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);

        router.handle_disconnect(&c2).await;

        assert!(drain(&mut rx1)
            .iter()
            .any(|m| matches!(&m.event, ServerEvent::PlayerLeft { id } if *id == c2)));
        let game = registry.get("ABCDEF").await.unwrap();
        assert_eq!(game.lock().await.players.len(), 1);

        // A connection that never joined produces no traffic on disconnect
        let (c3, mut rx3) = connect(&connections).await;
        router.handle_disconnect(&c3).await;
        assert!(drain(&mut rx3).is_empty());
    }

    #[tokio::test]
    async fn test_chat_relays_to_room_except_sender() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);

        router
            .handle_message(
                &c1,
                message(
                    "ABCDEF",
                    ClientEvent::ChatSend {
                        text: "hello".to_string(),
                        author: "alice".to_string(),
                    },
                ),
            )
            .await;

        assert!(drain(&mut rx1).is_empty());
        let received = drain(&mut rx2);
        assert!(matches!(
            &received[0].event,
            ServerEvent::ChatReceive { text, author } if text == "hello" && author == "alice"
        ));
    }

    #[tokio::test]
    async fn test_chat_with_empty_text_is_dropped() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        drain(&mut rx1);
        drain(&mut rx2);

        router
            .handle_message(
                &c1,
                message(
                    "ABCDEF",
                    ClientEvent::ChatSend {
                        text: String::new(),
                        author: "alice".to_string(),
                    },
                ),
            )
            .await;

        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_chat_to_unknown_room_reports_error() {
        let (router, _registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;

        router
            .handle_message(
                &c1,
                message(
                    "NOROOM",
                    ClientEvent::ChatSend {
                        text: "anyone here?".to_string(),
                        author: "alice".to_string(),
                    },
                ),
            )
            .await;

        let messages = drain(&mut rx1);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].event, ServerEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_snapshots_never_leak_foreign_hands() {
        let (router, registry, connections) = new_router();
        let (c1, mut rx1) = connect(&connections).await;
        let (c2, mut rx2) = connect(&connections).await;
        join(&router, &c1, "ABCDEF", "alice").await;
        join(&router, &c2, "ABCDEF", "bob").await;
        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::GameStart))
            .await;
        drain(&mut rx1);
        drain(&mut rx2);

        router
            .handle_message(&c1, message("ABCDEF", ClientEvent::CardDraw))
            .await;

        let game = registry.get("ABCDEF").await.unwrap();
        let authoritative_hand = game.lock().await.players[&c1].hand.clone();

        // The actor's private snapshot mirrors authoritative state
        let actor_states = player_states(&drain(&mut rx1));
        assert_eq!(actor_states.last().unwrap().your_hand, authoritative_hand);

        // Everyone else sees only the count
        for m in drain(&mut rx2) {
            match m.event {
                ServerEvent::PlayerState(state) => {
                    assert_eq!(state.your_id, c2, "foreign private snapshot delivered");
                }
                ServerEvent::GameState(state) => {
                    let summary = state.players.iter().find(|p| p.id == c1).unwrap();
                    assert_eq!(summary.hand_size, authoritative_hand.len());
                    assert!(state.stacks.iter().all(|s: &Stack| s.cards.is_empty()));
                }
                _ => {}
            }
        }
    }
}
