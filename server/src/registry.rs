//! The room table: one [`Game`] per room code, created on first join and
//! garbage-collected when idle.
//!
//! Each game sits behind its own `tokio::sync::Mutex`, which is what
//! serializes all mutations for a room; the table itself is behind an
//! `RwLock` so room creation and deletion are atomic check-then-act. The
//! registry is an explicit component handed to the handlers, never a
//! process-wide singleton.

use crate::error::GameError;
use crate::game::Game;
use log::info;
use shared::protocol::PublicState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// A room's game, shared between the handler tasks and the sweeper.
pub type SharedGame = Arc<Mutex<Game>>;

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, SharedGame>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a room. Two concurrent creations of the same code cannot
    /// both succeed; the loser sees `AlreadyExists`.
    pub async fn create(&self, room_id: &str, host_id: &str) -> Result<SharedGame, GameError> {
        if room_id.is_empty() || host_id.is_empty() {
            return Err(GameError::InvalidArgument);
        }

        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(room_id) {
            return Err(GameError::AlreadyExists);
        }

        let game = Arc::new(Mutex::new(Game::new(room_id, host_id)));
        rooms.insert(room_id.to_string(), Arc::clone(&game));
        info!("Created room {} (host {})", room_id, host_id);
        Ok(game)
    }

    /// The first-join path: returns the existing room or creates it, under
    /// a single write lock so concurrent joins to an unknown code converge
    /// on one game. The flag reports whether this call created the room.
    pub async fn get_or_create(
        &self,
        room_id: &str,
        host_id: &str,
    ) -> Result<(SharedGame, bool), GameError> {
        if room_id.is_empty() || host_id.is_empty() {
            return Err(GameError::InvalidArgument);
        }

        let mut rooms = self.rooms.write().await;
        if let Some(game) = rooms.get(room_id) {
            return Ok((Arc::clone(game), false));
        }

        let game = Arc::new(Mutex::new(Game::new(room_id, host_id)));
        rooms.insert(room_id.to_string(), Arc::clone(&game));
        info!("Created room {} (host {})", room_id, host_id);
        Ok((game, true))
    }

    pub async fn get(&self, room_id: &str) -> Option<SharedGame> {
        self.rooms.read().await.get(room_id).map(Arc::clone)
    }

    /// Deletes a room. Deleting an absent room is an idempotent no-op.
    pub async fn delete(&self, room_id: &str) -> bool {
        let removed = self.rooms.write().await.remove(room_id).is_some();
        if removed {
            info!("Deleted room {}", room_id);
        }
        removed
    }

    /// Read-only snapshot of every active room.
    pub async fn list_all(&self) -> Vec<SharedGame> {
        self.rooms.read().await.values().map(Arc::clone).collect()
    }

    /// Public-state projection of every room, backing the external room
    /// listing endpoint. Pure, no side effects.
    pub async fn summaries(&self) -> Vec<PublicState> {
        let rooms = self.list_all().await;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            summaries.push(room.lock().await.public_state());
        }
        summaries
    }

    /// Deletes every room idle for longer than `max_age`. The staleness
    /// check uses `try_lock`: a room whose mutex is held is mid-action and
    /// therefore not idle, and never blocking here keeps the sweep from
    /// waiting on game locks while it holds the table lock.
    pub async fn sweep_inactive(&self, max_age: Duration) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut stale = Vec::new();
        for (room_id, game) in rooms.iter() {
            if let Ok(game) = game.try_lock() {
                if game.last_activity.elapsed() > max_age {
                    stale.push(room_id.clone());
                }
            }
        }
        for room_id in &stale {
            rooms.remove(room_id);
            info!("Swept inactive room {}", room_id);
        }
        stale
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}
