//! Wire protocol between clients and the authoritative server.
//!
//! Every message is a `{room_id, event}` envelope serialized with bincode
//! and carried in a length-prefixed frame. Inbound actions form a closed,
//! tagged set with one payload shape per action; outbound state updates are
//! always full snapshots, so a client that applies the latest snapshot it
//! received is bit-for-bit consistent with server truth.

use crate::{Card, GameStatus, Settings, Stack, StackId};
use serde::{Deserialize, Serialize};

/// Opaque per-connection identity assigned by the server.
pub type PlayerId = String;

/// Upper bound on a single wire frame. Anything larger is treated as a
/// protocol violation and drops the offending connection.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Inbound envelope: every client action is scoped to a room code.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientMessage {
    pub room_id: String,
    pub event: ClientEvent,
}

/// Actions a client may request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientEvent {
    /// `room:join` — enter the room, creating it if the code is unknown.
    RoomJoin { username: String },
    /// `room:leave` — leave the room explicitly.
    RoomLeave,
    /// `game:start` — host only; silently ignored from anyone else.
    GameStart,
    /// `card:place` — attempt to place one hand card onto a stack.
    CardPlace { card: Card, stack_id: StackId },
    /// `card:draw` — draw one random card from the deck.
    CardDraw,
    /// `turn:finish` — refill the current hand and rotate the turn.
    TurnFinish,
    /// `chat:send` — relayed verbatim to the rest of the room.
    ChatSend { text: String, author: String },
}

/// Outbound envelope mirroring [`ClientMessage`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerMessage {
    pub room_id: String,
    pub event: ServerEvent,
}

/// Events the server pushes to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerEvent {
    /// `player:joined` — sent to the room except the joiner.
    PlayerJoined { id: PlayerId, username: String },
    /// `player:left` — sent to the room.
    PlayerLeft { id: PlayerId },
    /// `player:state` — private snapshot, sent to exactly one connection.
    PlayerState(PlayerState),
    /// `game:state` — public snapshot, sent to the room except the actor.
    GameState(PublicState),
    /// `game:start` — public snapshot, sent to the room except the host.
    GameStarted(PublicState),
    /// `card:place-valid` — the actor's placement was accepted.
    CardPlaceValid,
    /// `card:place-invalid` — the actor's placement was rejected.
    CardPlaceInvalid,
    /// `game:win` — every card was placed in order.
    GameWin,
    /// `game:lose` — the deadlock rule fired; counts cards still unplaced.
    GameLose { remaining_cards: usize },
    /// `chat:receive` — sent to the room except the sender.
    ChatReceive { text: String, author: String },
    /// `error` — sent only to the connection whose action failed.
    Error { error: String },
}

/// One room member as everyone in the room sees them. Hand contents stay
/// private; only the count is shared.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub username: String,
    pub hand_size: usize,
    pub is_host: bool,
}

/// The state of a game that every participant may see: the play area is
/// public, hands are reduced to their sizes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicState {
    pub room_id: String,
    pub host_id: PlayerId,
    pub status: GameStatus,
    pub players: Vec<PlayerSummary>,
    pub stacks: Vec<Stack>,
    pub deck_size: usize,
    pub current_turn: Option<PlayerId>,
    pub settings: Settings,
}

/// Public state plus the recipient's own hand. Computed per recipient and
/// never delivered to anyone else.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub game: PublicState,
    pub your_hand: Vec<Card>,
    pub your_id: PlayerId,
}

/// Serializes a message into a frame: 4-byte big-endian payload length
/// followed by the bincode payload.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, bincode::Error> {
    let payload = bincode::serialize(message)?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Deserializes a frame payload (without the length prefix).
pub fn decode_payload<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(payload)
}
