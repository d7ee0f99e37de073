use thiserror::Error;

/// Everything that can go wrong inside a game or registry operation.
///
/// Handlers convert each of these into a single `error` event for the
/// acting connection; they never escape the handling path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room already exists")]
    AlreadyExists,
    #[error("missing room id or host id")]
    InvalidArgument,
    #[error("game is full")]
    GameFull,
    #[error("game already started")]
    AlreadyStarted,
    #[error("cannot start game")]
    CannotStart,
    #[error("stack not found")]
    StackNotFound,
    #[error("no cards in deck")]
    DeckEmpty,
    #[error("player not found")]
    PlayerNotFound,
    #[error("card not in hand")]
    CardNotInHand,
    #[error("invalid game state")]
    InvalidState,
}
