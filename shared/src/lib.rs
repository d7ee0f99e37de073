use serde::{Deserialize, Serialize};

pub mod protocol;

/// Lowest card value in the deck.
pub const CARD_MIN: u8 = 2;
/// Highest card value in the deck.
pub const CARD_MAX: u8 = 99;
/// Total number of cards in a fresh deck (values 2..=99).
pub const DECK_SIZE: usize = (CARD_MAX - CARD_MIN + 1) as usize;
/// Cards each player holds at the start of their turn.
pub const FULL_HAND_SIZE: usize = 7;
/// Cards a player must place per turn unless physically unable to.
pub const MIN_CARDS_PER_TURN: u32 = 2;
/// Backwards jump allowed against a stack's direction.
pub const JUMP_DISTANCE: u8 = 10;

pub const DEFAULT_MIN_PLAYERS: usize = 2;
pub const DEFAULT_MAX_PLAYERS: usize = 4;

/// A single card. Values range over [2, 99] and each value exists
/// exactly once across a game.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub value: u8,
}

impl Card {
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

/// Which way a stack's card values are ordered.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StackDirection {
    Increase,
    Decrease,
}

/// The four fixed stack identifiers. Wire names match the original
/// protocol so clients can key their layout off them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackId {
    #[serde(rename = "UP_1")]
    Up1,
    #[serde(rename = "UP_2")]
    Up2,
    #[serde(rename = "DOWN_1")]
    Down1,
    #[serde(rename = "DOWN_2")]
    Down2,
}

impl StackId {
    /// All four stacks in display order.
    pub const ALL: [StackId; 4] = [StackId::Up1, StackId::Up2, StackId::Down1, StackId::Down2];

    pub fn direction(&self) -> StackDirection {
        match self {
            StackId::Up1 | StackId::Up2 => StackDirection::Increase,
            StackId::Down1 | StackId::Down2 => StackDirection::Decrease,
        }
    }
}

impl std::fmt::Display for StackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StackId::Up1 => "UP_1",
            StackId::Up2 => "UP_2",
            StackId::Down1 => "DOWN_1",
            StackId::Down2 => "DOWN_2",
        };
        write!(f, "{}", name)
    }
}

/// One of the four ordered piles cards are placed onto. Cards are
/// append-only during play; the placement predicate guards every append.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Stack {
    pub id: StackId,
    pub direction: StackDirection,
    pub cards: Vec<Card>,
}

impl Stack {
    pub fn new(id: StackId) -> Self {
        Self {
            id,
            direction: id.direction(),
            cards: Vec::new(),
        }
    }

    pub fn top(&self) -> Option<Card> {
        self.cards.last().copied()
    }

    /// The placement predicate. An empty stack accepts any card. Otherwise
    /// an Increase stack takes anything above its top card, or exactly ten
    /// below it; a Decrease stack is the mirror image.
    pub fn can_place(&self, card: Card) -> bool {
        let top = match self.top() {
            Some(top) => top,
            None => return true,
        };

        match self.direction {
            StackDirection::Increase => {
                card.value > top.value || card.value + JUMP_DISTANCE == top.value
            }
            StackDirection::Decrease => {
                card.value < top.value || card.value == top.value + JUMP_DISTANCE
            }
        }
    }

    /// Re-checks that every adjacent pair in the stack satisfies the
    /// placement predicate. The predicate already guards appends, so this
    /// only exists for the defensive end-of-game validation.
    pub fn is_ordered(&self) -> bool {
        self.cards.windows(2).all(|pair| match self.direction {
            StackDirection::Increase => {
                pair[1].value > pair[0].value || pair[1].value + JUMP_DISTANCE == pair[0].value
            }
            StackDirection::Decrease => {
                pair[1].value < pair[0].value || pair[1].value == pair[0].value + JUMP_DISTANCE
            }
        })
    }
}

/// Lifecycle of a game room.
///
/// Waiting and Lost both accept a fresh start; Finished, Lost and Error
/// are terminal for the round that produced them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    InProgress,
    Finished,
    Lost,
    Error,
}

/// Per-room player limits.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
        }
    }
}
