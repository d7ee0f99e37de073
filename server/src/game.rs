//! The per-room state machine: deck, hands, stacks, turn order and status.
//!
//! All rule enforcement lives here. The structure invariant while a game is
//! in progress: the deck, every hand and every stack together partition the
//! full card set {2..99} — every mutation preserves that.

use crate::error::GameError;
use log::info;
use rand::Rng;
use shared::protocol::{PlayerId, PlayerState, PlayerSummary, PublicState};
use shared::{
    Card, GameStatus, Settings, Stack, StackId, CARD_MAX, CARD_MIN, DECK_SIZE, FULL_HAND_SIZE,
    MIN_CARDS_PER_TURN,
};
use std::collections::HashMap;
use std::time::Instant;

/// One room member. `is_host` is not stored; it is derived from the game's
/// `host_id` when projecting state.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub hand: Vec<Card>,
}

/// Authoritative state of a single room.
///
/// `join_order` is the explicit ordered sequence backing turn rotation and
/// host succession; `players` is the lookup table over the same ids. The
/// two are kept in lockstep by `add_player`/`remove_player`.
#[derive(Debug)]
pub struct Game {
    pub room_id: String,
    pub host_id: PlayerId,
    pub deck: Vec<Card>,
    pub stacks: Vec<Stack>,
    pub players: HashMap<PlayerId, Player>,
    pub join_order: Vec<PlayerId>,
    pub status: GameStatus,
    pub turn_index: usize,
    pub current_turn: Option<PlayerId>,
    pub cards_placed_this_turn: u32,
    pub last_activity: Instant,
    pub settings: Settings,
}

impl Game {
    pub fn new(room_id: &str, host_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            host_id: host_id.to_string(),
            deck: Vec::new(),
            stacks: Vec::new(),
            players: HashMap::new(),
            join_order: Vec::new(),
            status: GameStatus::Waiting,
            turn_index: 0,
            current_turn: None,
            cards_placed_this_turn: 0,
            last_activity: Instant::now(),
            settings: Settings::default(),
        }
    }

    pub fn add_player(&mut self, id: &str, username: &str) -> Result<(), GameError> {
        if self.players.len() >= self.settings.max_players {
            return Err(GameError::GameFull);
        }
        if self.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }

        let player = Player {
            id: id.to_string(),
            username: username.to_string(),
            hand: Vec::new(),
        };
        self.players.insert(id.to_string(), player);
        self.join_order.push(id.to_string());
        info!("Player {} ({}) joined room {}", id, username, self.room_id);
        self.touch();
        Ok(())
    }

    /// Removes a player, reassigning the host and fixing up the turn
    /// rotation as needed. Returns false if the id was not in the room.
    pub fn remove_player(&mut self, id: &str) -> bool {
        let position = match self.join_order.iter().position(|p| p == id) {
            Some(position) => position,
            None => return false,
        };
        self.join_order.remove(position);
        self.players.remove(id);
        info!("Player {} left room {}", id, self.room_id);

        // Host succession: earliest remaining player in join order
        if self.host_id == id {
            if let Some(next_host) = self.join_order.first() {
                self.host_id = next_host.clone();
                info!("Host of room {} reassigned to {}", self.room_id, next_host);
            }
        }

        if self.status == GameStatus::InProgress {
            if self.players.len() < self.settings.min_players {
                // Ending early is not a loss
                self.status = GameStatus::Finished;
                self.current_turn = None;
                info!("Room {} finished early: not enough players", self.room_id);
            } else if position < self.turn_index {
                self.turn_index -= 1;
            } else if position == self.turn_index {
                // The current player left: their turn passes on
                self.turn_index %= self.join_order.len();
                self.current_turn = Some(self.join_order[self.turn_index].clone());
                self.cards_placed_this_turn = 0;
                self.check_current_player_stuck();
            }
        }

        self.touch();
        true
    }

    pub fn can_start(&self) -> bool {
        matches!(self.status, GameStatus::Waiting | GameStatus::Lost)
            && self.players.len() >= self.settings.min_players
    }

    /// (Re)starts the round: fresh deck, fresh empty stacks, seven random
    /// cards per player, turn to the join-order-first player.
    pub fn start(&mut self) -> Result<(), GameError> {
        if !self.can_start() {
            return Err(GameError::CannotStart);
        }

        self.deck = (CARD_MIN..=CARD_MAX).map(Card::new).collect();
        self.stacks = StackId::ALL.iter().map(|id| Stack::new(*id)).collect();

        let ids: Vec<PlayerId> = self.join_order.clone();
        for id in &ids {
            let mut hand = Vec::with_capacity(FULL_HAND_SIZE);
            for _ in 0..FULL_HAND_SIZE {
                // Deck always holds enough: max players * hand size < 98
                if let Some(card) = take_random(&mut self.deck) {
                    hand.push(card);
                }
            }
            if let Some(player) = self.players.get_mut(id) {
                player.hand = hand;
            }
        }

        self.turn_index = 0;
        self.current_turn = self.join_order.first().cloned();
        self.cards_placed_this_turn = 0;
        self.status = GameStatus::InProgress;
        info!(
            "Room {} started with {} players, {} cards in deck",
            self.room_id,
            self.players.len(),
            self.deck.len()
        );
        self.touch();
        Ok(())
    }

    /// Moves one uniformly random card from the deck into the player's hand.
    pub fn draw_card(&mut self, player_id: &str) -> Result<Card, GameError> {
        if self.deck.is_empty() {
            return Err(GameError::DeckEmpty);
        }
        if !self.players.contains_key(player_id) {
            return Err(GameError::PlayerNotFound);
        }

        let card = take_random(&mut self.deck).ok_or(GameError::DeckEmpty)?;
        if let Some(player) = self.players.get_mut(player_id) {
            player.hand.push(card);
        }
        self.touch();
        Ok(card)
    }

    /// Attempts to place a card onto a stack. Returns whether the placement
    /// was accepted; the game may transition to a terminal status as a side
    /// effect. Either outcome can surface the turn-minimum deadlock loss,
    /// and a rejection with nothing else placeable evaluates completion.
    pub fn play_card(
        &mut self,
        player_id: &str,
        card: Card,
        stack_id: StackId,
    ) -> Result<bool, GameError> {
        let stack_index = self
            .stacks
            .iter()
            .position(|s| s.id == stack_id)
            .ok_or(GameError::StackNotFound)?;
        if !self.players.contains_key(player_id) {
            return Err(GameError::PlayerNotFound);
        }

        if self.stacks[stack_index].can_place(card) {
            // Take the card out of the hand before appending so a missing
            // card cannot end up duplicated onto the stack
            let player = self
                .players
                .get_mut(player_id)
                .ok_or(GameError::PlayerNotFound)?;
            let hand_index = player
                .hand
                .iter()
                .position(|c| c.value == card.value)
                .ok_or(GameError::CardNotInHand)?;
            let card = player.hand.remove(hand_index);
            self.stacks[stack_index].cards.push(card);
            self.cards_placed_this_turn += 1;

            // Turn-minimum deadlock rule: the move itself stands, but the
            // game is lost the moment the rest of the hand is unplayable
            // before the two-card minimum was met
            if self.cards_placed_this_turn < MIN_CARDS_PER_TURN && !self.can_play_any(player_id) {
                self.status = GameStatus::Lost;
                info!(
                    "Room {} lost: {} cannot reach the per-turn minimum",
                    self.room_id, player_id
                );
            }

            self.touch();
            Ok(true)
        } else {
            self.touch();
            if !self.can_play_any(player_id) {
                self.evaluate_completion();
                // A rejected attempt can reveal the deadlock mid-turn too:
                // same minimum rule as the success path
                if self.status == GameStatus::InProgress
                    && self.cards_placed_this_turn < MIN_CARDS_PER_TURN
                {
                    self.status = GameStatus::Lost;
                    info!(
                        "Room {} lost: {} cannot reach the per-turn minimum",
                        self.room_id, player_id
                    );
                }
            }
            Ok(false)
        }
    }

    /// Refills the just-finished player's hand and rotates the turn. The
    /// incoming player is checked for a dead hand before their turn begins.
    pub fn next_turn(&mut self) -> Result<(), GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::InvalidState);
        }
        let current = self.current_turn.clone().ok_or(GameError::InvalidState)?;
        let hand_size = self
            .players
            .get(&current)
            .ok_or(GameError::PlayerNotFound)?
            .hand
            .len();
        if hand_size >= FULL_HAND_SIZE {
            // No-op guard: nothing to refill, nothing has changed
            return Err(GameError::InvalidState);
        }

        while self.hand_size(&current) < FULL_HAND_SIZE && !self.deck.is_empty() {
            self.draw_card(&current)?;
        }

        self.cards_placed_this_turn = 0;
        self.turn_index = (self.turn_index + 1) % self.join_order.len();
        self.current_turn = Some(self.join_order[self.turn_index].clone());
        self.check_current_player_stuck();
        self.touch();
        Ok(())
    }

    /// True if the player holds at least one card placeable on any stack.
    pub fn can_play_any(&self, player_id: &str) -> bool {
        match self.players.get(player_id) {
            Some(player) => player
                .hand
                .iter()
                .any(|card| self.stacks.iter().any(|stack| stack.can_place(*card))),
            None => false,
        }
    }

    /// Defensive end-of-game validation: all 98 cards placed and every
    /// stack internally ordered.
    pub fn valid_stacks(&self) -> bool {
        let placed: usize = self.stacks.iter().map(|s| s.cards.len()).sum();
        placed == DECK_SIZE && self.stacks.iter().all(|s| s.is_ordered())
    }

    /// Cards not yet placed on a stack: the deck plus every hand.
    pub fn remaining_cards(&self) -> usize {
        self.deck.len() + self.players.values().map(|p| p.hand.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// The shared projection: hands reduced to sizes, play area in full.
    pub fn public_state(&self) -> PublicState {
        PublicState {
            room_id: self.room_id.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            players: self
                .join_order
                .iter()
                .filter_map(|id| self.players.get(id))
                .map(|p| PlayerSummary {
                    id: p.id.clone(),
                    username: p.username.clone(),
                    hand_size: p.hand.len(),
                    is_host: p.id == self.host_id,
                })
                .collect(),
            stacks: self.stacks.clone(),
            deck_size: self.deck.len(),
            current_turn: self.current_turn.clone(),
            settings: self.settings,
        }
    }

    /// The private projection for one recipient: public state plus their
    /// own hand. Never computed for anyone else.
    pub fn player_state(&self, player_id: &str) -> Option<PlayerState> {
        let player = self.players.get(player_id)?;
        Some(PlayerState {
            game: self.public_state(),
            your_hand: player.hand.clone(),
            your_id: player.id.clone(),
        })
    }

    fn hand_size(&self, player_id: &str) -> usize {
        self.players.get(player_id).map_or(0, |p| p.hand.len())
    }

    /// Declares the loss when the player whose turn is starting cannot
    /// place anything.
    fn check_current_player_stuck(&mut self) {
        if let Some(current) = self.current_turn.clone() {
            if !self.can_play_any(&current) {
                self.status = GameStatus::Lost;
                info!(
                    "Room {} lost: {} has no playable card at turn start",
                    self.room_id, current
                );
            }
        }
    }

    /// Once nothing is left to place anywhere, the round is either won or,
    /// should a stack somehow be out of order, flagged as an engine error.
    fn evaluate_completion(&mut self) {
        let hands_empty = self.players.values().all(|p| p.hand.is_empty());
        if self.deck.is_empty() && hands_empty {
            self.status = if self.valid_stacks() {
                info!("Room {} finished: all cards placed", self.room_id);
                GameStatus::Finished
            } else {
                GameStatus::Error
            };
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Removes and returns a uniformly random card.
fn take_random(deck: &mut Vec<Card>) -> Option<Card> {
    if deck.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..deck.len());
    Some(deck.swap_remove(index))
}
