//! # Game Server Library
//!
//! Authoritative server for a cooperative card game. Players share one deck
//! and try to empty it onto four ordered piles; the server owns the rules,
//! the room registry, and every card, and clients only ever see snapshots.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! All game decisions happen here. Clients send intents (join, place, draw,
//! finish turn) and receive full state snapshots in return; they never hold
//! state the server did not give them, and they never see another player's
//! hand.
//!
//! ### Room Lifecycle
//! Rooms are created on first join, shared by code, and deleted when the
//! last player leaves or when a background sweep finds them idle. Each room
//! serializes its actions behind one lock, so concurrent clients in the
//! same room always observe a single consistent history.
//!
//! ### Snapshot Broadcasting
//! After every state change the acting player receives a private snapshot
//! (public state plus their own hand) and the rest of the room receives the
//! public snapshot. Terminal outcomes are announced to the whole room.
//!
//! ## Module Organization
//!
//! - [`game`] — deck, piles, turn order, and the win/loss rules
//! - [`registry`] — room table with creation, lookup, and idle sweeping
//! - [`connection`] — connection identities, sessions, and outbound channels
//! - [`handlers`] — event routing from protocol messages to game calls
//! - [`network`] — TCP accept loop and length-prefixed frame transport
//! - [`error`] — the error type every fallible game operation returns
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_secs(60),       // sweep interval
//!         Duration::from_secs(30 * 60),  // max room idle time
//!     ).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod game;
pub mod handlers;
pub mod network;
pub mod registry;
