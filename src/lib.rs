//! # Set Game Server
//!
//! Multiplayer server for the card game Set: players join a lobby, race to
//! find sets on a shared board, and the fastest valid submission wins
//! each round.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SET GAME SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Game logic (no I/O)                       │
//! │  ├── card.rs     - Card attributes, card-id table            │
//! │  ├── deck.rs     - Deck generation                           │
//! │  ├── rules.rs    - Set predicate, board search               │
//! │  ├── board.rs    - Deal and replenish                        │
//! │  └── round.rs    - Submissions and round resolution          │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── session.rs  - Lobby lifecycle, shared session handle    │
//! │  ├── protocol.rs - Message types                             │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! A game's deck order and card ids come from one seeded generator, so a
//! fixed seed (`SET_SEED`) reproduces the same game for the same inputs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use game::{Card, CardId, Game, is_set, find_any_set};
pub use network::{GameSession, SessionHandle, SessionConfig, SessionError, SnapshotView};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
