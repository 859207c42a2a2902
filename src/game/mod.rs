//! Game Logic Module
//!
//! Everything that decides who wins a round. No I/O, no locking.
//!
//! ## Module Structure
//!
//! - `card`: Card attributes and the card-id table
//! - `deck`: Deck generation and drawing
//! - `rules`: Set predicate and board search
//! - `board`: Initial deal and replenishment
//! - `round`: Submissions, resolution, history

pub mod card;
pub mod deck;
pub mod rules;
pub mod board;
pub mod round;

// Re-export key types
pub use card::{Card, CardId, CardTable, Color, Shape, Number, Shading, CARD_COUNT};
pub use deck::{Deck, generate_deck};
pub use rules::{is_set, find_any_set, third_card};
pub use board::{Board, DEFAULT_BOARD_SIZE};
pub use round::{Game, Player, RoundRecord, RoundError, SubmitOutcome};
