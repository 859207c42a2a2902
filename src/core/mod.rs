//! Core deterministic primitives.
//!
//! Everything random in a game flows through the seeded generator here,
//! so a game can be replayed from its seed.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, derive_game_seed};
