//! Round Engine
//!
//! Owns the deck, board, players and the current round's submissions.
//! `submit` only admits and stores; `try_resolve` picks the winner once
//! every registered player has a submission on record.
//!
//! Ties on elapsed time go to the submission admitted first. A player who
//! resubmits replaces their old entry and takes a new admission slot.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::board::Board;
use crate::game::card::Card;
use crate::game::deck::Deck;
use crate::game::rules::is_set;

/// First round number of a game.
pub const FIRST_ROUND: u32 = 1;

// =============================================================================
// PLAYER
// =============================================================================

/// A registered player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique name within the game
    pub name: String,

    /// Elapsed times (ms) of the rounds this player won, oldest first
    pub times: Vec<f64>,
}

impl Player {
    /// Create a player with no wins.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            times: Vec::new(),
        }
    }

    /// Rounds won.
    pub fn wins(&self) -> usize {
        self.times.len()
    }
}

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// A player's candidate set for the current round.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// The three selected cards
    pub cards: [Card; 3],

    /// Time taken to find the set (ms)
    pub elapsed_ms: f64,

    /// Admission order within the round
    pub seq: u64,
}

/// Result of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored (or replaced the player's earlier submission).
    Accepted,
    /// Not exactly three cards were given.
    WrongCardCount,
    /// At least one card is not face-up.
    CardNotOnBoard,
    /// The same card was selected more than once.
    DuplicateCard,
    /// The cards do not form a set.
    NotASet,
    /// Elapsed time is negative or not finite.
    InvalidTime,
}

impl SubmitOutcome {
    /// True if the submission was stored.
    pub fn is_accepted(self) -> bool {
        self == SubmitOutcome::Accepted
    }
}

/// Round engine errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// Player is not registered in this game.
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
}

// =============================================================================
// HISTORY
// =============================================================================

/// One resolved round. Appended once, never modified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number that was resolved
    pub round: u32,

    /// Winning player, if any
    pub winner: Option<String>,

    /// Elapsed time of every submission in the round (ms)
    pub times: BTreeMap<String, f64>,

    /// The winning set
    pub cards: Vec<Card>,

    /// When the round was resolved
    pub resolved_at: DateTime<Utc>,
}

// =============================================================================
// GAME
// =============================================================================

/// One running game.
#[derive(Clone, Debug)]
pub struct Game {
    deck: Deck,
    board: Board,
    players: BTreeMap<String, Player>,
    submissions: BTreeMap<String, Submission>,
    next_seq: u64,
    round: u32,
    history: Vec<RoundRecord>,
}

impl Game {
    /// Start a game: deal the board from `deck` and register the players.
    pub fn new<I, S>(player_names: I, mut deck: Deck, board_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let board = Board::deal(&mut deck, board_size);
        Self::from_parts(player_names, deck, board)
    }

    /// Assemble a game from an existing deck and board.
    pub fn from_parts<I, S>(player_names: I, deck: Deck, board: Board) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let players = player_names
            .into_iter()
            .map(|name| {
                let player = Player::new(name);
                (player.name.clone(), player)
            })
            .collect();

        Self {
            deck,
            board,
            players,
            submissions: BTreeMap::new(),
            next_seq: 0,
            round: FIRST_ROUND,
            history: Vec::new(),
        }
    }

    /// Admit a submission for the current round.
    ///
    /// Content problems are reported as a [`SubmitOutcome`] and leave the
    /// game untouched; only an unknown player is an error.
    pub fn submit(
        &mut self,
        player: &str,
        cards: &[Card],
        elapsed_ms: f64,
    ) -> Result<SubmitOutcome, RoundError> {
        if !self.players.contains_key(player) {
            return Err(RoundError::UnknownPlayer(player.to_string()));
        }

        let outcome = self.check_submission(cards, elapsed_ms);
        if let SubmitOutcome::Accepted = outcome {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.submissions.insert(player.to_string(), Submission {
                cards: [cards[0], cards[1], cards[2]],
                elapsed_ms,
                seq,
            });
        }
        Ok(outcome)
    }

    fn check_submission(&self, cards: &[Card], elapsed_ms: f64) -> SubmitOutcome {
        if cards.len() != 3 {
            return SubmitOutcome::WrongCardCount;
        }
        if !elapsed_ms.is_finite() || elapsed_ms < 0.0 {
            return SubmitOutcome::InvalidTime;
        }
        if !self.board.contains_all(cards) {
            return SubmitOutcome::CardNotOnBoard;
        }
        if cards[0] == cards[1] || cards[1] == cards[2] || cards[0] == cards[2] {
            return SubmitOutcome::DuplicateCard;
        }
        if !is_set(cards) {
            return SubmitOutcome::NotASet;
        }
        SubmitOutcome::Accepted
    }

    /// True once every registered player has a submission on record.
    pub fn all_submitted(&self) -> bool {
        self.submissions.len() >= self.players.len()
    }

    /// Resolve the round if every player has submitted.
    ///
    /// Returns the winner's name, or `None` without touching state when the
    /// round is not ready or has no submissions.
    pub fn try_resolve(&mut self) -> Option<String> {
        if self.submissions.is_empty() || !self.all_submitted() {
            return None;
        }

        let (winner, winning) = self
            .submissions
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.elapsed_ms
                    .total_cmp(&b.elapsed_ms)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(name, sub)| (name.clone(), sub.clone()))?;

        self.board.replenish(&winning.cards, &mut self.deck);

        if let Some(player) = self.players.get_mut(&winner) {
            player.times.push(winning.elapsed_ms);
        }

        let times = self
            .submissions
            .iter()
            .map(|(name, sub)| (name.clone(), sub.elapsed_ms))
            .collect();
        self.history.push(RoundRecord {
            round: self.round,
            winner: Some(winner.clone()),
            times,
            cards: winning.cards.to_vec(),
            resolved_at: Utc::now(),
        });

        self.submissions.clear();
        self.next_seq = 0;
        self.round += 1;

        Some(winner)
    }

    /// Current round number (starts at 1).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Face-up cards.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Remaining draw pile.
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Registered players by name.
    pub fn players(&self) -> &BTreeMap<String, Player> {
        &self.players
    }

    /// Look up a player.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    /// Check registration.
    pub fn has_player(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    /// Pending submissions for the current round.
    pub fn submissions(&self) -> &BTreeMap<String, Submission> {
        &self.submissions
    }

    /// Resolved rounds, oldest first.
    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    /// True when the deck is empty and no set is left on the board.
    pub fn is_exhausted(&self) -> bool {
        self.deck.is_empty() && !self.board.has_set()
    }
}
