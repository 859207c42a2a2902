//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Messages are JSON text frames. A binary frame carries a bare
//! bincode-encoded [`SubmitRequest`], the only hot-path message.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::card::CardId;
use crate::network::session::SessionError;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the lobby under a name.
    Join { name: String },

    /// Start the game with everyone in the lobby.
    Start,

    /// Request the current snapshot.
    GetState,

    /// Submit a candidate set.
    Submit(SubmitRequest),

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// A set submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Submitting player's name.
    pub player: String,
    /// Stable card ids of the selected cards.
    pub cards: Vec<CardId>,
    /// Time taken to find the set (ms).
    pub elapsed_time: f64,
}

impl SubmitRequest {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Current snapshot (reply to join, start and get_state).
    State(SnapshotView),

    /// Reply to a submission.
    SubmitResult {
        /// Submission was admitted.
        success: bool,
        /// Winner if this submission completed the round.
        winner: Option<String>,
        /// Snapshot after the submission.
        state: SnapshotView,
    },

    /// Broadcast to every connection when a round resolves.
    RoundResolved {
        /// Round winner.
        winner: String,
        /// Snapshot after resolution.
        state: SnapshotView,
    },

    /// Request failed.
    Error(ServerError),

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Server is shutting down.
    Shutdown { reason: String },
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Session snapshot as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnapshotView {
    /// Waiting for players.
    Lobby {
        /// Joined names in join order.
        players: Vec<String>,
    },
    /// Game in progress.
    Running(GameView),
    /// Deck exhausted and no set left.
    Finished(GameView),
}

impl SnapshotView {
    /// State tag as sent on the wire.
    pub fn state_name(&self) -> &'static str {
        match self {
            SnapshotView::Lobby { .. } => "lobby",
            SnapshotView::Running(_) => "running",
            SnapshotView::Finished(_) => "finished",
        }
    }

    /// Game view, if a game has started.
    pub fn game(&self) -> Option<&GameView> {
        match self {
            SnapshotView::Lobby { .. } => None,
            SnapshotView::Running(view) | SnapshotView::Finished(view) => Some(view),
        }
    }
}

/// A started game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    /// Current round number.
    pub round: u32,
    /// Face-up cards as stable ids.
    pub board: Vec<CardId>,
    /// Per-player stats.
    pub players: BTreeMap<String, PlayerView>,
    /// Resolved rounds, oldest first.
    pub history: Vec<RoundView>,
}

/// Per-player stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Elapsed times (ms) of won rounds.
    pub times: Vec<f64>,
}

/// A resolved round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundView {
    /// Round number.
    pub round: u32,
    /// Winner, if any.
    pub winner: Option<String>,
    /// Elapsed time of every submission (ms).
    pub times: BTreeMap<String, f64>,
    /// Winning cards as stable ids.
    pub cards: Vec<CardId>,
    /// Resolution time.
    pub resolved_at: DateTime<Utc>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error payload.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&SessionError> for ServerError {
    fn from(err: &SessionError) -> Self {
        Self::new(ErrorCode::from(err), err.to_string())
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Name already taken.
    DuplicateName,
    /// Game already started.
    AlreadyStarted,
    /// Start with an empty lobby.
    NoPlayers,
    /// Player not registered.
    UnknownPlayer,
    /// No game running.
    GameNotRunning,
    /// Empty or blank name.
    InvalidName,
    /// Lobby full.
    SessionFull,
    /// Cards not on board or not a set.
    InvalidSubmission,
    /// Malformed message.
    InvalidInput,
    /// Connection limit reached.
    ServerOverloaded,
}

impl From<&SessionError> for ErrorCode {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::DuplicateName(_) => ErrorCode::DuplicateName,
            SessionError::AlreadyStarted => ErrorCode::AlreadyStarted,
            SessionError::NoPlayers => ErrorCode::NoPlayers,
            SessionError::UnknownPlayer(_) => ErrorCode::UnknownPlayer,
            SessionError::GameNotRunning => ErrorCode::GameNotRunning,
            SessionError::InvalidName => ErrorCode::InvalidName,
            SessionError::SessionFull => ErrorCode::SessionFull,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
