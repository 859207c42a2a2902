//! Network Layer
//!
//! Lobby/session management and the WebSocket server.
//! All game rules live in `game/`; this layer only locks, translates and logs.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, SubmitRequest, SnapshotView, GameView,
    PlayerView, RoundView, ServerError, ErrorCode,
};
pub use session::{
    GameSession, SessionHandle, SessionConfig, SessionError, SessionId, SessionState, SubmitReply,
};
pub use server::{GameServer, ServerConfig, GameServerError};
