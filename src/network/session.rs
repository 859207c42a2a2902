//! Game Session Management
//!
//! Wraps the round engine with the lobby lifecycle
//! (`lobby -> running [-> finished]`) and translates stable card ids at the
//! transport boundary.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn, instrument};

use crate::core::rng::{DeterministicRng, derive_game_seed};
use crate::game::board::DEFAULT_BOARD_SIZE;
use crate::game::card::{Card, CardId, CardTable};
use crate::game::deck::generate_deck;
use crate::game::round::{Game, RoundError, SubmitOutcome};
use crate::network::protocol::{GameView, PlayerView, RoundView, SnapshotView};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting joins.
    Lobby,
    /// Game in progress.
    Running,
    /// Deck exhausted with no set left (only with `end_on_exhaustion`).
    Finished,
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cards dealt to the initial board.
    pub board_size: usize,
    /// Lobby capacity. `None` means unlimited.
    pub max_players: Option<usize>,
    /// Fixed shuffle seed. `None` derives one from the session id.
    pub seed: Option<u64>,
    /// Move to `Finished` once no set can be played.
    pub end_on_exhaustion: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            max_players: None,
            seed: None,
            end_on_exhaustion: false,
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            board_size: env_parse("SET_BOARD_SIZE").unwrap_or(defaults.board_size),
            max_players: env_parse("SET_MAX_PLAYERS").or(defaults.max_players),
            seed: env_parse("SET_SEED").or(defaults.seed),
            end_on_exhaustion: std::env::var("SET_END_ON_EXHAUSTION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.end_on_exhaustion),
        }
    }
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Name already in the lobby.
    #[error("Player name already taken: {0}")]
    DuplicateName(String),

    /// Lobby is closed.
    #[error("Game already started")]
    AlreadyStarted,

    /// Nobody joined.
    #[error("No players to start the game")]
    NoPlayers,

    /// Player is not part of the running game.
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    /// No game is running.
    #[error("Game not running")]
    GameNotRunning,

    /// Empty or blank name.
    #[error("Invalid player name")]
    InvalidName,

    /// Lobby is at capacity.
    #[error("Session is full")]
    SessionFull,
}

impl From<RoundError> for SessionError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::UnknownPlayer(name) => SessionError::UnknownPlayer(name),
        }
    }
}

// =============================================================================
// GAME SESSION
// =============================================================================

/// Lobby plus the one game it starts.
pub struct GameSession {
    /// Unique session identifier.
    pub id: SessionId,
    state: SessionState,
    config: SessionConfig,
    /// Names waiting in the lobby, in join order.
    lobby: Vec<String>,
    game: Option<Game>,
    cards: CardTable,
    seed: Option<u64>,
}

impl GameSession {
    /// Create a session with a random id.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_id(uuid::Uuid::new_v4().into_bytes(), config)
    }

    /// Create a session with a known id.
    pub fn with_id(id: SessionId, config: SessionConfig) -> Self {
        Self {
            id,
            state: SessionState::Lobby,
            config,
            lobby: Vec::new(),
            game: None,
            cards: CardTable::canonical(),
            seed: None,
        }
    }

    /// Add a player to the lobby.
    pub fn join(&mut self, name: &str) -> Result<SnapshotView, SessionError> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::AlreadyStarted);
        }
        if name.trim().is_empty() {
            return Err(SessionError::InvalidName);
        }
        if self.lobby.iter().any(|n| n == name) {
            return Err(SessionError::DuplicateName(name.to_string()));
        }
        if let Some(max) = self.config.max_players {
            if self.lobby.len() >= max {
                return Err(SessionError::SessionFull);
            }
        }

        self.lobby.push(name.to_string());
        info!("{} joined the lobby ({} waiting)", name, self.lobby.len());
        Ok(self.snapshot())
    }

    /// Start the game with everyone in the lobby.
    pub fn start(&mut self) -> Result<SnapshotView, SessionError> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::AlreadyStarted);
        }
        if self.lobby.is_empty() {
            return Err(SessionError::NoPlayers);
        }

        let seed = self
            .config
            .seed
            .unwrap_or_else(|| derive_game_seed(&self.id, &self.lobby));
        let mut rng = DeterministicRng::new(seed);

        // Ids first, so a seed always yields the same id table.
        self.cards = CardTable::shuffled(&mut rng);
        let deck = generate_deck(&mut rng);
        let names = std::mem::take(&mut self.lobby);
        let game = Game::new(names, deck, self.config.board_size);

        if !game.board().has_set() {
            warn!("Initial board of {} cards has no set", game.board().len());
        }
        info!(
            "Game {} started: {} players, seed {}, {} cards on board ({} sets)",
            hex::encode(&self.id[..4]),
            game.players().len(),
            seed,
            game.board().len(),
            game.board().set_count(),
        );

        self.seed = Some(seed);
        self.game = Some(game);
        self.state = SessionState::Running;
        Ok(self.snapshot())
    }

    /// Submit a candidate set by card id.
    ///
    /// `Ok(false)` means the submission was rejected on content (unknown id,
    /// card not on board, not a set); state is unchanged.
    pub fn submit(
        &mut self,
        player: &str,
        card_ids: &[CardId],
        elapsed_ms: f64,
    ) -> Result<bool, SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::GameNotRunning);
        }
        let game = self.game.as_mut().ok_or(SessionError::GameNotRunning)?;
        if !game.has_player(player) {
            return Err(SessionError::UnknownPlayer(player.to_string()));
        }

        let cards: Option<Vec<Card>> = card_ids.iter().map(|&id| self.cards.card(id)).collect();
        let Some(cards) = cards else {
            debug!("{} submitted unknown card ids {:?}", player, card_ids);
            return Ok(false);
        };

        let outcome = game.submit(player, &cards, elapsed_ms)?;
        match outcome {
            SubmitOutcome::Accepted => {
                debug!("{} submitted a set in {}ms (round {})", player, elapsed_ms, game.round());
            }
            rejected => {
                debug!("Rejected submission from {}: {:?}", player, rejected);
            }
        }
        Ok(outcome.is_accepted())
    }

    /// Resolve the round if every player has submitted.
    pub fn try_resolve(&mut self) -> Option<String> {
        if self.state != SessionState::Running {
            return None;
        }
        let game = self.game.as_mut()?;
        let winner = game.try_resolve()?;

        if let Some(record) = game.history().last() {
            info!(
                "Round {} won by {} in {}ms; {} cards on board, {} in deck",
                record.round,
                winner,
                record.times.get(&winner).copied().unwrap_or_default(),
                game.board().len(),
                game.deck().len(),
            );
        }
        if cfg!(feature = "debug-tracing") {
            for card in game.board().cards() {
                debug!("  board: {}", card);
            }
        }

        if !game.board().has_set() {
            if game.deck().is_empty() {
                info!("Deck exhausted and no set left on the board");
                if self.config.end_on_exhaustion {
                    self.state = SessionState::Finished;
                    info!("Game {} finished", hex::encode(&self.id[..4]));
                }
            } else {
                warn!("Board of {} cards has no set after replenishment", game.board().len());
            }
        }

        Some(winner)
    }

    /// Current snapshot. Never fails.
    pub fn snapshot(&self) -> SnapshotView {
        match (self.state, &self.game) {
            (SessionState::Running, Some(game)) => SnapshotView::Running(self.game_view(game)),
            (SessionState::Finished, Some(game)) => SnapshotView::Finished(self.game_view(game)),
            _ => SnapshotView::Lobby {
                players: self.lobby.clone(),
            },
        }
    }

    fn game_view(&self, game: &Game) -> GameView {
        let ids = |cards: &[Card]| -> Vec<CardId> { cards.iter().map(|c| self.cards.id(c)).collect() };

        GameView {
            round: game.round(),
            board: ids(game.board().cards()),
            players: game
                .players()
                .iter()
                .map(|(name, p)| (name.clone(), PlayerView { times: p.times.clone() }))
                .collect::<BTreeMap<_, _>>(),
            history: game
                .history()
                .iter()
                .map(|r| RoundView {
                    round: r.round,
                    winner: r.winner.clone(),
                    times: r.times.clone(),
                    cards: ids(r.cards.as_slice()),
                    resolved_at: r.resolved_at,
                })
                .collect(),
        }
    }

    /// Get session state.
    pub fn get_state(&self) -> SessionState {
        self.state
    }

    /// The running game, if started.
    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// Card-id table of the current game.
    pub fn card_table(&self) -> &CardTable {
        &self.cards
    }

    /// Seed the current game was shuffled with.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Names waiting in the lobby.
    pub fn lobby_players(&self) -> &[String] {
        &self.lobby
    }
}

// =============================================================================
// SHARED HANDLE
// =============================================================================

/// Reply to a submission made through [`SessionHandle::submit_and_resolve`].
#[derive(Debug, Clone)]
pub struct SubmitReply {
    /// Submission was admitted.
    pub success: bool,
    /// Winner if the round resolved.
    pub winner: Option<String>,
    /// Snapshot taken under the same lock.
    pub state: SnapshotView,
}

/// Cloneable handle to one session.
///
/// Every mutation takes the write lock, so submissions from different
/// players serialize and a round resolves at most once.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<GameSession>>,
}

impl SessionHandle {
    /// Wrap a session.
    pub fn new(session: GameSession) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    /// Join the lobby.
    #[instrument(skip(self))]
    pub async fn join(&self, name: &str) -> Result<SnapshotView, SessionError> {
        self.inner.write().await.join(name)
    }

    /// Start the game.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<SnapshotView, SessionError> {
        self.inner.write().await.start()
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> SnapshotView {
        self.inner.read().await.snapshot()
    }

    /// Submit without resolving.
    pub async fn submit(
        &self,
        player: &str,
        card_ids: &[CardId],
        elapsed_ms: f64,
    ) -> Result<bool, SessionError> {
        self.inner.write().await.submit(player, card_ids, elapsed_ms)
    }

    /// Resolve the round if ready.
    pub async fn try_resolve(&self) -> Option<String> {
        self.inner.write().await.try_resolve()
    }

    /// Submit, then resolve if that completed the round, under one lock.
    #[instrument(skip(self, card_ids))]
    pub async fn submit_and_resolve(
        &self,
        player: &str,
        card_ids: &[CardId],
        elapsed_ms: f64,
    ) -> Result<SubmitReply, SessionError> {
        let mut session = self.inner.write().await;
        let success = session.submit(player, card_ids, elapsed_ms)?;
        let winner = if success { session.try_resolve() } else { None };
        Ok(SubmitReply {
            success,
            winner,
            state: session.snapshot(),
        })
    }

    /// Session state.
    pub async fn state(&self) -> SessionState {
        self.inner.read().await.get_state()
    }

    /// Run a read-only closure against the session.
    pub async fn with_session<R>(&self, f: impl FnOnce(&GameSession) -> R) -> R {
        let session = self.inner.read().await;
        f(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::find_any_set;

    fn seeded_config(seed: u64) -> SessionConfig {
        SessionConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    fn started_session(names: &[&str], seed: u64) -> GameSession {
        let mut session = GameSession::with_id([0; 16], seeded_config(seed));
        for name in names {
            session.join(name).unwrap();
        }
        session.start().unwrap();
        session
    }

    /// Ids of the first set on the board.
    fn set_ids(session: &GameSession) -> Option<Vec<CardId>> {
        let game = session.game()?;
        let set = find_any_set(game.board().cards())?;
        Some(set.iter().map(|c| session.card_table().id(c)).collect())
    }

    #[test]
    fn test_join_lobby_adds_player() {
        let mut session = GameSession::new(SessionConfig::default());
        let view = session.join("Alice").unwrap();

        assert_eq!(view, SnapshotView::Lobby { players: vec!["Alice".to_string()] });
        assert_eq!(session.get_state(), SessionState::Lobby);
    }

    #[test]
    fn test_join_duplicate_name_fails() {
        let mut session = GameSession::new(SessionConfig::default());
        session.join("Alice").unwrap();

        let err = session.join("Alice").unwrap_err();
        assert_eq!(err, SessionError::DuplicateName("Alice".to_string()));
        assert_eq!(session.lobby_players(), &["Alice".to_string()]);
    }

    #[test]
    fn test_join_blank_name_fails() {
        let mut session = GameSession::new(SessionConfig::default());
        assert_eq!(session.join("  ").unwrap_err(), SessionError::InvalidName);
        assert!(session.lobby_players().is_empty());
    }

    #[test]
    fn test_join_full_lobby_fails() {
        let config = SessionConfig {
            max_players: Some(1),
            ..Default::default()
        };
        let mut session = GameSession::new(config);
        session.join("Alice").unwrap();
        assert_eq!(session.join("Bob").unwrap_err(), SessionError::SessionFull);
    }

    #[test]
    fn test_join_after_start_fails() {
        let mut session = started_session(&["Alice"], 1);
        assert_eq!(session.join("Bob").unwrap_err(), SessionError::AlreadyStarted);
    }

    #[test]
    fn test_start_without_players_fails() {
        let mut session = GameSession::new(SessionConfig::default());
        assert_eq!(session.start().unwrap_err(), SessionError::NoPlayers);
        assert_eq!(session.get_state(), SessionState::Lobby);
    }

    #[test]
    fn test_start_twice_fails() {
        let mut session = started_session(&["Alice"], 1);
        assert_eq!(session.start().unwrap_err(), SessionError::AlreadyStarted);
    }

    #[test]
    fn test_start_moves_players_and_deals_board() {
        let session = started_session(&["Alice", "Bob"], 5);

        assert_eq!(session.get_state(), SessionState::Running);
        assert!(session.lobby_players().is_empty());
        assert_eq!(session.seed(), Some(5));

        let view = session.snapshot();
        let game = view.game().unwrap();
        assert_eq!(view.state_name(), "running");
        assert_eq!(game.round, 1);
        assert!(game.board.len() == 12 || game.board.len() == 15);
        assert!(game.board.iter().all(|&id| (id as usize) < crate::game::card::CARD_COUNT));
        assert_eq!(game.players.keys().cloned().collect::<Vec<_>>(), vec!["Alice", "Bob"]);
        assert!(game.players.values().all(|p| p.times.is_empty()));
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = started_session(&["Alice"], 99).snapshot();
        let b = started_session(&["Alice"], 99).snapshot();
        assert_eq!(a.game().unwrap().board, b.game().unwrap().board);
    }

    #[test]
    fn test_submit_before_start_fails() {
        let mut session = GameSession::new(SessionConfig::default());
        session.join("Alice").unwrap();
        assert_eq!(
            session.submit("Alice", &[0, 1, 2], 1.2).unwrap_err(),
            SessionError::GameNotRunning,
        );
    }

    #[test]
    fn test_submit_unknown_player_fails() {
        let mut session = started_session(&["Alice", "Bob"], 3);
        let board = session.snapshot().game().unwrap().board.clone();

        assert_eq!(
            session.submit("Ghost", &board[..3], 1.0).unwrap_err(),
            SessionError::UnknownPlayer("Ghost".to_string()),
        );
    }

    #[test]
    fn test_submit_unknown_card_id_is_false() {
        let mut session = started_session(&["Alice"], 3);
        assert!(!session.submit("Alice", &[0, 1, 200], 1.0).unwrap());
        assert!(!session.submit("Alice", &[0, 1], 1.0).unwrap());
        assert!(session.game().unwrap().submissions().is_empty());
    }

    #[test]
    fn test_submit_off_board_id_is_false() {
        let mut session = started_session(&["Alice"], 3);
        let game = session.game().unwrap();
        let off_board: Vec<CardId> = game
            .deck()
            .iter()
            .take(3)
            .map(|c| session.card_table().id(c))
            .collect();

        assert!(!session.submit("Alice", &off_board, 1.0).unwrap());
    }

    #[test]
    fn test_two_player_round() {
        for seed in 0..20u64 {
            let mut session = started_session(&["Alice", "Bob"], seed);
            let Some(ids) = set_ids(&session) else { continue };
            let winning: Vec<Card> = ids
                .iter()
                .map(|&id| session.card_table().card(id).unwrap())
                .collect();

            assert!(session.submit("Alice", &ids, 1.0).unwrap());
            assert_eq!(session.try_resolve(), None);
            assert!(session.submit("Bob", &ids, 2.0).unwrap());
            assert_eq!(session.try_resolve(), Some("Alice".to_string()));

            let view = session.snapshot();
            let game = view.game().unwrap();
            assert_eq!(game.round, 2);
            assert_eq!(game.players["Alice"].times, vec![1.0]);
            assert_eq!(game.history.len(), 1);
            assert_eq!(game.history[0].winner.as_deref(), Some("Alice"));
            assert_eq!(game.history[0].times["Bob"], 2.0);
            for card in &winning {
                assert!(!game.board.contains(&session.card_table().id(card)));
            }

            // Nothing new submitted: history stays put.
            assert_eq!(session.try_resolve(), None);
            assert_eq!(session.snapshot().game().unwrap().history.len(), 1);
            return;
        }
        panic!("no seed produced a board with a set");
    }

    #[test]
    fn test_finished_when_exhausted() {
        let config = SessionConfig {
            seed: Some(8),
            end_on_exhaustion: true,
            ..Default::default()
        };
        let mut session = GameSession::with_id([1; 16], config);
        session.join("Solo").unwrap();
        session.start().unwrap();

        while let Some(ids) = set_ids(&session) {
            assert!(session.submit("Solo", &ids, 1.0).unwrap());
            assert_eq!(session.try_resolve(), Some("Solo".to_string()));
            if session.get_state() == SessionState::Finished {
                break;
            }
        }

        let game = session.game().unwrap();
        if game.deck().is_empty() && !game.board().has_set() {
            assert_eq!(session.get_state(), SessionState::Finished);
            assert_eq!(session.snapshot().state_name(), "finished");
            assert_eq!(
                session.submit("Solo", &[0, 1, 2], 1.0).unwrap_err(),
                SessionError::GameNotRunning,
            );
        }
    }

    #[tokio::test]
    async fn test_handle_submit_and_resolve() {
        let handle = SessionHandle::new(GameSession::with_id([2; 16], seeded_config(4)));
        handle.join("Alice").await.unwrap();
        handle.join("Bob").await.unwrap();
        handle.start().await.unwrap();

        let Some(ids) = handle.with_session(set_ids).await else { return };

        let first = handle.submit_and_resolve("Alice", &ids, 1.0).await.unwrap();
        assert!(first.success);
        assert_eq!(first.winner, None);

        let second = handle.submit_and_resolve("Bob", &ids, 2.0).await.unwrap();
        assert!(second.success);
        assert_eq!(second.winner.as_deref(), Some("Alice"));
        assert_eq!(second.state.game().unwrap().round, 2);
    }

    #[tokio::test]
    async fn test_handle_concurrent_submissions_resolve_once() {
        let names: Vec<String> = (0..16).map(|i| format!("player{}", i)).collect();
        let handle = SessionHandle::new(GameSession::with_id([3; 16], seeded_config(12)));
        for name in &names {
            handle.join(name).await.unwrap();
        }
        handle.start().await.unwrap();

        let Some(ids) = handle.with_session(set_ids).await else { return };

        let mut tasks = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let handle = handle.clone();
            let name = name.clone();
            let ids = ids.clone();
            tasks.push(tokio::spawn(async move {
                handle.submit_and_resolve(&name, &ids, 100.0 + i as f64).await
            }));
        }

        let mut winners = Vec::new();
        for task in tasks {
            let reply = task.await.unwrap().unwrap();
            if let Some(winner) = reply.winner {
                winners.push(winner);
            }
        }

        // Only the last submission to land completes the round.
        assert_eq!(winners, vec!["player0".to_string()]);
        let view = handle.snapshot().await;
        let game = view.game().unwrap();
        assert_eq!(game.round, 2);
        assert_eq!(game.history.len(), 1);
        assert_eq!(game.history[0].times.len(), names.len());
    }

    #[tokio::test]
    async fn test_handle_errors_leave_state() {
        let handle = SessionHandle::new(GameSession::new(SessionConfig::default()));
        assert_eq!(handle.start().await.unwrap_err(), SessionError::NoPlayers);
        assert_eq!(
            handle.submit("Alice", &[0, 1, 2], 1.0).await.unwrap_err(),
            SessionError::GameNotRunning,
        );
        assert_eq!(handle.state().await, SessionState::Lobby);
        assert_eq!(handle.try_resolve().await, None);
    }
}
