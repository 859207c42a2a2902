//! WebSocket Game Server
//!
//! Async WebSocket server for lobby and game messages.
//! Every connection talks to the same [`SessionHandle`]; resolved rounds
//! are broadcast to all connections.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::network::protocol::{
    ClientMessage, ServerMessage, ServerError, SubmitRequest, ErrorCode,
};
use crate::network::session::{SessionHandle, SessionError, env_parse};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_parse("SET_BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_connections: env_parse("SET_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            version: defaults.version,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The one game session.
    session: SessionHandle,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Round results for every connection.
    events_tx: broadcast::Sender<ServerMessage>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server around a session.
    pub fn new(config: ServerConfig, session: SessionHandle) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (events_tx, _) = broadcast::channel(256);

        Self {
            config,
            session,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            events_tx,
            shutdown_tx,
        }
    }

    /// Bind the configured address and run the server.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the accept loop on an existing listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let session = self.session.clone();
        let events_tx = self.events_tx.clone();
        let mut events_rx = self.events_tx.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                });
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        let client_msg = match msg {
                            Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                                Ok(m) => m,
                                Err(e) => {
                                    debug!("Invalid message from {}: {}", addr, e);
                                    let _ = msg_tx.send(ServerMessage::Error(ServerError::new(
                                        ErrorCode::InvalidInput,
                                        "Invalid message format",
                                    ))).await;
                                    continue;
                                }
                            },
                            Some(Ok(Message::Binary(data))) => match SubmitRequest::from_bytes(&data) {
                                Ok(req) => ClientMessage::Submit(req),
                                Err(e) => {
                                    debug!("Invalid binary frame from {}: {}", addr, e);
                                    let _ = msg_tx.send(ServerMessage::Error(ServerError::new(
                                        ErrorCode::InvalidInput,
                                        "Invalid binary submission",
                                    ))).await;
                                    continue;
                                }
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong frames are answered by tungstenite.
                            Some(Ok(_)) => continue,
                        };

                        {
                            let mut clients = clients.write().await;
                            if let Some(client) = clients.get_mut(&addr) {
                                client.last_activity = Instant::now();
                            }
                        }

                        let reply = Self::handle_client_message(client_msg, &session, &events_tx).await;
                        if msg_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                    event = events_rx.recv() => {
                        match event {
                            Ok(msg) => {
                                let _ = msg_tx.send(msg).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Client {} missed {} round broadcasts", addr, n);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies flush before closing.
            drop(msg_tx);
            let _ = sender_task.await;

            let mut clients = clients.write().await;
            if let Some(client) = clients.remove(&addr) {
                info!(
                    "Client {} cleaned up after {:?} (idle {:?})",
                    addr,
                    client.connected_at.elapsed(),
                    client.last_activity.elapsed(),
                );
            }
        });
    }

    /// Handle a client message and build the reply.
    ///
    /// A submission that resolves the round is also broadcast to every
    /// connection as [`ServerMessage::RoundResolved`].
    pub async fn handle_client_message(
        msg: ClientMessage,
        session: &SessionHandle,
        events_tx: &broadcast::Sender<ServerMessage>,
    ) -> ServerMessage {
        let result = match msg {
            ClientMessage::Join { name } => session.join(&name).await.map(ServerMessage::State),
            ClientMessage::Start => session.start().await.map(ServerMessage::State),
            ClientMessage::GetState => Ok(ServerMessage::State(session.snapshot().await)),
            ClientMessage::Submit(req) => {
                Self::handle_submit(req, session, events_tx).await
            }
            ClientMessage::Ping { timestamp } => Ok(ServerMessage::Pong {
                timestamp,
                server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
            }),
        };

        result.unwrap_or_else(|err| {
            debug!("Request failed: {}", err);
            ServerMessage::Error(ServerError::from(&err))
        })
    }

    async fn handle_submit(
        req: SubmitRequest,
        session: &SessionHandle,
        events_tx: &broadcast::Sender<ServerMessage>,
    ) -> Result<ServerMessage, SessionError> {
        let reply = session
            .submit_and_resolve(&req.player, &req.cards, req.elapsed_time)
            .await?;

        if !reply.success {
            return Ok(ServerMessage::Error(ServerError::new(
                ErrorCode::InvalidSubmission,
                "Invalid submission",
            )));
        }

        if let Some(winner) = &reply.winner {
            // No receivers is fine: nobody else is connected.
            let _ = events_tx.send(ServerMessage::RoundResolved {
                winner: winner.clone(),
                state: reply.state.clone(),
            });
        }

        Ok(ServerMessage::SubmitResult {
            success: true,
            winner: reply.winner,
            state: reply.state,
        })
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// The session this server plays.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Subscribe to round broadcasts.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerMessage> {
        self.events_tx.subscribe()
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
