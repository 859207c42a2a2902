//! Set Game Server
//!
//! Runs one lobby and game over WebSocket until Ctrl-C.

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use set_game::{
    VERSION,
    network::{GameServer, GameSession, ServerConfig, SessionConfig, SessionHandle},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let server_config = ServerConfig::from_env();
    let session_config = SessionConfig::from_env();

    info!("Set Game Server v{}", VERSION);
    info!("Bind address: {}", server_config.bind_addr);
    info!("Board size: {}", session_config.board_size);
    if let Some(seed) = session_config.seed {
        info!("Fixed seed: {}", seed);
    }

    let session = GameSession::new(session_config);
    info!("Session {}", hex::encode(session.id));
    let server = GameServer::new(server_config, SessionHandle::new(session));

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
