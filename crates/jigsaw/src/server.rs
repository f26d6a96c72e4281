//! `JigsawServer` builder and server loop.
//!
//! This is the entry point for running a puzzle server. It ties together
//! all the layers: transport → protocol → game actors → storage.

use std::future::Future;
use std::sync::Arc;

use jigsaw_protocol::JsonCodec;
use jigsaw_puzzle::PuzzleLimits;
use jigsaw_replay::{FileReplayStore, ReplayStore};
use jigsaw_room::{FileStorage, GameRegistry, RoomConfig, Storage};
use jigsaw_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{JigsawError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S, R> {
    pub(crate) registry: Mutex<GameRegistry<S, R>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a jigsaw server.
///
/// # Example
///
/// ```rust,ignore
/// let server = JigsawServer::builder()
///     .bind("0.0.0.0:8080")
///     .data_dir("/var/lib/jigsaw")
///     .build_with_files()
///     .await?;
/// server.run().await
/// ```
pub struct JigsawServerBuilder {
    config: ServerConfig,
}

impl JigsawServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn limits(mut self, limits: PuzzleLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Binds the listener with the given stores.
    pub async fn build<S: Storage, R: ReplayStore>(
        self,
        storage: Arc<S>,
        replay_store: Arc<R>,
    ) -> Result<JigsawServer<S, R>, JigsawError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let registry = GameRegistry::new(storage, replay_store, self.config.room, self.config.limits);

        let state = Arc::new(ServerState {
            registry: Mutex::new(registry),
            codec: JsonCodec,
        });

        Ok(JigsawServer { transport, state })
    }

    /// Binds the listener with file stores under the data directory.
    /// Fails if the directories can't be created.
    pub async fn build_with_files(self) -> Result<JigsawServer<FileStorage, FileReplayStore>, JigsawError> {
        let storage = FileStorage::open(self.config.games_dir()).await?;
        let replay_store = FileReplayStore::open(self.config.logs_dir()).await?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "file storage opened");
        self.build(Arc::new(storage), Arc::new(replay_store)).await
    }
}

impl Default for JigsawServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running jigsaw server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct JigsawServer<S, R> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, R>>,
}

impl JigsawServer<FileStorage, FileReplayStore> {
    /// Creates a new builder.
    pub fn builder() -> JigsawServerBuilder {
        JigsawServerBuilder::new()
    }
}

impl<S: Storage, R: ReplayStore> JigsawServer<S, R> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Creates a game directly, without a client connection.
    pub async fn create_game(
        &self,
        params: jigsaw_game::GameParams,
    ) -> Result<jigsaw_protocol::GameId, JigsawError> {
        let mut registry = self.state.registry.lock().await;
        Ok(registry.create_game(params, jigsaw_room::now_ms()).await?)
    }

    /// Runs the server accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), JigsawError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then saves and
    /// stops every loaded game.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), JigsawError> {
        tracing::info!(addr = ?self.local_addr().ok(), "jigsaw server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutting down, saving loaded games");
        self.state.registry.lock().await.shutdown_all().await;
        Ok(())
    }
}
