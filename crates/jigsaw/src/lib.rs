//! # Jigsaw
//!
//! Real-time collaborative jigsaw puzzle server.
//!
//! Players connect over WebSocket with `?game=<id>&client=<id>`, receive
//! the full game once and then a stream of change-sets. The server is
//! authoritative: every input is applied by the game's single actor,
//! logged for replay and broadcast to everyone in the room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jigsaw::prelude::*;
//!
//! # async fn run() -> Result<(), JigsawError> {
//! let server = JigsawServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .data_dir("data")
//!     .build_with_files()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::JigsawError;
pub use server::{JigsawServer, JigsawServerBuilder};

pub mod prelude {
    pub use crate::{JigsawError, JigsawServer, JigsawServerBuilder, ServerConfig};
    pub use jigsaw_game::{Game, GameParams};
    pub use jigsaw_protocol::{
        ClientMessage, GameId, Input, PlayerId, ScoreMode, ServerMessage, ShapeMode, SnapMode,
    };
    pub use jigsaw_puzzle::{ImageInfo, PuzzleLimits};
    pub use jigsaw_replay::{FileReplayStore, MemoryReplayStore};
    pub use jigsaw_room::{FileStorage, MemoryStorage, RoomConfig};
}
