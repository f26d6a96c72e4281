//! Live games for the jigsaw server.
//!
//! Each loaded game runs as an isolated Tokio task (actor model). The actor
//! is the game's only writer: inputs from every socket in the room queue up
//! on its channel and are applied one at a time, so merges and counters
//! never interleave. Persistence and logging happen beside the input path
//! and never block it.
//!
//! # Key types
//!
//! - [`GameRegistry`] — creates games, loads them on demand, routes sockets
//! - [`RoomHandle`] — send commands to a running game actor
//! - [`Socket`] — one connection's identity and outbound channel
//! - [`Storage`] — where whole games are kept ([`MemoryStorage`], [`FileStorage`])
//! - [`RoomConfig`] — save interval, idle unload, log window

mod config;
mod error;
mod registry;
mod room;
mod storage;

pub use config::RoomConfig;
pub use error::{RoomError, StorageError};
pub use registry::{GameLoader, GameRegistry};
pub use room::{GameInfo, RoomHandle, Socket, SocketId, SocketSender};
pub use storage::{FileStorage, MemoryStorage, Storage};

/// Wall-clock time in epoch milliseconds, the timestamp unit of every
/// input and log record.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
