//! Event sourcing for puzzle games.
//!
//! Every game has an append-only log: one header with the generation
//! parameters, then one record per player join and per logged input.
//! Feeding the records back through [`Game::create`](jigsaw_game::Game::create),
//! [`Game::add_player`](jigsaw_game::Game::add_player) and
//! [`Game::handle_input`](jigsaw_game::Game::handle_input) rebuilds the game
//! exactly.
//!
//! # Key types
//!
//! - [`LogRecord`] — one log line, `[tag, ...args]`
//! - [`EventLog`] — turns live activity into records with delta timestamps
//! - [`ReplayStore`] — where records live ([`MemoryReplayStore`], [`FileReplayStore`])
//! - [`Replay`] — applies records to a game, skipping malformed ones
//! - [`ReplaySession`] — paged, clock-driven playback

mod error;
mod log;
mod record;
mod replay;
mod session;
mod store;

pub use error::ReplayError;
pub use log::EventLog;
pub use record::{LogHeader, LogRecord};
pub use replay::{Replay, reconstruct};
pub use session::{IDLE_GAP_MS, ReplaySession};
pub use store::{FileReplayStore, MemoryReplayStore, ReplayStore, StoredRecord, last_timestamp};
