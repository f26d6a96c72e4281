//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every game actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How often a changed game is written to storage.
    pub save_interval: Duration,

    /// Command channel capacity per game actor.
    pub channel_size: usize,

    /// How long after the finishing input inputs are still logged.
    /// Zero freezes the log at the finishing input.
    pub post_finish_log_window: Duration,

    /// A game with no sockets for this long is saved and unloaded.
    pub idle_unload_after: Duration,

    /// Records per read when scanning a log on load.
    pub log_page_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            save_interval: Duration::from_secs(5),
            channel_size: 64,
            post_finish_log_window: Duration::ZERO,
            idle_unload_after: Duration::from_secs(300),
            log_page_size: 1000,
        }
    }
}
