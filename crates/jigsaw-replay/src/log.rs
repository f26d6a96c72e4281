//! Turning live game activity into log records.

use jigsaw_game::Game;
use jigsaw_protocol::{Input, PlayerId, PuzzleData};

use crate::{LogHeader, LogRecord};

/// Per-game record builder.
///
/// Only does bookkeeping; writing the records out is the caller's job.
/// The log keeps the timestamp of the last record so every record after
/// the header can carry a delta.
#[derive(Debug, Clone)]
pub struct EventLog {
    last_ts: u64,
    /// How long after the finishing input inputs are still logged, in ms.
    post_finish_window: u64,
}

impl EventLog {
    /// A log that continues after a record stamped `last_ts`.
    pub fn new(last_ts: u64, post_finish_window: u64) -> Self {
        Self {
            last_ts,
            post_finish_window,
        }
    }

    /// The header for a freshly created game; starts the delta chain at the
    /// game's creation time.
    pub fn header(&mut self, game: &Game) -> LogRecord {
        self.last_ts = game.created;
        LogRecord::Header(LogHeader {
            created: game.created,
            params: game.params.clone(),
        })
    }

    pub fn last_ts(&self) -> u64 {
        self.last_ts
    }

    fn delta(&mut self, ts: u64) -> u64 {
        let dt = ts.saturating_sub(self.last_ts);
        self.last_ts = self.last_ts.max(ts);
        dt
    }

    /// Record for a player joining. Call *before* [`Game::add_player`], so
    /// the game still tells whether the player is new.
    pub fn player(&mut self, game: &Game, player_id: &PlayerId, ts: u64) -> LogRecord {
        let dt = self.delta(ts);
        match game.player_index(player_id) {
            Some(index) => LogRecord::UpdatePlayer { index, dt },
            None => LogRecord::AddPlayer {
                player_id: player_id.clone(),
                dt,
            },
        }
    }

    pub fn input(&mut self, index: usize, input: &Input, ts: u64) -> LogRecord {
        LogRecord::HandleInput {
            index,
            input: input.clone(),
            dt: self.delta(ts),
        }
    }

    /// Unfinished games always log. Finished games log only inside the
    /// post-finish window, so a completed timeline stays frozen.
    pub fn should_log(&self, data: &PuzzleData, ts: u64) -> bool {
        data.finished == 0 || ts.saturating_sub(data.finished) <= self.post_finish_window
    }
}
