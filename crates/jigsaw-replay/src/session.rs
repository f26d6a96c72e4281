//! Clock-driven playback of a stored log.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use jigsaw_game::Game;
use jigsaw_protocol::{Change, GameId};
use jigsaw_puzzle::PuzzleLimits;
use jigsaw_tick::VirtualClock;

use crate::{LogRecord, Replay, ReplayError, ReplayStore, StoredRecord};

/// Gaps of game time longer than this are jumped over when idle skipping
/// is on.
pub const IDLE_GAP_MS: u64 = 500;

/// Plays a log back against its own [`VirtualClock`].
///
/// Records are fetched from the store a page at a time. A session owns
/// its replayed game and never touches live games.
///
/// ```ignore
/// let mut session = ReplaySession::start(store, game_id, limits, 1000).await?;
/// while !session.is_finished() {
///     let changes = session.advance().await?;
///     render(&changes);
///     if let Some(wait) = session.next_wakeup() {
///         tokio::time::sleep(wait).await;
///     }
/// }
/// ```
pub struct ReplaySession<S> {
    store: Arc<S>,
    game_id: GameId,
    replay: Replay,
    clock: VirtualClock,
    /// Fetched but not yet applied, with their absolute timestamps.
    buffer: VecDeque<(u64, StoredRecord)>,
    offset: usize,
    page_size: usize,
    exhausted: bool,
    /// Running timestamp while decoding deltas into the buffer.
    read_ts: u64,
    skip_idle: bool,
}

impl<S: ReplayStore> ReplaySession<S> {
    /// Loads the first page and applies everything up to and including the
    /// header. The clock starts, running at 1×, at the game's creation time.
    pub async fn start(
        store: Arc<S>,
        game_id: GameId,
        limits: PuzzleLimits,
        page_size: usize,
    ) -> Result<Self, ReplayError> {
        let mut session = Self {
            store,
            replay: Replay::new(game_id.clone(), limits),
            game_id,
            clock: VirtualClock::new(0),
            buffer: VecDeque::new(),
            offset: 0,
            page_size: page_size.max(1),
            exhausted: false,
            read_ts: 0,
            skip_idle: true,
        };

        while session.replay.game().is_none() {
            let Some((_, record)) = session.pop().await? else {
                return Err(ReplayError::MissingHeader(session.game_id));
            };
            session.replay.feed(record);
        }
        session.clock = VirtualClock::new(session.replay.ts());

        tracing::info!(game_id = %session.game_id, "replay session started");
        Ok(session)
    }

    async fn fill(&mut self) -> Result<(), ReplayError> {
        if self.exhausted || !self.buffer.is_empty() {
            return Ok(());
        }
        let page = self
            .store
            .read(&self.game_id, self.offset, self.page_size)
            .await?;
        tracing::trace!(game_id = %self.game_id, offset = self.offset, len = page.len(), "replay page read");

        self.offset += page.len();
        self.exhausted = page.len() < self.page_size;
        for record in page {
            match &record {
                Ok(LogRecord::Header(header)) => self.read_ts = header.created,
                Ok(other) => self.read_ts += other.dt().unwrap_or(0),
                // No delta to take; see `Replay::feed`.
                Err(_) => {}
            }
            self.buffer.push_back((self.read_ts, record));
        }
        Ok(())
    }

    async fn pop(&mut self) -> Result<Option<(u64, StoredRecord)>, ReplayError> {
        self.fill().await?;
        Ok(self.buffer.pop_front())
    }

    async fn next_ts(&mut self) -> Result<Option<u64>, ReplayError> {
        self.fill().await?;
        Ok(self.buffer.front().map(|(ts, _)| *ts))
    }

    /// Applies every record that is due on the virtual clock and returns
    /// their combined change-sets.
    pub async fn advance(&mut self) -> Result<Vec<Change>, ReplayError> {
        let mut changes = Vec::new();
        while let Some(due) = self.next_ts().await? {
            if self.skip_idle && !self.clock.is_paused() && due > self.clock.now() + IDLE_GAP_MS {
                tracing::debug!(game_id = %self.game_id, from = self.clock.now(), to = due, "skipping idle gap");
                self.clock.skip_to(due);
            }
            if due > self.clock.now() {
                break;
            }
            if let Some((_, record)) = self.buffer.pop_front() {
                changes.extend(self.replay.feed(record));
            }
        }
        Ok(changes)
    }

    /// Applies everything that is left, ignoring the clock.
    pub async fn run_to_end(&mut self) -> Result<&Game, ReplayError> {
        while let Some((_, record)) = self.pop().await? {
            self.replay.feed(record);
        }
        self.clock.skip_to(self.replay.ts());
        self.replay
            .game()
            .ok_or_else(|| ReplayError::MissingHeader(self.game_id.clone()))
    }

    /// Wall time until the next record is due. `Some(ZERO)` if the next
    /// page still has to be fetched; `None` when paused or done.
    pub fn next_wakeup(&self) -> Option<Duration> {
        match self.buffer.front() {
            Some((ts, _)) => self.clock.wall_until(*ts),
            None if self.exhausted => None,
            None => (!self.clock.is_paused()).then_some(Duration::ZERO),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }

    // -- Clock controls --

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
    }

    pub fn speed_up(&mut self) -> f64 {
        self.clock.speed_up()
    }

    pub fn speed_down(&mut self) -> f64 {
        self.clock.speed_down()
    }

    pub fn set_skip_idle(&mut self, skip: bool) {
        self.skip_idle = skip;
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    // -- State --

    pub fn game(&self) -> Option<&Game> {
        self.replay.game()
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }
}
