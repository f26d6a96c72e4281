//! Rebuilding a game from its log.

use jigsaw_game::Game;
use jigsaw_protocol::{Change, GameId};
use jigsaw_puzzle::PuzzleLimits;

use crate::{LogHeader, LogRecord, ReplayError, ReplayStore, StoredRecord};

/// Applies log records, in order, through the same entry points the live
/// server uses.
#[derive(Debug)]
pub struct Replay {
    game_id: GameId,
    limits: PuzzleLimits,
    game: Option<Game>,
    /// Absolute timestamp of the last applied record.
    ts: u64,
    applied: usize,
    skipped: usize,
}

impl Replay {
    pub fn new(game_id: GameId, limits: PuzzleLimits) -> Self {
        Self {
            game_id,
            limits,
            game: None,
            ts: 0,
            applied: 0,
            skipped: 0,
        }
    }

    /// Applies one record and returns the changes it produced (empty for
    /// the header and player records).
    pub fn apply(&mut self, record: &LogRecord) -> Result<Vec<Change>, ReplayError> {
        match record {
            LogRecord::Header(header) => self.apply_header(header),
            LogRecord::AddPlayer { player_id, dt } => self.with_game(*dt, |game, ts| {
                game.add_player(player_id, ts);
                Ok(Vec::new())
            }),
            LogRecord::UpdatePlayer { index, dt } => self.with_game(*dt, |game, ts| {
                let player_id = game.player_id_by_index(*index)?.clone();
                game.add_player(&player_id, ts);
                Ok(Vec::new())
            }),
            LogRecord::HandleInput { index, input, dt } => self.with_game(*dt, |game, ts| {
                let player_id = game.player_id_by_index(*index)?.clone();
                Ok(game.handle_input(&player_id, input, ts)?)
            }),
        }
    }

    fn apply_header(&mut self, header: &LogHeader) -> Result<Vec<Change>, ReplayError> {
        if self.game.is_some() {
            return Err(ReplayError::MalformedRecord("second header".into()));
        }
        let game = Game::create(self.game_id.clone(), header.params.clone(), header.created, &self.limits)
            .map_err(|e| ReplayError::MalformedRecord(format!("header does not generate: {e}")))?;
        tracing::debug!(game_id = %self.game_id, created = header.created, "replay header applied");
        self.ts = header.created;
        self.game = Some(game);
        self.applied += 1;
        Ok(Vec::new())
    }

    /// Runs `f` on the game at the record's absolute time. The delta is
    /// taken even if `f` fails, so later records keep their live timestamps.
    fn with_game<F>(&mut self, dt: u64, f: F) -> Result<Vec<Change>, ReplayError>
    where
        F: FnOnce(&mut Game, u64) -> Result<Vec<Change>, ReplayError>,
    {
        let game = self
            .game
            .as_mut()
            .ok_or_else(|| ReplayError::MissingHeader(self.game_id.clone()))?;
        self.ts += dt;
        let changes = f(game, self.ts)?;
        self.applied += 1;
        Ok(changes)
    }

    /// The error boundary for stored records: anything that fails to decode
    /// or apply is logged and skipped, and the replay goes on.
    ///
    /// A record that fails to apply still advances the clock by its delta.
    /// One that does not decode has no delta to take, so every later record
    /// lands that much earlier than it happened live.
    pub fn feed(&mut self, record: StoredRecord) -> Vec<Change> {
        match record.and_then(|r| self.apply(&r)) {
            Ok(changes) => changes,
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(game_id = %self.game_id, error = %e, "skipping log record");
                Vec::new()
            }
        }
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn into_game(self) -> Result<Game, ReplayError> {
        self.game.ok_or(ReplayError::MissingHeader(self.game_id))
    }

    /// Absolute timestamp of the last applied record.
    pub fn ts(&self) -> u64 {
        self.ts
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Reads a whole log, page by page, and returns the rebuilt game.
pub async fn reconstruct<S: ReplayStore>(
    store: &S,
    game_id: &GameId,
    limits: PuzzleLimits,
    page_size: usize,
) -> Result<Game, ReplayError> {
    let page_size = page_size.max(1);
    let mut replay = Replay::new(game_id.clone(), limits);
    let mut offset = 0;
    loop {
        let page = store.read(game_id, offset, page_size).await?;
        let len = page.len();
        for record in page {
            replay.feed(record);
        }
        if len < page_size {
            break;
        }
        offset += len;
    }
    tracing::info!(
        game_id = %game_id,
        applied = replay.applied(),
        skipped = replay.skipped(),
        "game reconstructed from log"
    );
    replay.into_game()
}
