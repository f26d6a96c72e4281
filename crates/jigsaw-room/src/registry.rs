//! Game registry: creates games, loads them on demand and routes sockets
//! to their game actor.

use std::collections::HashMap;
use std::sync::Arc;

use jigsaw_game::{Game, GameParams};
use jigsaw_protocol::{GameId, Input};
use jigsaw_puzzle::PuzzleLimits;
use jigsaw_replay::{EventLog, ReplayStore, last_timestamp};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::room::spawn_room;
use crate::{GameInfo, RoomConfig, RoomError, RoomHandle, Socket, Storage};

const GAME_ID_LEN: usize = 10;

fn random_game_id() -> GameId {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GAME_ID_LEN)
        .map(char::from)
        .collect();
    GameId::new(id.to_lowercase())
}

/// Reads a stored game and works out where its log left off.
pub struct GameLoader<S, R> {
    storage: Arc<S>,
    replay_store: Arc<R>,
    log_page_size: usize,
    post_finish_window_ms: u64,
}

impl<S: Storage, R: ReplayStore> GameLoader<S, R> {
    /// # Errors
    /// `InvalidGameId`, `GameNotFound`, or a storage/log read failure.
    pub async fn load(&self, game_id: &GameId) -> Result<(Game, EventLog), RoomError> {
        if !game_id.is_valid() {
            return Err(RoomError::InvalidGameId(game_id.clone()));
        }

        let game = self
            .storage
            .load(game_id)
            .await?
            .ok_or_else(|| RoomError::GameNotFound(game_id.clone()))?;
        let last_ts = last_timestamp(&*self.replay_store, game_id, self.log_page_size)
            .await?
            .unwrap_or(game.created);

        tracing::info!(%game_id, players = game.players.len(), last_ts, "game loaded");
        Ok((game, EventLog::new(last_ts, self.post_finish_window_ms)))
    }
}

/// Tracks every loaded game actor.
///
/// Games are loaded lazily: the first message for a game that isn't
/// running pulls it from [`Storage`] and spawns its actor. Actors unload
/// themselves when idle; the registry notices the closed handle and loads
/// the game again on the next message.
pub struct GameRegistry<S, R> {
    rooms: HashMap<GameId, RoomHandle>,
    storage: Arc<S>,
    replay_store: Arc<R>,
    config: RoomConfig,
    limits: PuzzleLimits,
}

impl<S: Storage, R: ReplayStore> GameRegistry<S, R> {
    pub fn new(storage: Arc<S>, replay_store: Arc<R>, config: RoomConfig, limits: PuzzleLimits) -> Self {
        Self {
            rooms: HashMap::new(),
            storage,
            replay_store,
            config,
            limits,
        }
    }

    fn post_finish_window_ms(&self) -> u64 {
        self.config.post_finish_log_window.as_millis() as u64
    }

    /// Generates a new game, stores it, writes its log header and starts
    /// its actor.
    ///
    /// # Errors
    /// `Game(Puzzle(..))` when the piece count is outside the limits or
    /// the image is empty. Nothing is stored in that case.
    pub async fn create_game(&mut self, params: GameParams, ts: u64) -> Result<GameId, RoomError> {
        let mut game_id = random_game_id();
        while self.storage.exists(&game_id).await? {
            game_id = random_game_id();
        }

        let game = Game::create(game_id.clone(), params, ts, &self.limits)?;
        self.storage.save(&game).await?;

        let mut log = EventLog::new(ts, self.post_finish_window_ms());
        self.replay_store.append(&game_id, &log.header(&game)).await?;

        tracing::info!(
            %game_id,
            pieces = game.piece_count(),
            score_mode = ?game.params.score_mode,
            snap_mode = ?game.params.snap_mode,
            "game created"
        );
        self.spawn(game, log);
        Ok(game_id)
    }

    fn spawn(&mut self, game: Game, log: EventLog) -> RoomHandle {
        let handle = spawn_room(
            game,
            log,
            self.config.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.replay_store),
        );
        self.rooms.insert(handle.game_id().clone(), handle.clone());
        handle
    }

    /// The running actor for `game_id`, loading the game if needed.
    pub async fn room(&mut self, game_id: &GameId) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.loaded(game_id) {
            return Ok(handle);
        }
        let (game, log) = self.loader().load(game_id).await?;
        Ok(self.insert_loaded(game, log))
    }

    /// The running actor for `game_id`, if there is one. A handle whose
    /// actor has stopped is dropped.
    pub fn loaded(&mut self, game_id: &GameId) -> Option<RoomHandle> {
        let handle = self.rooms.get(game_id)?;
        if !handle.is_closed() {
            return Some(handle.clone());
        }
        tracing::debug!(%game_id, "dropping handle of stopped game");
        self.rooms.remove(game_id);
        None
    }

    /// Something that can read a game from storage without holding on to
    /// the registry.
    pub fn loader(&self) -> GameLoader<S, R> {
        GameLoader {
            storage: Arc::clone(&self.storage),
            replay_store: Arc::clone(&self.replay_store),
            log_page_size: self.config.log_page_size,
            post_finish_window_ms: self.post_finish_window_ms(),
        }
    }

    /// Starts the actor for a game read by a [`GameLoader`]. When another
    /// caller got there first, its actor wins and this copy is dropped.
    pub fn insert_loaded(&mut self, game: Game, log: EventLog) -> RoomHandle {
        if let Some(handle) = self.loaded(&game.id) {
            tracing::debug!(game_id = %game.id, "game was loaded concurrently");
            return handle;
        }
        self.spawn(game, log)
    }

    /// Registers the socket with its game and queues the snapshot.
    pub async fn init(&mut self, game_id: &GameId, socket: Socket, ts: u64) -> Result<(), RoomError> {
        let handle = self.room(game_id).await?;
        handle.init(socket, ts).await
    }

    /// Routes an input to its game.
    pub async fn send_event(
        &mut self,
        game_id: &GameId,
        socket: Socket,
        client_seq: u64,
        input: Input,
        ts: u64,
    ) -> Result<(), RoomError> {
        let handle = self.room(game_id).await?;
        handle.send_event(socket, client_seq, input, ts).await
    }

    /// Removes the socket from a loaded game. A game that isn't loaded has
    /// no sockets, so there is nothing to do.
    pub async fn leave(&mut self, game_id: &GameId, socket: Socket, ts: u64) -> Result<(), RoomError> {
        match self.rooms.get(game_id) {
            Some(handle) if !handle.is_closed() => handle.leave(socket, ts).await,
            _ => Ok(()),
        }
    }

    pub async fn game_info(&mut self, game_id: &GameId, ts: u64) -> Result<GameInfo, RoomError> {
        let handle = self.room(game_id).await?;
        handle.get_info(ts).await
    }

    pub async fn snapshot(&mut self, game_id: &GameId) -> Result<Game, RoomError> {
        let handle = self.room(game_id).await?;
        handle.snapshot().await
    }

    /// Saves and stops a loaded game.
    pub async fn unload(&mut self, game_id: &GameId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(game_id)
            .ok_or_else(|| RoomError::GameNotFound(game_id.clone()))?;
        handle.shutdown().await?;
        tracing::info!(%game_id, "game unloaded");
        Ok(())
    }

    /// Saves and stops every loaded game.
    pub async fn shutdown_all(&mut self) {
        for (game_id, handle) in self.rooms.drain() {
            if let Err(e) = handle.shutdown().await {
                tracing::debug!(%game_id, error = %e, "game already stopped");
            }
        }
    }

    /// Games whose actor is still running.
    pub fn loaded_ids(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self
            .rooms
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn loaded_count(&self) -> usize {
        self.rooms.values().filter(|handle| !handle.is_closed()).count()
    }

    pub fn limits(&self) -> &PuzzleLimits {
        &self.limits
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn replay_store(&self) -> &Arc<R> {
        &self.replay_store
    }
}
