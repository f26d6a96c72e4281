//! Game actor: an isolated Tokio task that owns one live game.
//!
//! Every socket connected to the game sends its messages through the
//! actor's channel. The actor applies them in arrival order, writes the
//! log, broadcasts the change-sets and saves the game on a timer. Nothing
//! else holds a mutable reference to the game.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jigsaw_game::Game;
use jigsaw_protocol::{GameId, Input, PlayerId, ServerMessage};
use jigsaw_replay::{EventLog, LogRecord, ReplayStore};
use jigsaw_tick::TickScheduler;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use crate::{RoomConfig, RoomError, Storage, StorageError};

/// Identifies one connection inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub u64);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

/// Channel for delivering server messages to a connection's writer.
pub type SocketSender = mpsc::UnboundedSender<ServerMessage>;

/// A connection as the room sees it: who is behind it and where its
/// messages go.
#[derive(Debug, Clone)]
pub struct Socket {
    pub id: SocketId,
    pub player_id: PlayerId,
    pub sender: SocketSender,
}

/// Commands sent to a game actor through its channel.
#[derive(Debug)]
pub(crate) enum RoomCommand {
    /// `CLIENT_INIT`: register the player and the socket, reply with the
    /// snapshot.
    Init {
        socket: Socket,
        ts: u64,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// `CLIENT_EVENT`.
    Event {
        socket: Socket,
        client_seq: u64,
        input: Input,
        ts: u64,
    },

    /// The connection closed.
    Leave {
        socket: Socket,
        ts: u64,
        reply: oneshot::Sender<()>,
    },

    GetInfo {
        ts: u64,
        reply: oneshot::Sender<GameInfo>,
    },

    Snapshot {
        reply: oneshot::Sender<Game>,
    },

    /// Save, flush the log and stop.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Room metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub game_id: GameId,
    pub sockets: usize,
    pub players: usize,
    /// Players with input in the last 30 seconds.
    pub active_players: usize,
    pub idle_players: usize,
    pub pieces: usize,
    pub finished_pieces: usize,
    pub finished: bool,
}

/// Handle to a running game actor. Used to send commands to it.
///
/// Cheap to clone: it's just an `mpsc::Sender` wrapper. Connection
/// handlers keep one for the lifetime of their socket.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    game_id: GameId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// `true` once the actor has stopped (shut down or unloaded).
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        cmd: RoomCommand,
        reply_rx: oneshot::Receiver<T>,
    ) -> Result<T, RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.game_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.game_id.clone()))
    }

    /// Registers the socket and its player. The snapshot has been queued
    /// on the socket's sender when this returns.
    pub async fn init(&self, socket: Socket, ts: u64) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Init { socket, ts, reply }, rx).await?
    }

    /// Sends an input (fire-and-forget). The change-set comes back to
    /// every socket in the room as a `SERVER_EVENT`.
    pub async fn send_event(
        &self,
        socket: Socket,
        client_seq: u64,
        input: Input,
        ts: u64,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Event {
                socket,
                client_seq,
                input,
                ts,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.game_id.clone()))
    }

    pub async fn leave(&self, socket: Socket, ts: u64) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Leave { socket, ts, reply }, rx).await
    }

    pub async fn get_info(&self, ts: u64) -> Result<GameInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::GetInfo { ts, reply }, rx).await
    }

    /// A copy of the live game.
    pub async fn snapshot(&self) -> Result<Game, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Snapshot { reply }, rx).await
    }

    /// Waits until the final save and the log are flushed.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Shutdown { reply }, rx).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor<S> {
    game: Game,
    config: RoomConfig,
    sockets: HashMap<SocketId, SocketSender>,
    log: EventLog,
    /// Records go to a writer task that appends them in order.
    log_tx: mpsc::UnboundedSender<LogRecord>,
    storage: Arc<S>,
    save_timer: TickScheduler,
    /// At most one save in flight, so saves can't land out of order.
    saves: JoinSet<Result<(), StorageError>>,
    dirty: bool,
    /// When the last socket left.
    empty_since: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: Storage> RoomActor<S> {
    async fn run(mut self, log_task: JoinHandle<()>) {
        tracing::info!(game_id = %self.game.id, "game actor started");

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(result) = self.saves.join_next(), if !self.saves.is_empty() => {
                    self.on_save_done(result);
                }
                _ = self.save_timer.wait_for_tick() => {
                    if self.idle_expired() {
                        tracing::info!(game_id = %self.game.id, "unloading idle game");
                        break;
                    }
                    self.save_if_dirty();
                }
            }
        }

        // Refuse new commands but serve the ones already queued, so
        // nothing sent before the close is dropped.
        self.receiver.close();
        while let Ok(cmd) = self.receiver.try_recv() {
            match cmd {
                RoomCommand::Shutdown { reply } => {
                    let _ = reply.send(());
                }
                cmd => self.handle_command(cmd),
            }
        }

        let game_id = self.game.id.clone();
        self.finish(log_task).await;
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
        tracing::info!(%game_id, "game actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Init { socket, ts, reply } => {
                let result = self.handle_init(socket, ts);
                let _ = reply.send(result);
            }
            RoomCommand::Event {
                socket,
                client_seq,
                input,
                ts,
            } => self.handle_event(socket, client_seq, input, ts),
            RoomCommand::Leave { socket, ts, reply } => {
                self.handle_leave(socket, ts);
                let _ = reply.send(());
            }
            RoomCommand::GetInfo { ts, reply } => {
                let _ = reply.send(self.info(ts));
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.game.clone());
            }
            RoomCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn handle_init(&mut self, socket: Socket, ts: u64) -> Result<(), RoomError> {
        self.join_player(&socket.player_id, ts);
        self.add_socket(&socket);
        self.send_game(&socket.sender)
    }

    fn handle_event(&mut self, socket: Socket, client_seq: u64, input: Input, ts: u64) {
        let mut send_game = false;
        if self.game.player_index(&socket.player_id).is_none() {
            self.join_player(&socket.player_id, ts);
            send_game = true;
        }
        if self.add_socket(&socket) {
            send_game = true;
        }
        if send_game {
            if let Err(e) = self.send_game(&socket.sender) {
                tracing::warn!(game_id = %self.game.id, socket = %socket.id, error = %e, "snapshot not sent");
            }
        }
        self.apply_input(&socket.player_id, client_seq, &input, ts);
    }

    fn handle_leave(&mut self, socket: Socket, ts: u64) {
        if self.game.player_index(&socket.player_id).is_some() {
            self.apply_input(&socket.player_id, 0, &Input::ConnectionClose, ts);
        }
        if self.sockets.remove(&socket.id).is_some() {
            tracing::info!(
                game_id = %self.game.id,
                socket = %socket.id,
                player_id = %socket.player_id,
                sockets = self.sockets.len(),
                "socket left"
            );
        }
        if self.sockets.is_empty() && self.empty_since.is_none() {
            self.empty_since = Some(Instant::now());
        }
    }

    /// Logs the player record (before the game learns about the player,
    /// so the record can tell a new player from a returning one) and adds
    /// or refreshes the player.
    fn join_player(&mut self, player_id: &PlayerId, ts: u64) {
        let ts = self.game_time(ts);
        if self.log.should_log(&self.game.puzzle.data, ts) {
            let record = self.log.player(&self.game, player_id, ts);
            self.write_log(record);
        }
        if self.game.add_player(player_id, ts) {
            tracing::info!(
                game_id = %self.game.id,
                %player_id,
                players = self.game.players.len(),
                "player joined"
            );
        }
        self.dirty = true;
    }

    /// Connections stamp their own messages, so two of them can arrive out
    /// of order. Game time never runs backwards: the live game and the log
    /// both see the later of `ts` and the last logged timestamp.
    fn game_time(&self, ts: u64) -> u64 {
        ts.max(self.log.last_ts())
    }

    /// Idempotent. Returns `true` if the socket was not in the room yet.
    fn add_socket(&mut self, socket: &Socket) -> bool {
        if self.sockets.contains_key(&socket.id) {
            return false;
        }
        self.sockets.insert(socket.id, socket.sender.clone());
        self.empty_since = None;
        tracing::info!(
            game_id = %self.game.id,
            socket = %socket.id,
            player_id = %socket.player_id,
            sockets = self.sockets.len(),
            "socket joined"
        );
        true
    }

    fn send_game(&self, sender: &SocketSender) -> Result<(), RoomError> {
        let snapshot = self.game.encode()?;
        let _ = sender.send(ServerMessage::Init(snapshot));
        Ok(())
    }

    fn apply_input(&mut self, player_id: &PlayerId, client_seq: u64, input: &Input, ts: u64) {
        let Some(index) = self.game.player_index(player_id) else {
            tracing::warn!(game_id = %self.game.id, %player_id, "input from unknown player");
            return;
        };
        let ts = self.game_time(ts);
        if self.log.should_log(&self.game.puzzle.data, ts) {
            let record = self.log.input(index, input, ts);
            self.write_log(record);
        }

        let was_finished = self.game.is_finished();
        let changes = match self.game.handle_input(player_id, input, ts) {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!(game_id = %self.game.id, %player_id, error = %e, "input rejected");
                return;
            }
        };
        tracing::trace!(game_id = %self.game.id, %player_id, client_seq, changes = changes.len(), "input applied");
        self.dirty = true;

        self.broadcast(ServerMessage::Event {
            client_id: player_id.clone(),
            client_seq,
            changes,
        });

        if !was_finished && self.game.is_finished() {
            tracing::info!(
                game_id = %self.game.id,
                pieces = self.game.piece_count(),
                players = self.game.players.len(),
                "puzzle finished"
            );
            self.save_if_dirty();
        }
    }

    /// Sends to every socket in the room. Silently drops for sockets whose
    /// writer is gone.
    fn broadcast(&self, msg: ServerMessage) {
        for sender in self.sockets.values() {
            let _ = sender.send(msg.clone());
        }
    }

    fn write_log(&self, record: LogRecord) {
        if self.log_tx.send(record).is_err() {
            tracing::warn!(game_id = %self.game.id, "log writer stopped, record dropped");
        }
    }

    // -- Persistence --

    /// Starts a save in the background. The input path never waits on it.
    fn save_if_dirty(&mut self) {
        if !self.dirty || !self.saves.is_empty() {
            return;
        }
        self.dirty = false;
        let storage = Arc::clone(&self.storage);
        let game = self.game.clone();
        self.saves.spawn(async move { storage.save(&game).await });
    }

    fn on_save_done(&mut self, result: Result<Result<(), StorageError>, tokio::task::JoinError>) {
        match result {
            Ok(Ok(())) => tracing::debug!(game_id = %self.game.id, "game saved"),
            Ok(Err(e)) => {
                tracing::warn!(game_id = %self.game.id, error = %e, "save failed, retrying on next tick");
                self.dirty = true;
            }
            Err(e) => {
                tracing::warn!(game_id = %self.game.id, error = %e, "save task failed, retrying on next tick");
                self.dirty = true;
            }
        }
    }

    fn idle_expired(&self) -> bool {
        self.empty_since
            .is_some_and(|since| since.elapsed() >= self.config.idle_unload_after)
    }

    /// Final save (awaited), then closes the log and waits for the writer
    /// to drain.
    async fn finish(mut self, log_task: JoinHandle<()>) {
        while let Some(result) = self.saves.join_next().await {
            self.on_save_done(result);
        }
        if self.dirty {
            match self.storage.save(&self.game).await {
                Ok(()) => tracing::debug!(game_id = %self.game.id, "final save done"),
                Err(e) => tracing::error!(game_id = %self.game.id, error = %e, "final save failed"),
            }
        }
        drop(self.log_tx);
        if let Err(e) = log_task.await {
            tracing::warn!(game_id = %self.game.id, error = %e, "log writer failed");
        }
    }

    fn info(&self, ts: u64) -> GameInfo {
        let (active_players, idle_players) = self.game.player_activity(ts);
        GameInfo {
            game_id: self.game.id.clone(),
            sockets: self.sockets.len(),
            players: self.game.players.len(),
            active_players,
            idle_players,
            pieces: self.game.piece_count(),
            finished_pieces: self.game.finished_piece_count(),
            finished: self.game.is_finished(),
        }
    }
}

/// Appends records in the order the actor produced them.
async fn write_log<R: ReplayStore>(
    store: Arc<R>,
    game_id: GameId,
    mut records: mpsc::UnboundedReceiver<LogRecord>,
) {
    while let Some(record) = records.recv().await {
        if let Err(e) = store.append(&game_id, &record).await {
            tracing::warn!(%game_id, error = %e, "log append failed, record dropped");
        }
    }
}

/// Spawns a game actor and its log writer and returns a handle to the
/// actor.
///
/// `channel_size` in the config controls backpressure: if the channel
/// fills up, senders wait.
pub(crate) fn spawn_room<S: Storage, R: ReplayStore>(
    game: Game,
    log: EventLog,
    config: RoomConfig,
    storage: Arc<S>,
    replay_store: Arc<R>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let (log_tx, log_rx) = mpsc::unbounded_channel();
    let game_id = game.id.clone();

    let log_task = tokio::spawn(write_log(replay_store, game_id.clone(), log_rx));
    let actor = RoomActor {
        game,
        save_timer: TickScheduler::with_period(config.save_interval),
        config,
        sockets: HashMap::new(),
        log,
        log_tx,
        storage,
        saves: JoinSet::new(),
        dirty: false,
        empty_since: Some(Instant::now()),
        receiver: rx,
    };
    tokio::spawn(actor.run(log_task));

    RoomHandle {
        game_id,
        sender: tx,
    }
}
