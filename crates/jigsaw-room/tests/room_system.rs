//! Integration tests for game actors and the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use jigsaw_game::{Game, GameParams};
use jigsaw_protocol::{GameId, Input, Owner, PlayerId, Point, ServerMessage};
use jigsaw_puzzle::{ImageInfo, PuzzleLimits};
use jigsaw_replay::{LogRecord, MemoryReplayStore, ReplayStore, reconstruct};
use jigsaw_room::{
    GameRegistry, MemoryStorage, RoomConfig, RoomError, Socket, SocketId, Storage, StorageError,
};
use tokio::sync::{Mutex, Notify, mpsc};

// =========================================================================
// Helpers
// =========================================================================

fn params() -> GameParams {
    GameParams::new(
        4,
        ImageInfo {
            width: 128,
            height: 128,
            stable_ref: "img/1.png".into(),
        },
    )
}

fn registry<S: Storage>(
    storage: Arc<S>,
    config: RoomConfig,
) -> (GameRegistry<S, MemoryReplayStore>, Arc<MemoryReplayStore>) {
    let log = Arc::new(MemoryReplayStore::new());
    let registry = GameRegistry::new(storage, Arc::clone(&log), config, PuzzleLimits::default());
    (registry, log)
}

fn memory_registry() -> (
    GameRegistry<MemoryStorage, MemoryReplayStore>,
    Arc<MemoryStorage>,
    Arc<MemoryReplayStore>,
) {
    let storage = Arc::new(MemoryStorage::new());
    let (registry, log) = registry(Arc::clone(&storage), RoomConfig::default());
    (registry, storage, log)
}

fn socket(id: u64, player: &str) -> (Socket, mpsc::UnboundedReceiver<ServerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let socket = Socket {
        id: SocketId(id),
        player_id: PlayerId::new(player),
        sender: tx,
    };
    (socket, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn grab_point(game: &Game, idx: usize) -> Point {
    game.puzzle.pieces[idx].pos.add(Point::new(1.0, 1.0))
}

/// Drags piece `idx` by `(dx, dy)` and drops it, as three events.
async fn move_piece<S: Storage>(
    registry: &mut GameRegistry<S, MemoryReplayStore>,
    game_id: &GameId,
    socket: &Socket,
    idx: usize,
    delta: Point,
    seq: &mut u64,
    ts: u64,
) {
    let game = registry.snapshot(game_id).await.unwrap();
    let grab = grab_point(&game, idx);
    let release = grab.add(delta);
    let inputs = [
        Input::MouseDown { x: grab.x, y: grab.y },
        Input::MouseMove {
            x: release.x,
            y: release.y,
            dx: delta.x,
            dy: delta.y,
            down: true,
        },
        Input::MouseUp { x: release.x, y: release.y },
    ];
    for (i, input) in inputs.into_iter().enumerate() {
        *seq += 1;
        registry
            .send_event(game_id, socket.clone(), *seq, input, ts + i as u64)
            .await
            .unwrap();
    }
}

/// Moves every piece onto its final position.
async fn solve<S: Storage>(
    registry: &mut GameRegistry<S, MemoryReplayStore>,
    game_id: &GameId,
    socket: &Socket,
    ts: u64,
) {
    let mut seq = 0;
    let pieces = registry.snapshot(game_id).await.unwrap().piece_count();
    for idx in 0..pieces {
        let game = registry.snapshot(game_id).await.unwrap();
        let delta = game.puzzle.info.final_pos(idx).sub(game.puzzle.pieces[idx].pos);
        move_piece(registry, game_id, socket, idx, delta, &mut seq, ts + idx as u64 * 100).await;
    }
}

/// Memory storage whose saves can be switched to fail.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl Storage for FlakyStorage {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StorageError> {
        self.inner.load(game_id).await
    }

    async fn save(&self, game: &Game) -> Result<(), StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(game).await
    }

    async fn exists(&self, game_id: &GameId) -> Result<bool, StorageError> {
        self.inner.exists(game_id).await
    }
}

/// Memory storage whose loads wait until `open` is notified.
#[derive(Default)]
struct GatedStorage {
    inner: MemoryStorage,
    open: Notify,
}

impl Storage for GatedStorage {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StorageError> {
        self.open.notified().await;
        self.inner.load(game_id).await
    }

    async fn save(&self, game: &Game) -> Result<(), StorageError> {
        self.inner.save(game).await
    }

    async fn exists(&self, game_id: &GameId) -> Result<bool, StorageError> {
        self.inner.exists(game_id).await
    }
}

// =========================================================================
// Creation and loading
// =========================================================================

#[tokio::test]
async fn test_create_game_stores_game_and_header() {
    let (mut registry, storage, log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    assert!(game_id.is_valid());
    assert!(storage.exists(&game_id).await.unwrap());
    assert_eq!(registry.loaded_ids(), vec![game_id.clone()]);

    let records = log.read(&game_id, 0, 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(&records[0], Ok(LogRecord::Header(h)) if h.created == 1000));
}

#[tokio::test]
async fn test_create_game_rejects_piece_count_out_of_range() {
    let (mut registry, storage, _log) = memory_registry();
    let mut p = params();
    p.target_pieces = 2;

    let err = registry.create_game(p, 1000).await.unwrap_err();
    assert_eq!(err.code(), 422);
    assert_eq!(storage.len().await, 0);
    assert_eq!(registry.loaded_count(), 0);
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let (mut registry, _storage, _log) = memory_registry();
    let (s1, _rx) = socket(1, "p1");

    let err = registry.init(&GameId::new("missing"), s1.clone(), 1000).await.unwrap_err();
    assert!(matches!(err, RoomError::GameNotFound(_)));
    assert_eq!(err.code(), 404);

    let err = registry.init(&GameId::new("no/such"), s1, 1000).await.unwrap_err();
    assert!(matches!(err, RoomError::InvalidGameId(_)));
}

#[tokio::test]
async fn test_leave_on_unloaded_game_is_noop() {
    let (mut registry, _storage, _log) = memory_registry();
    let (s1, _rx) = socket(1, "p1");
    registry.leave(&GameId::new("missing"), s1, 1000).await.unwrap();
}

#[tokio::test]
async fn test_game_loads_from_storage_on_demand() {
    let storage = Arc::new(MemoryStorage::new());
    let game = Game::create(GameId::new("stored"), params(), 1000, &PuzzleLimits::default()).unwrap();
    storage.save(&game).await.unwrap();

    let (mut registry, _log) = registry(Arc::clone(&storage), RoomConfig::default());
    assert_eq!(registry.loaded_count(), 0);

    let (s1, mut rx) = socket(1, "p1");
    registry.init(&game.id, s1, 2000).await.unwrap();

    assert_eq!(registry.loaded_count(), 1);
    let Some(ServerMessage::Init(snapshot)) = rx.recv().await else {
        panic!("expected snapshot");
    };
    let client = Game::decode(snapshot).unwrap();
    assert_eq!(client.puzzle, game.puzzle);
    assert_eq!(client.players.len(), 1);
}

#[tokio::test]
async fn test_slow_load_does_not_hold_the_registry() {
    let storage = Arc::new(GatedStorage::default());
    let game = Game::create(GameId::new("slow"), params(), 1000, &PuzzleLimits::default()).unwrap();
    storage.inner.save(&game).await.unwrap();
    let (registry, _log) = registry(Arc::clone(&storage), RoomConfig::default());
    let registry = Arc::new(Mutex::new(registry));

    let loader = registry.lock().await.loader();
    let game_id = game.id.clone();
    let pending = tokio::spawn(async move { loader.load(&game_id).await });
    settle().await;
    assert!(!pending.is_finished());

    let other = registry.lock().await.create_game(params(), 1000).await.unwrap();
    assert!(registry.lock().await.loaded(&other).is_some());

    storage.open.notify_one();
    let (loaded, log) = pending.await.unwrap().unwrap();
    let handle = registry.lock().await.insert_loaded(loaded, log);
    assert_eq!(handle.game_id(), &game.id);
    assert_eq!(registry.lock().await.loaded_count(), 2);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_actor() {
    let storage = Arc::new(MemoryStorage::new());
    let game = Game::create(GameId::new("twice"), params(), 1000, &PuzzleLimits::default()).unwrap();
    storage.save(&game).await.unwrap();
    let (mut registry, _log) = registry(Arc::clone(&storage), RoomConfig::default());

    let (game_a, log_a) = registry.loader().load(&game.id).await.unwrap();
    let (game_b, log_b) = registry.loader().load(&game.id).await.unwrap();
    let a = registry.insert_loaded(game_a, log_a);
    let b = registry.insert_loaded(game_b, log_b);
    assert_eq!(registry.loaded_count(), 1);

    let (s1, _rx) = socket(1, "p1");
    a.init(s1, 2000).await.unwrap();
    assert_eq!(b.snapshot().await.unwrap().players.len(), 1);
}


// =========================================================================
// Sockets and broadcast
// =========================================================================

#[tokio::test]
async fn test_init_sends_snapshot_with_player() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, mut rx) = socket(1, "p1");
    registry.init(&game_id, s1, 2000).await.unwrap();

    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 1);
    let ServerMessage::Init(snapshot) = &msgs[0] else {
        panic!("expected snapshot, got {:?}", msgs[0]);
    };
    let game = Game::decode(snapshot.clone()).unwrap();
    assert_eq!(game.id, game_id);
    assert_eq!(game.players[0].id, PlayerId::new("p1"));
    assert_eq!(game.players[0].ts, 2000);
}

#[tokio::test]
async fn test_init_twice_keeps_one_socket() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, mut rx) = socket(1, "p1");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    registry.init(&game_id, s1, 2100).await.unwrap();

    let info = registry.game_info(&game_id, 2200).await.unwrap();
    assert_eq!(info.sockets, 1);
    assert_eq!(info.players, 1);
    assert_eq!(info.active_players, 1);
    // Every init answers with a snapshot.
    assert_eq!(drain(&mut rx).len(), 2);
}

#[tokio::test]
async fn test_event_is_broadcast_to_every_socket() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, mut rx1) = socket(1, "p1");
    let (s2, mut rx2) = socket(2, "p2");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    registry.init(&game_id, s2, 2000).await.unwrap();
    drain(&mut rx1);
    drain(&mut rx2);

    let game = registry.snapshot(&game_id).await.unwrap();
    let grab = grab_point(&game, 0);
    registry
        .send_event(&game_id, s1, 7, Input::MouseDown { x: grab.x, y: grab.y }, 2100)
        .await
        .unwrap();
    settle().await;

    for rx in [&mut rx1, &mut rx2] {
        let msgs = drain(rx);
        assert_eq!(msgs.len(), 1);
        let ServerMessage::Event { client_id, client_seq, changes } = &msgs[0] else {
            panic!("expected event, got {:?}", msgs[0]);
        };
        assert_eq!(client_id, &PlayerId::new("p1"));
        assert_eq!(*client_seq, 7);
        assert!(!changes.is_empty());
    }

    let game = registry.snapshot(&game_id).await.unwrap();
    assert_eq!(game.puzzle.pieces[0].owner, Owner::Player(PlayerId::new("p1")));
}

#[tokio::test]
async fn test_event_from_unknown_socket_gets_snapshot_first() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, mut rx) = socket(1, "p1");
    registry
        .send_event(&game_id, s1, 1, Input::ZoomIn { x: 5.0, y: 6.0 }, 2000)
        .await
        .unwrap();
    settle().await;

    let msgs = drain(&mut rx);
    assert_eq!(msgs.len(), 2);
    assert!(matches!(msgs[0], ServerMessage::Init(_)));
    assert!(matches!(msgs[1], ServerMessage::Event { client_seq: 1, .. }));

    let info = registry.game_info(&game_id, 2000).await.unwrap();
    assert_eq!(info.sockets, 1);
    assert_eq!(info.players, 1);
}

#[tokio::test]
async fn test_leave_releases_pieces_and_notifies_others() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx1) = socket(1, "p1");
    let (s2, mut rx2) = socket(2, "p2");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    registry.init(&game_id, s2, 2000).await.unwrap();

    let game = registry.snapshot(&game_id).await.unwrap();
    let grab = grab_point(&game, 0);
    registry
        .send_event(&game_id, s1.clone(), 1, Input::MouseDown { x: grab.x, y: grab.y }, 2100)
        .await
        .unwrap();
    registry.leave(&game_id, s1, 2200).await.unwrap();
    drain(&mut rx2);

    let game = registry.snapshot(&game_id).await.unwrap();
    assert_eq!(game.puzzle.pieces[0].owner, Owner::Free);

    let info = registry.game_info(&game_id, 2200).await.unwrap();
    assert_eq!(info.sockets, 1);
    assert_eq!(info.players, 2);
}

#[tokio::test]
async fn test_leave_broadcasts_connection_close_with_seq_zero() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx1) = socket(1, "p1");
    let (s2, mut rx2) = socket(2, "p2");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    registry.init(&game_id, s2, 2000).await.unwrap();
    drain(&mut rx2);

    registry.leave(&game_id, s1, 2500).await.unwrap();
    let msgs = drain(&mut rx2);
    assert_eq!(msgs.len(), 1);
    assert!(matches!(
        &msgs[0],
        ServerMessage::Event { client_id, client_seq: 0, .. } if client_id == &PlayerId::new("p1")
    ));
}

#[tokio::test]
async fn test_concurrent_sockets_are_serialized() {
    let (mut registry, _storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();
    let handle = registry.room(&game_id).await.unwrap();

    let (s1, mut rx1) = socket(1, "p1");
    let (s2, mut rx2) = socket(2, "p2");
    handle.init(s1.clone(), 2000).await.unwrap();
    handle.init(s2.clone(), 2000).await.unwrap();
    drain(&mut rx1);
    drain(&mut rx2);

    let mut tasks = Vec::new();
    for (n, s) in [s1, s2].into_iter().enumerate() {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            for seq in 1..=50u64 {
                let input = Input::Pan { dx: 1.0, dy: n as f64 };
                handle.send_event(s.clone(), seq, input, 3000 + seq).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let game = handle.snapshot().await.unwrap();
    assert_eq!(drain(&mut rx1).len(), 100);
    assert_eq!(drain(&mut rx2).len(), 100);
    assert_eq!(game.player(&PlayerId::new("p1")).unwrap().x, -50.0);
    assert_eq!(game.player(&PlayerId::new("p2")).unwrap().y, -50.0);
}

// =========================================================================
// Event log
// =========================================================================

#[tokio::test]
async fn test_log_rebuilds_the_live_game() {
    let (mut registry, storage, log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx1) = socket(1, "p1");
    let (s2, _rx2) = socket(2, "p1");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    let mut seq = 0;
    move_piece(&mut registry, &game_id, &s1, 1, Point::new(40.0, 300.0), &mut seq, 2100).await;
    registry.init(&game_id, s2, 2500).await.unwrap();
    registry.leave(&game_id, s1, 3000).await.unwrap();

    let live = registry.snapshot(&game_id).await.unwrap();
    registry.unload(&game_id).await.unwrap();

    let records: Vec<LogRecord> = log
        .read(&game_id, 0, 100)
        .await
        .unwrap()
        .into_iter()
        .map(Result::unwrap)
        .collect();
    // header, add, 3 inputs, update, close
    assert_eq!(records.len(), 7);
    assert!(matches!(records[1], LogRecord::AddPlayer { dt: 1000, .. }));
    assert_eq!(records[5], LogRecord::UpdatePlayer { index: 0, dt: 398 });

    let rebuilt = reconstruct(&*log, &game_id, PuzzleLimits::default(), 3).await.unwrap();
    assert_eq!(rebuilt, live);
    assert_eq!(storage.load(&game_id).await.unwrap(), Some(live));
}

#[tokio::test]
async fn test_out_of_order_timestamps_replay_like_live() {
    let (mut registry, _storage, log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (a, _rx_a) = socket(1, "a");
    let (b, _rx_b) = socket(2, "b");
    registry.init(&game_id, a.clone(), 2000).await.unwrap();
    registry.init(&game_id, b.clone(), 2000).await.unwrap();
    // b's message was stamped earlier but reaches the game second.
    registry
        .send_event(&game_id, a, 1, Input::PlayerName("ann".into()), 5000)
        .await
        .unwrap();
    registry
        .send_event(&game_id, b, 1, Input::PlayerName("bob".into()), 4000)
        .await
        .unwrap();

    let live = registry.snapshot(&game_id).await.unwrap();
    assert_eq!(live.player(&PlayerId::new("b")).unwrap().ts, 5000);
    registry.unload(&game_id).await.unwrap();

    let rebuilt = reconstruct(&*log, &game_id, PuzzleLimits::default(), 100).await.unwrap();
    assert_eq!(rebuilt.players, live.players);
    assert_eq!(rebuilt, live);
}

#[tokio::test]
async fn test_reloaded_game_continues_log_deltas() {
    let (mut registry, _storage, log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx1) = socket(1, "p1");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    registry.leave(&game_id, s1.clone(), 2500).await.unwrap();
    registry.unload(&game_id).await.unwrap();
    assert_eq!(registry.loaded_count(), 0);

    registry.init(&game_id, s1, 5500).await.unwrap();
    let live = registry.snapshot(&game_id).await.unwrap();
    registry.unload(&game_id).await.unwrap();

    let records = log.read(&game_id, 0, 100).await.unwrap();
    let last = records.last().unwrap().as_ref().unwrap();
    assert_eq!(last, &LogRecord::UpdatePlayer { index: 0, dt: 3000 });

    let rebuilt = reconstruct(&*log, &game_id, PuzzleLimits::default(), 100).await.unwrap();
    assert_eq!(rebuilt, live);
}

#[tokio::test]
async fn test_finished_game_saves_at_once_and_stops_logging() {
    let storage = Arc::new(MemoryStorage::new());
    let config = RoomConfig {
        save_interval: Duration::from_secs(3600),
        ..RoomConfig::default()
    };
    let (mut registry, log) = registry(Arc::clone(&storage), config);
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx) = socket(1, "p1");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    solve(&mut registry, &game_id, &s1, 3000).await;
    settle().await;

    let info = registry.game_info(&game_id, 4000).await.unwrap();
    assert!(info.finished);
    assert_eq!(info.finished_pieces, 4);

    let stored = storage.load(&game_id).await.unwrap().unwrap();
    assert!(stored.is_finished());

    registry.init(&game_id, s1.clone(), 9000).await.unwrap();
    registry
        .send_event(&game_id, s1, 99, Input::ZoomOut { x: 0.0, y: 0.0 }, 9001)
        .await
        .unwrap();
    registry.unload(&game_id).await.unwrap();
    // header, add, 4 × (down, move, up); nothing after the finish
    assert_eq!(log.len(&game_id).await, 14);
}

// =========================================================================
// Persistence timer and idle unload
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_changes_are_saved_on_the_next_tick() {
    let (mut registry, storage, _log) = memory_registry();
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx) = socket(1, "p1");
    registry.init(&game_id, s1, 2000).await.unwrap();
    assert!(storage.load(&game_id).await.unwrap().unwrap().players.is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(storage.load(&game_id).await.unwrap().unwrap().players.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_is_retried_without_blocking_input() {
    let storage = Arc::new(FlakyStorage::default());
    let (mut registry, _log) = registry(Arc::clone(&storage), RoomConfig::default());
    let game_id = registry.create_game(params(), 1000).await.unwrap();
    storage.failing.store(true, Ordering::SeqCst);

    let (s1, mut rx) = socket(1, "p1");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(storage.attempts.load(Ordering::SeqCst) >= 2);
    assert!(storage.inner.load(&game_id).await.unwrap().unwrap().players.is_empty());

    // The game keeps playing while saves fail.
    registry
        .send_event(&game_id, s1, 1, Input::ZoomIn { x: 1.0, y: 1.0 }, 2100)
        .await
        .unwrap();
    settle().await;
    assert_eq!(drain(&mut rx).len(), 2);

    storage.failing.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    let stored = storage.inner.load(&game_id).await.unwrap().unwrap();
    assert_eq!(stored.players.len(), 1);
    assert_eq!(stored.players[0].x, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_idle_game_unloads_and_reloads() {
    let storage = Arc::new(MemoryStorage::new());
    let config = RoomConfig {
        idle_unload_after: Duration::from_secs(60),
        ..RoomConfig::default()
    };
    let (mut registry, _log) = registry(Arc::clone(&storage), config);
    let game_id = registry.create_game(params(), 1000).await.unwrap();

    let (s1, _rx1) = socket(1, "p1");
    registry.init(&game_id, s1.clone(), 2000).await.unwrap();
    registry.leave(&game_id, s1, 3000).await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(registry.loaded_count(), 1);

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(registry.loaded_count(), 0);
    assert_eq!(storage.load(&game_id).await.unwrap().unwrap().players.len(), 1);

    let (s2, mut rx2) = socket(2, "p2");
    registry.init(&game_id, s2, 80_000).await.unwrap();
    assert_eq!(registry.loaded_count(), 1);
    let Some(ServerMessage::Init(snapshot)) = rx2.recv().await else {
        panic!("expected snapshot");
    };
    assert_eq!(Game::decode(snapshot).unwrap().players.len(), 2);
}

#[tokio::test]
async fn test_shutdown_all_stops_every_game() {
    let (mut registry, _storage, _log) = memory_registry();
    let a = registry.create_game(params(), 1000).await.unwrap();
    let b = registry.create_game(params(), 1000).await.unwrap();
    let handle = registry.room(&a).await.unwrap();
    assert_eq!(registry.loaded_count(), 2);

    registry.shutdown_all().await;
    assert_eq!(registry.loaded_count(), 0);
    assert!(handle.is_closed());
    assert!(matches!(handle.get_info(0).await, Err(RoomError::Unavailable(id)) if id == a));
    assert_ne!(a, b);
}
