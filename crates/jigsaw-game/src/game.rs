//! The `Game` aggregate: creation, players, snapshots, change application.

use jigsaw_protocol::{Change, GameId, Piece, Player, PlayerId, PuzzleData, ScoreMode, ShapeMode, SnapMode};
use jigsaw_puzzle::{ImageInfo, PuzzleInfo, PuzzleLimits, Rng, RngState, generate_puzzle, seed_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GameError;

/// Version written into new games and log headers.
pub const GAME_VERSION: u32 = 3;

/// Players with no input for this long count as idle.
pub const IDLE_TIMEOUT_MS: u64 = 30_000;

/// Immutable generation parameters, exactly what a log header records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameParams {
    pub game_version: u32,
    pub target_pieces: u32,
    pub image: ImageInfo,
    pub score_mode: ScoreMode,
    pub shape_mode: ShapeMode,
    pub snap_mode: SnapMode,
    pub creator_id: Option<PlayerId>,
    pub private: bool,
}

impl GameParams {
    pub fn new(target_pieces: u32, image: ImageInfo) -> Self {
        Self {
            game_version: GAME_VERSION,
            target_pieces,
            image,
            score_mode: ScoreMode::default(),
            shape_mode: ShapeMode::default(),
            snap_mode: SnapMode::default(),
            creator_id: None,
            private: false,
        }
    }
}

/// Board metadata plus the mutable piece array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub info: PuzzleInfo,
    pub data: PuzzleData,
    pub pieces: Vec<Piece>,
}

/// One puzzle game.
///
/// Serializes (camelCase JSON, pieces and players as wire tuples) both for
/// storage and as the `SERVER_INIT` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub created: u64,
    pub params: GameParams,
    pub puzzle: Puzzle,
    /// Ordered by first appearance. A player's position here is its
    /// stable index in the event log.
    pub players: Vec<Player>,
    pub rng: RngState,
}

impl Game {
    /// Generates a new game. The RNG is seeded from `id` and `created`, so
    /// the same triple always yields the same puzzle.
    pub fn create(
        id: GameId,
        params: GameParams,
        created: u64,
        limits: &PuzzleLimits,
    ) -> Result<Self, GameError> {
        limits.validate(params.target_pieces)?;

        let mut rng = Rng::new(seed_for(id.as_str(), created));
        let generated = generate_puzzle(&mut rng, &params.image, params.target_pieces, params.shape_mode)?;

        tracing::debug!(game_id = %id, tiles = generated.info.tiles, "game created");

        Ok(Self {
            id,
            created,
            params,
            puzzle: Puzzle {
                info: generated.info,
                data: PuzzleData {
                    started: created,
                    ..PuzzleData::default()
                },
                pieces: generated.pieces,
            },
            players: Vec::new(),
            rng: rng.serialize(),
        })
    }

    // -- Players --

    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_id_by_index(&self, idx: usize) -> Result<&PlayerId, GameError> {
        self.players
            .get(idx)
            .map(|p| &p.id)
            .ok_or(GameError::PlayerIndexNotFound(idx))
    }

    /// Registers a player, or refreshes its activity timestamp if it is
    /// already known. Returns `true` when the player is new.
    pub fn add_player(&mut self, id: &PlayerId, ts: u64) -> bool {
        match self.player_index(id) {
            Some(idx) => {
                self.players[idx].ts = ts;
                false
            }
            None => {
                tracing::debug!(game_id = %self.id, player_id = %id, "player added");
                self.players.push(Player::new(id.clone(), ts));
                true
            }
        }
    }

    /// `(active, idle)` player counts at `now`.
    pub fn player_activity(&self, now: u64) -> (usize, usize) {
        let active = self
            .players
            .iter()
            .filter(|p| p.is_active(now, IDLE_TIMEOUT_MS))
            .count();
        (active, self.players.len() - active)
    }

    // -- Pieces --

    pub fn piece_count(&self) -> usize {
        self.puzzle.pieces.len()
    }

    pub fn finished_piece_count(&self) -> usize {
        self.puzzle
            .pieces
            .iter()
            .filter(|p| p.owner.is_finished())
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.puzzle.data.is_finished()
    }

    // -- Snapshots --

    /// Full snapshot for `SERVER_INIT`.
    pub fn encode(&self) -> Result<Value, GameError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn decode(value: Value) -> Result<Self, GameError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Applies a change-set produced by [`handle_input`](Self::handle_input)
    /// on another copy of this game.
    ///
    /// Player changes for `skip_player` are ignored: a client keeps its own
    /// cursor locally and must not be dragged back by a stale echo.
    pub fn apply_changes(&mut self, changes: &[Change], skip_player: Option<&PlayerId>) {
        for change in changes {
            match change {
                Change::Data(data) => self.puzzle.data = *data,
                Change::Piece(piece) => match self.puzzle.pieces.get_mut(piece.idx) {
                    Some(slot) => *slot = piece.clone(),
                    None => tracing::warn!(
                        game_id = %self.id,
                        idx = piece.idx,
                        "change for unknown piece ignored"
                    ),
                },
                Change::Player(player) => {
                    if skip_player == Some(&player.id) {
                        continue;
                    }
                    match self.player_index(&player.id) {
                        Some(idx) => self.players[idx] = player.clone(),
                        None => self.players.push(player.clone()),
                    }
                }
                Change::Snap(_) => {}
            }
        }
    }
}
