//! Error types for the game layer.

use jigsaw_protocol::PlayerId;
use jigsaw_puzzle::PuzzleError;

/// Errors returned by game operations. None of them leave the game
/// partially mutated: lookups happen before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Generation parameters were rejected.
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),

    /// An input referenced a player the game has never seen.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// A log record referenced a player index that doesn't exist.
    #[error("player index {0} not found")]
    PlayerIndexNotFound(usize),

    /// An encoded game snapshot could not be read.
    #[error("invalid game snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}
