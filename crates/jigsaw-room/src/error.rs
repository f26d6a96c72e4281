//! Error types for the room layer.

use jigsaw_game::GameError;
use jigsaw_protocol::GameId;
use jigsaw_replay::ReplayError;

/// Errors from a [`Storage`](crate::Storage) backend. Any of them is
/// transient from the actor's point of view: the save is retried on the
/// next tick.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored game could not be read back, or a game could not be
    /// written out.
    #[error("stored game is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid game id {0:?}")]
    InvalidGameId(GameId),
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Neither loaded nor in storage.
    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("invalid game id {0:?}")]
    InvalidGameId(GameId),

    /// The game's command channel is full or closed.
    #[error("game {0} is unavailable")]
    Unavailable(GameId),

    /// Creation parameters were rejected, or a snapshot failed to encode.
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl RoomError {
    /// Code for a `SERVER_ERROR` frame.
    pub fn code(&self) -> u16 {
        match self {
            Self::GameNotFound(_) => 404,
            Self::InvalidGameId(_) => 400,
            Self::Game(GameError::Puzzle(_)) => 422,
            Self::Unavailable(_) => 503,
            Self::Game(_) | Self::Storage(_) | Self::Replay(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jigsaw_puzzle::PuzzleError;

    #[test]
    fn test_error_codes() {
        let id = GameId::new("g1");
        assert_eq!(RoomError::GameNotFound(id.clone()).code(), 404);
        assert_eq!(RoomError::InvalidGameId(id.clone()).code(), 400);
        assert_eq!(RoomError::Unavailable(id).code(), 503);
        let validation = GameError::Puzzle(PuzzleError::EmptyImage { width: 0, height: 10 });
        assert_eq!(RoomError::from(validation).code(), 422);
    }

    #[test]
    fn test_storage_error_wraps_transparently() {
        let err: RoomError = StorageError::InvalidGameId(GameId::new("../x")).into();
        assert!(err.to_string().contains("../x"));
    }
}
