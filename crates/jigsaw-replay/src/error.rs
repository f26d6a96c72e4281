use jigsaw_game::GameError;
use jigsaw_protocol::GameId;

/// Errors from event logging and replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// A log line that does not decode into a record.
    #[error("malformed log record: {0}")]
    MalformedRecord(String),

    /// The log has no header, so the puzzle cannot be regenerated.
    #[error("no header in log of game {0}")]
    MissingHeader(GameId),

    #[error("invalid game id: {0:?}")]
    InvalidGameId(GameId),

    /// A record referenced a player that is not in the game.
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("replay store I/O: {0}")]
    Io(#[from] std::io::Error),
}
