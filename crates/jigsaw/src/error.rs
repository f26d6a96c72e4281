//! Unified error type for the jigsaw server.

use jigsaw_game::GameError;
use jigsaw_protocol::ProtocolError;
use jigsaw_replay::ReplayError;
use jigsaw_room::{RoomError, StorageError};
use jigsaw_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum JigsawError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A game operation failed (unknown game, actor gone, bad parameters).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Game(#[from] GameError),
}
