//! Wire protocol for the jigsaw server.
//!
//! This crate defines the "language" that puzzle clients and the server
//! speak:
//!
//! - **Identity & modes** ([`GameId`], [`PlayerId`], [`ScoreMode`],
//!   [`ShapeMode`], [`SnapMode`]).
//! - **Shared model** ([`Piece`], [`Player`], [`PuzzleData`], [`Owner`]) —
//!   the pieces of game state that travel inside change-sets.
//! - **Messages** ([`Input`], [`Change`], [`ClientMessage`],
//!   [`ServerMessage`]) — tagged tuples of the form `[tag, ...args]`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Wire format
//!
//! Every structure has one explicit `encode` / `decode` pair that fixes
//! its positional field order. The `Serialize` / `Deserialize` impls
//! delegate to that pair, so any [`Codec`] produces the exact same tuples:
//!
//! ```text
//! piece   [idx, x, y, z, owner, group]
//! player  [id, x, y, d, name, color, bgcolor, points, ts]
//! event   [2, clientSeq, [inputTag, ...inputArgs]]
//! ```

#[macro_use]
mod wire;

mod codec;
mod error;
mod input;
mod message;
mod model;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use input::Input;
pub use message::{Change, ClientMessage, ServerMessage};
pub use model::{Owner, Piece, Player, Point, PuzzleData};
pub use types::{GameId, PlayerId, ScoreMode, ShapeMode, SnapMode};
