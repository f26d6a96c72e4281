//! Authoritative game state for one collaborative puzzle.
//!
//! [`Game`] owns the pieces, players and counters of a single puzzle and
//! is mutated only through [`Game::add_player`] and [`Game::handle_input`].
//! Each input returns the minimal change-set ([`Change`](jigsaw_protocol::Change))
//! needed to replay the mutation elsewhere; [`Game::apply_changes`] is the
//! other half, used by clients and observers.
//!
//! The crate is synchronous and does no I/O. Serializing access to one
//! game (one writer at a time) is the caller's job; the room actor does it
//! on the server.
//!
//! # Piece states
//!
//! ```text
//!          MOUSE_DOWN               MOUSE_UP near final pos
//!   FREE ─────────────▶ HELD ──────────────────────────────▶ FINISHED
//!    ▲                    │
//!    └────────────────────┘  MOUSE_UP elsewhere / CONNECTION_CLOSE
//! ```

mod error;
mod game;
mod input;
mod sync;

pub use error::GameError;
pub use game::{GAME_VERSION, Game, GameParams, IDLE_TIMEOUT_MS, Puzzle};
pub use sync::ClientSync;
