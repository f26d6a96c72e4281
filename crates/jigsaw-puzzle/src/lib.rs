//! Deterministic puzzle generation.
//!
//! Everything random about a puzzle (tab shapes, the scatter layout) is
//! drawn from one [`Rng`] seeded from the game id and creation time. The
//! generator is a pure function of that seed plus the image size, target
//! piece count and [`ShapeMode`](jigsaw_protocol::ShapeMode), so a replay
//! can rebuild the exact same puzzle years later.
//!
//! # Key types
//!
//! - [`Rng`] / [`RngState`] — 2×32-bit generator with serialize/restore
//! - [`generate_puzzle`] — grid sizing, shapes, spiral scatter
//! - [`PuzzleInfo`] — grid metadata and board geometry
//! - [`PuzzleLimits`] — allowed piece-count range

mod error;
mod generate;
mod info;
mod rng;

pub use error::PuzzleError;
pub use generate::{GeneratedPuzzle, PieceShape, generate_puzzle, grid_size};
pub use info::{ImageInfo, PuzzleInfo, PuzzleLimits, Rect, TableSize, TILE_SIZE};
pub use rng::{Rng, RngState, seed_for};
