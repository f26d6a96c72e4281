//! Puzzle metadata and board geometry.

use jigsaw_protocol::Point;
use serde::{Deserialize, Serialize};

use crate::PuzzleError;

/// Raster size of one tile in table units. Independent of the image size:
/// the grid search only decides how many tiles there are.
pub const TILE_SIZE: u32 = 64;

/// The source image as supplied at creation time. The core never looks
/// at pixels, only at the dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Opaque reference to the stored image (url, hash, ...).
    pub stable_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSize {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned rectangle in table space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Inclusive on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Allowed range for the requested piece count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleLimits {
    pub min_pieces: u32,
    pub max_pieces: u32,
}

impl Default for PuzzleLimits {
    fn default() -> Self {
        Self {
            min_pieces: 4,
            max_pieces: 10_000,
        }
    }
}

impl PuzzleLimits {
    pub fn validate(&self, target: u32) -> Result<(), PuzzleError> {
        if (self.min_pieces..=self.max_pieces).contains(&target) {
            Ok(())
        } else {
            Err(PuzzleError::PieceCountOutOfRange {
                target,
                min: self.min_pieces,
                max: self.max_pieces,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// PuzzleInfo
// ---------------------------------------------------------------------------

/// Immutable grid metadata of a generated puzzle.
///
/// The table is three times the board in each direction and the board
/// sits in its centre; pieces start scattered around the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleInfo {
    pub target_tiles: u32,
    pub image: ImageInfo,
    pub tile_size: u32,
    pub tile_margin_width: f64,
    pub tile_draw_size: u32,
    pub snap_distance: f64,
    pub tiles: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    /// Board size in table units.
    pub width: u32,
    pub height: u32,
    pub table: TableSize,
    /// Packed tab shape per piece, see [`PieceShape`](crate::PieceShape).
    pub shapes: Vec<u8>,
}

impl PuzzleInfo {
    pub fn tile(&self) -> f64 {
        f64::from(self.tile_size)
    }

    /// Grid coordinate `(column, row)` of a piece.
    pub fn coord(&self, idx: usize) -> (u32, u32) {
        let idx = idx as u32;
        (idx % self.tiles_x, idx / self.tiles_x)
    }

    fn index_at(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.tiles_x) || y >= i64::from(self.tiles_y) {
            return None;
        }
        Some((y * i64::from(self.tiles_x) + x) as usize)
    }

    /// Orthogonal neighbours in the fixed order top, right, bottom, left.
    pub fn neighbors(&self, idx: usize) -> [Option<usize>; 4] {
        let (x, y) = self.coord(idx);
        let (x, y) = (i64::from(x), i64::from(y));
        [
            self.index_at(x, y - 1),
            self.index_at(x + 1, y),
            self.index_at(x, y + 1),
            self.index_at(x - 1, y),
        ]
    }

    pub fn is_corner(&self, idx: usize) -> bool {
        let (x, y) = self.coord(idx);
        (x == 0 || x == self.tiles_x - 1) && (y == 0 || y == self.tiles_y - 1)
    }

    /// Top-left corner of the board in table space.
    pub fn board_origin(&self) -> Point {
        Point::new(
            (f64::from(self.table.width) - f64::from(self.width)) / 2.0,
            (f64::from(self.table.height) - f64::from(self.height)) / 2.0,
        )
    }

    /// Where a piece ends up when the puzzle is solved.
    pub fn final_pos(&self, idx: usize) -> Point {
        let (x, y) = self.coord(idx);
        let tile = self.tile();
        self.board_origin()
            .add(Point::new(f64::from(x) * tile, f64::from(y) * tile))
    }

    /// The area pieces may be dragged in: the table plus a quarter of its
    /// size on every side.
    pub fn bounds(&self) -> Rect {
        let tw = f64::from(self.table.width);
        let th = f64::from(self.table.height);
        let over_x = (tw / 4.0).round();
        let over_y = (th / 4.0).round();
        Rect {
            x: -over_x,
            y: -over_y,
            w: tw + 2.0 * over_x,
            h: th + 2.0 * over_y,
        }
    }

    /// Hit box of a piece at `pos`.
    pub fn piece_rect(&self, pos: Point) -> Rect {
        Rect {
            x: pos.x,
            y: pos.y,
            w: self.tile(),
            h: self.tile(),
        }
    }
}
