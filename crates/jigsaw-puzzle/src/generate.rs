//! The puzzle generator: grid sizing, tab shapes, and the initial scatter.

use jigsaw_protocol::{Owner, Piece, Point, ShapeMode};

use crate::{ImageInfo, PuzzleError, PuzzleInfo, Rng, TILE_SIZE, TableSize};

/// Tabs on the four edges of a piece: `-1` blank, `0` flat, `1` tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PieceShape {
    pub top: i8,
    pub right: i8,
    pub bottom: i8,
    pub left: i8,
}

impl PieceShape {
    /// Two bits per edge: `(top+1) | (right+1)<<2 | (bottom+1)<<4 | (left+1)<<6`.
    pub fn encode(self) -> u8 {
        let bits = |v: i8| (v + 1) as u8;
        bits(self.top) | bits(self.right) << 2 | bits(self.bottom) << 4 | bits(self.left) << 6
    }

    pub fn decode(packed: u8) -> Self {
        let edge = |shift: u8| ((packed >> shift) & 0b11) as i8 - 1;
        Self {
            top: edge(0),
            right: edge(2),
            bottom: edge(4),
            left: edge(6),
        }
    }
}

/// Output of [`generate_puzzle`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPuzzle {
    pub info: PuzzleInfo,
    /// Pieces in index order, free and ungrouped at their scatter position.
    pub pieces: Vec<Piece>,
}

/// Grid dimensions `(tiles_x, tiles_y)` for an image and target count.
///
/// Works on a normalized `(w_, h_)` pair so portrait and landscape images
/// of the same aspect search the same way. The search size grows from 1
/// until `floor(w_/size) * floor(h_/size)` drops below the target, then
/// steps back one. That count is non-increasing in `size`, so the first
/// failing size is found by bisection.
pub fn grid_size(width: u32, height: u32, target: u32) -> (u32, u32) {
    let (w, h) = (u64::from(width), u64::from(height));
    let (w_, h_) = if w < h { (w * h, h * h) } else { (w * w, w * h) };
    let target = u64::from(target.max(1));
    let fits = |size: u64| (w_ / size) * (h_ / size) >= target;

    // Invariant: every size below `lo` fits, `hi` does not.
    let (mut lo, mut hi) = (1u64, w_.max(h_) + 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let size = (lo - 1).max(1) as f64;

    let round = |v: f64| (v + 0.5).floor() as u32;
    (round(w_ as f64 / size), round(h_ as f64 / size))
}

/// Builds the puzzle for an image. Deterministic for a given `rng` state;
/// shapes are drawn first, then the scatter shuffle.
pub fn generate_puzzle(
    rng: &mut Rng,
    image: &ImageInfo,
    target: u32,
    shape_mode: ShapeMode,
) -> Result<GeneratedPuzzle, PuzzleError> {
    if image.width == 0 || image.height == 0 {
        return Err(PuzzleError::EmptyImage {
            width: image.width,
            height: image.height,
        });
    }

    let (tiles_x, tiles_y) = grid_size(image.width, image.height, target);
    let tiles = tiles_x * tiles_y;
    let shapes = generate_shapes(rng, tiles_x, tiles_y, shape_mode);

    let width = tiles_x * TILE_SIZE;
    let height = tiles_y * TILE_SIZE;
    let tile = f64::from(TILE_SIZE);
    let info = PuzzleInfo {
        target_tiles: target,
        image: image.clone(),
        tile_size: TILE_SIZE,
        tile_margin_width: tile * 0.5,
        tile_draw_size: (tile * 2.0).round() as u32,
        snap_distance: tile / 2.0,
        tiles,
        tiles_x,
        tiles_y,
        width,
        height,
        table: TableSize {
            width: width * 3,
            height: height * 3,
        },
        shapes: shapes.iter().map(|s| s.encode()).collect(),
    };

    let positions = rng.shuffle(&spiral_positions(&info));
    let pieces = positions
        .into_iter()
        .enumerate()
        .map(|(idx, pos)| Piece {
            idx,
            pos,
            z: 0,
            owner: Owner::Free,
            group: 0,
        })
        .collect();

    tracing::debug!(
        target,
        tiles,
        tiles_x,
        tiles_y,
        ?shape_mode,
        "puzzle generated"
    );

    Ok(GeneratedPuzzle { info, pieces })
}

/// Row-major; right then bottom are drawn for each piece, top and left
/// mirror the neighbour already generated.
fn generate_shapes(rng: &mut Rng, tiles_x: u32, tiles_y: u32, mode: ShapeMode) -> Vec<PieceShape> {
    let tabs = mode.tabs();
    let total = (tiles_x * tiles_y) as usize;
    let cols = tiles_x as usize;
    let mut shapes: Vec<PieceShape> = Vec::with_capacity(total);

    for i in 0..total {
        let (x, y) = ((i % cols) as u32, (i / cols) as u32);
        let top = if y == 0 { 0 } else { -shapes[i - cols].bottom };
        let right = if x == tiles_x - 1 { 0 } else { rng.choice(tabs) };
        let left = if x == 0 { 0 } else { -shapes[i - 1].right };
        let bottom = if y == tiles_y - 1 { 0 } else { rng.choice(tabs) };
        shapes.push(PieceShape { top, right, bottom, left });
    }
    shapes
}

/// Rectangular spiral around the board, one slot per piece, each step
/// `1.5 * tile` apart. The horizontal and vertical leg lengths grow by one
/// alternately after each turn.
fn spiral_positions(info: &PuzzleInfo) -> Vec<Point> {
    let off = info.tile() * 1.5;
    let (width, height) = (f64::from(info.width), f64::from(info.height));

    let mut last = Point::new(width - off, height - 2.0 * off);
    let mut count_x = (width / off).ceil() as u32 + 2;
    let mut count_y = (height / off).ceil() as u32 + 2;
    let (mut diff_x, mut diff_y) = (off, 0.0);
    let mut index = 0;

    let mut positions = Vec::with_capacity(info.tiles as usize);
    for _ in 0..info.tiles {
        positions.push(last);
        last = last.add(Point::new(diff_x, diff_y));
        index += 1;
        if diff_x != 0.0 {
            if index == count_x {
                diff_y = diff_x;
                count_y += 1;
                diff_x = 0.0;
                index = 0;
            }
        } else if index == count_y {
            diff_x = -diff_y;
            count_x += 1;
            diff_y = 0.0;
            index = 0;
        }
    }
    positions
}
