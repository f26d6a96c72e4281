//! Shared puzzle model: the structures that travel inside change-sets.
//!
//! Server and client hold identical copies of these. The positional
//! encodings below are a compatibility contract with existing clients and
//! stored logs, so field order must never change.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::wire::{array, f64_at, i64_at, opt_str_at, slot, str_at, u64_at};
use crate::{PlayerId, ProtocolError};

/// A point in table space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

/// Who a piece belongs to right now.
///
/// On the wire: `0` (free), `-1` (finished), or the holding player's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Owner {
    #[default]
    Free,
    Finished,
    Player(PlayerId),
}

impl Owner {
    pub fn is_free(&self) -> bool {
        matches!(self, Owner::Free)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Owner::Finished)
    }

    pub fn is_player(&self, id: &PlayerId) -> bool {
        matches!(self, Owner::Player(p) if p == id)
    }

    pub fn encode(&self) -> Value {
        match self {
            Owner::Free => json!(0),
            Owner::Finished => json!(-1),
            Owner::Player(id) => json!(id.as_str()),
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        match value {
            Value::String(s) => Ok(Owner::Player(PlayerId::new(s.clone()))),
            Value::Number(n) => match n.as_f64() {
                Some(v) if v == 0.0 => Ok(Owner::Free),
                Some(v) if v == -1.0 => Ok(Owner::Finished),
                _ => Err(ProtocolError::invalid(format!("owner: unexpected number {n}"))),
            },
            other => Err(ProtocolError::invalid(format!("owner: unexpected value {other}"))),
        }
    }
}

wire_serde!(Owner);

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// One jigsaw piece.
///
/// Encoded as `[idx, x, y, z, owner, group]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Stable index `0..N`, also the piece's identity.
    pub idx: usize,
    pub pos: Point,
    /// Draw order. Finished pieces always sit at `z = 1`.
    pub z: i64,
    pub owner: Owner,
    /// `0` = ungrouped, else the id shared by every piece in the group.
    pub group: u64,
}

impl Piece {
    pub fn encode(&self) -> Value {
        json!([
            self.idx,
            self.pos.x,
            self.pos.y,
            self.z,
            self.owner.encode(),
            self.group
        ])
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        const WHAT: &str = "piece";
        let items = array(value, WHAT)?;
        Ok(Self {
            idx: u64_at(items, 0, WHAT)? as usize,
            pos: Point::new(f64_at(items, 1, WHAT)?, f64_at(items, 2, WHAT)?),
            z: i64_at(items, 3, WHAT)?,
            owner: Owner::decode(slot(items, 4, WHAT)?)?,
            group: u64_at(items, 5, WHAT)?,
        })
    }
}

wire_serde!(Piece);

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A participant. Created on first contact and never removed.
///
/// Encoded as `[id, x, y, d, name, color, bgcolor, points, ts]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    /// Last known cursor position in table space.
    pub x: f64,
    pub y: f64,
    /// Mouse button state, `0` or `1`.
    pub d: u8,
    pub name: Option<String>,
    pub color: Option<String>,
    pub bgcolor: Option<String>,
    pub points: u64,
    /// Last activity timestamp (ms).
    pub ts: u64,
}

impl Player {
    pub fn new(id: PlayerId, ts: u64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            d: 0,
            name: None,
            color: None,
            bgcolor: None,
            points: 0,
            ts,
        }
    }

    /// Whether the player did anything within `window_ms` of `now`.
    pub fn is_active(&self, now: u64, window_ms: u64) -> bool {
        now.saturating_sub(self.ts) < window_ms
    }

    pub fn encode(&self) -> Value {
        json!([
            self.id.as_str(),
            self.x,
            self.y,
            self.d,
            self.name,
            self.color,
            self.bgcolor,
            self.points,
            self.ts
        ])
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        const WHAT: &str = "player";
        let items = array(value, WHAT)?;
        Ok(Self {
            id: PlayerId::new(str_at(items, 0, WHAT)?),
            x: f64_at(items, 1, WHAT)?,
            y: f64_at(items, 2, WHAT)?,
            d: u8::from(u64_at(items, 3, WHAT)? != 0),
            name: opt_str_at(items, 4, WHAT)?,
            color: opt_str_at(items, 5, WHAT)?,
            bgcolor: opt_str_at(items, 6, WHAT)?,
            points: u64_at(items, 7, WHAT)?,
            ts: u64_at(items, 8, WHAT)?,
        })
    }
}

wire_serde!(Player);

// ---------------------------------------------------------------------------
// PuzzleData
// ---------------------------------------------------------------------------

/// Mutable per-game counters.
///
/// `max_z` and `max_group` only ever grow. `finished` is `0` until the
/// last piece is finished and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleData {
    pub started: u64,
    pub finished: u64,
    pub max_z: i64,
    pub max_group: u64,
}

impl PuzzleData {
    pub fn is_finished(&self) -> bool {
        self.finished != 0
    }
}
