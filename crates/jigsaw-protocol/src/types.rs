//! Identity types and game modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a puzzle game.
///
/// Newtype over the id string so a `GameId` can't be passed where a
/// `PlayerId` is expected. `#[serde(transparent)]` keeps it a plain JSON
/// string on the wire and in stored games.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 1 to 64 ASCII alphanumerics, `-` or `_`. Only such ids name files
    /// on disk or are accepted from a connection.
    pub fn is_valid(&self) -> bool {
        (1..=64).contains(&self.0.len())
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The stable client id of a player.
///
/// This is chosen by the client and survives reconnects, which is what
/// lets a player keep their points and cursor across sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

// Modes travel as small integers (log header, encoded game) and are parsed
// from lowercase names on the command line.
macro_rules! numeric_mode {
    ($ty:ident { $($variant:ident = $n:literal => $name:literal),+ $(,)? }) => {
        impl From<$ty> for u8 {
            fn from(mode: $ty) -> u8 {
                match mode {
                    $($ty::$variant => $n,)+
                }
            }
        }

        impl TryFrom<u8> for $ty {
            type Error = ProtocolError;

            fn try_from(n: u8) -> Result<Self, Self::Error> {
                match n {
                    $($n => Ok($ty::$variant),)+
                    other => Err(ProtocolError::invalid(format!(
                        concat!("unknown ", stringify!($ty), " {}"),
                        other
                    ))),
                }
            }
        }

        impl FromStr for $ty {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ProtocolError::invalid(format!(
                        concat!("unknown ", stringify!($ty), " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str($name),)+
                }
            }
        }
    };
}

/// How points are awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ScoreMode {
    /// Points only for pieces that reach their final position
    /// (one point per piece).
    #[default]
    Final,
    /// One point for every successful snap, final or neighbor.
    Any,
}

numeric_mode!(ScoreMode { Final = 0 => "final", Any = 1 => "any" });

/// Which tab shapes an inner edge may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ShapeMode {
    /// Every inner edge is a tab or a blank.
    #[default]
    Normal,
    /// Inner edges may also be flat.
    Any,
    /// Every edge is flat (square pieces).
    Flat,
}

numeric_mode!(ShapeMode { Normal = 0 => "normal", Any = 1 => "any", Flat = 2 => "flat" });

impl ShapeMode {
    /// The tab values an inner edge may be drawn from.
    pub fn tabs(self) -> &'static [i8] {
        match self {
            ShapeMode::Normal => &[-1, 1],
            ShapeMode::Any => &[-1, 0, 1],
            ShapeMode::Flat => &[0],
        }
    }
}

/// Whether final-position snapping is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SnapMode {
    #[default]
    Normal,
    /// A group may only snap to its final position if it contains a
    /// corner piece.
    Real,
}

numeric_mode!(SnapMode { Normal = 0 => "normal", Real = 1 => "real" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_game_id_display() {
        assert_eq!(GameId::new("g-1").to_string(), "g-1");
    }

    #[test]
    fn test_game_id_validity() {
        assert!(GameId::new("abc-123_X").is_valid());
        assert!(!GameId::new("").is_valid());
        assert!(!GameId::new("../etc").is_valid());
        assert!(!GameId::new("a".repeat(65)).is_valid());
    }

    #[test]
    fn test_modes_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&ScoreMode::Any).unwrap(), "1");
        assert_eq!(serde_json::to_string(&ShapeMode::Flat).unwrap(), "2");
        assert_eq!(serde_json::to_string(&SnapMode::Real).unwrap(), "1");
    }

    #[test]
    fn test_mode_deserialize_rejects_unknown_number() {
        let result: Result<ShapeMode, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_from_str_is_case_insensitive() {
        assert_eq!("REAL".parse::<SnapMode>().unwrap(), SnapMode::Real);
        assert_eq!("any".parse::<ScoreMode>().unwrap(), ScoreMode::Any);
        assert!("diagonal".parse::<ShapeMode>().is_err());
    }

    #[test]
    fn test_shape_mode_tab_sets() {
        assert_eq!(ShapeMode::Normal.tabs(), &[-1, 1]);
        assert_eq!(ShapeMode::Any.tabs(), &[-1, 0, 1]);
        assert_eq!(ShapeMode::Flat.tabs(), &[0]);
    }
}
