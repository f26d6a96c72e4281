//! Log records: `[tag, ...args]`, one per line.
//!
//! ```text
//! header         [1, gameVersion, targetPieces, image, createdTs, score, shape, snap, creatorId, private]
//! add player     [2, playerId, dt]
//! handle input   [3, playerIndex, input, dt]
//! update player  [4, playerIndex, dt]
//! ```
//!
//! `createdTs` is absolute; every `dt` is the delta to the previous
//! record's timestamp.

use jigsaw_game::GameParams;
use jigsaw_protocol::{Input, PlayerId, ScoreMode, ShapeMode, SnapMode};
use jigsaw_puzzle::ImageInfo;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::ReplayError;

const HEADER: u64 = 1;
const ADD_PLAYER: u64 = 2;
const HANDLE_INPUT: u64 = 3;
const UPDATE_PLAYER: u64 = 4;

/// Everything needed to regenerate the puzzle.
#[derive(Debug, Clone, PartialEq)]
pub struct LogHeader {
    pub created: u64,
    pub params: GameParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Header(LogHeader),
    /// First appearance of a player. Its index is its position in
    /// the order of `AddPlayer` records.
    AddPlayer { player_id: PlayerId, dt: u64 },
    /// A known player reconnected or re-initialized.
    UpdatePlayer { index: usize, dt: u64 },
    HandleInput { index: usize, input: Input, dt: u64 },
}

type HeaderTuple = (
    u64,
    u32,
    u32,
    ImageInfo,
    u64,
    ScoreMode,
    ShapeMode,
    SnapMode,
    Option<PlayerId>,
    bool,
);

fn tuple<T: DeserializeOwned>(value: &Value) -> Result<T, ReplayError> {
    serde_json::from_value(value.clone()).map_err(|e| ReplayError::MalformedRecord(e.to_string()))
}

impl LogRecord {
    /// Delta to the previous record. `None` for the header.
    pub fn dt(&self) -> Option<u64> {
        match self {
            LogRecord::Header(_) => None,
            LogRecord::AddPlayer { dt, .. }
            | LogRecord::UpdatePlayer { dt, .. }
            | LogRecord::HandleInput { dt, .. } => Some(*dt),
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            LogRecord::Header(LogHeader { created, params }) => json!([
                HEADER,
                params.game_version,
                params.target_pieces,
                params.image,
                created,
                params.score_mode,
                params.shape_mode,
                params.snap_mode,
                params.creator_id,
                params.private,
            ]),
            LogRecord::AddPlayer { player_id, dt } => json!([ADD_PLAYER, player_id, dt]),
            LogRecord::HandleInput { index, input, dt } => {
                json!([HANDLE_INPUT, index, input.encode(), dt])
            }
            LogRecord::UpdatePlayer { index, dt } => json!([UPDATE_PLAYER, index, dt]),
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ReplayError> {
        let tag = value
            .get(0)
            .and_then(Value::as_u64)
            .ok_or_else(|| ReplayError::MalformedRecord(format!("no record tag in {value}")))?;

        let record = match tag {
            HEADER => {
                let (_, game_version, target_pieces, image, created, score_mode, shape_mode, snap_mode, creator_id, private): HeaderTuple =
                    tuple(value)?;
                LogRecord::Header(LogHeader {
                    created,
                    params: GameParams {
                        game_version,
                        target_pieces,
                        image,
                        score_mode,
                        shape_mode,
                        snap_mode,
                        creator_id,
                        private,
                    },
                })
            }
            ADD_PLAYER => {
                let (_, player_id, dt): (u64, PlayerId, u64) = tuple(value)?;
                LogRecord::AddPlayer { player_id, dt }
            }
            HANDLE_INPUT => {
                let (_, index, input, dt): (u64, usize, Input, u64) = tuple(value)?;
                LogRecord::HandleInput { index, input, dt }
            }
            UPDATE_PLAYER => {
                let (_, index, dt): (u64, usize, u64) = tuple(value)?;
                LogRecord::UpdatePlayer { index, dt }
            }
            other => return Err(ReplayError::MalformedRecord(format!("unknown record tag {other}"))),
        };
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> LogRecord {
        let mut params = GameParams::new(
            100,
            ImageInfo {
                width: 1000,
                height: 750,
                stable_ref: "img/9.jpg".into(),
            },
        );
        params.score_mode = ScoreMode::Any;
        params.creator_id = Some(PlayerId::new("host"));
        LogRecord::Header(LogHeader { created: 1_700_000_000_000, params })
    }

    #[test]
    fn test_header_wire_layout() {
        let encoded = header().encode();
        assert_eq!(
            encoded,
            json!([1, 3, 100, {"width": 1000, "height": 750, "stableRef": "img/9.jpg"}, 1_700_000_000_000u64, 1, 0, 0, "host", false])
        );
        assert_eq!(LogRecord::decode(&encoded).unwrap(), header());
    }

    #[test]
    fn test_input_record_wire_layout() {
        let record = LogRecord::HandleInput {
            index: 2,
            input: Input::MouseUp { x: 1.5, y: 2.0 },
            dt: 40,
        };
        let encoded = record.encode();
        assert_eq!(encoded, json!([3, 2, [2, 1.5, 2.0], 40]));
        assert_eq!(LogRecord::decode(&encoded).unwrap(), record);
        assert_eq!(record.dt(), Some(40));
    }

    #[test]
    fn test_player_records_decode() {
        assert_eq!(
            LogRecord::decode(&json!([2, "p1", 0])).unwrap(),
            LogRecord::AddPlayer { player_id: PlayerId::new("p1"), dt: 0 }
        );
        assert_eq!(
            LogRecord::decode(&json!([4, 0, 1500])).unwrap(),
            LogRecord::UpdatePlayer { index: 0, dt: 1500 }
        );
    }

    #[test]
    fn test_decode_rejects_malformed_records() {
        for bad in [json!(null), json!([]), json!([9, 1]), json!([2, 5, 0]), json!([3, 0, [1, 1.0, 2.0]])] {
            assert!(
                matches!(LogRecord::decode(&bad), Err(ReplayError::MalformedRecord(_))),
                "{bad} should be malformed"
            );
        }
    }
}
