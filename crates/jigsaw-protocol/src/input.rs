//! Player inputs: `[tag, ...args]`.

use serde_json::{Value, json};

use crate::ProtocolError;
use crate::wire::{array, f64_at, flag_at, str_at, u64_at};

const MOUSE_DOWN: u64 = 1;
const MOUSE_UP: u64 = 2;
const MOUSE_MOVE: u64 = 3;
const ZOOM_IN: u64 = 4;
const ZOOM_OUT: u64 = 5;
const BG_COLOR: u64 = 6;
const PLAYER_COLOR: u64 = 7;
const PLAYER_NAME: u64 = 8;
const PAN: u64 = 9;
const CONNECTION_CLOSE: u64 = 10;

/// One player input, in table coordinates.
///
/// Unknown tags are kept as [`Input::Other`] instead of being rejected:
/// the game answers them by refreshing the player's activity timestamp,
/// and the event log records them verbatim so a replay stays faithful.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    MouseDown { x: f64, y: f64 },
    MouseUp { x: f64, y: f64 },
    MouseMove { x: f64, y: f64, dx: f64, dy: f64, down: bool },
    ZoomIn { x: f64, y: f64 },
    ZoomOut { x: f64, y: f64 },
    BgColor(String),
    PlayerColor(String),
    PlayerName(String),
    /// Moves the player's view; the cursor shifts by `(-dx, -dy)`.
    Pan { dx: f64, dy: f64 },
    /// Synthetic input injected by the server when a socket closes.
    ConnectionClose,
    Other { tag: u64, args: Vec<Value> },
}

impl Input {
    pub fn tag(&self) -> u64 {
        match self {
            Input::MouseDown { .. } => MOUSE_DOWN,
            Input::MouseUp { .. } => MOUSE_UP,
            Input::MouseMove { .. } => MOUSE_MOVE,
            Input::ZoomIn { .. } => ZOOM_IN,
            Input::ZoomOut { .. } => ZOOM_OUT,
            Input::BgColor(_) => BG_COLOR,
            Input::PlayerColor(_) => PLAYER_COLOR,
            Input::PlayerName(_) => PLAYER_NAME,
            Input::Pan { .. } => PAN,
            Input::ConnectionClose => CONNECTION_CLOSE,
            Input::Other { tag, .. } => *tag,
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            Input::MouseDown { x, y } => json!([MOUSE_DOWN, x, y]),
            Input::MouseUp { x, y } => json!([MOUSE_UP, x, y]),
            Input::MouseMove { x, y, dx, dy, down } => {
                json!([MOUSE_MOVE, x, y, dx, dy, u8::from(*down)])
            }
            Input::ZoomIn { x, y } => json!([ZOOM_IN, x, y]),
            Input::ZoomOut { x, y } => json!([ZOOM_OUT, x, y]),
            Input::BgColor(v) => json!([BG_COLOR, v]),
            Input::PlayerColor(v) => json!([PLAYER_COLOR, v]),
            Input::PlayerName(v) => json!([PLAYER_NAME, v]),
            Input::Pan { dx, dy } => json!([PAN, dx, dy]),
            Input::ConnectionClose => json!([CONNECTION_CLOSE]),
            Input::Other { tag, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(json!(tag));
                items.extend(args.iter().cloned());
                Value::Array(items)
            }
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        const WHAT: &str = "input";
        let items = array(value, WHAT)?;
        let tag = u64_at(items, 0, WHAT)?;
        let point = || -> Result<(f64, f64), ProtocolError> {
            Ok((f64_at(items, 1, WHAT)?, f64_at(items, 2, WHAT)?))
        };

        let input = match tag {
            MOUSE_DOWN => {
                let (x, y) = point()?;
                Input::MouseDown { x, y }
            }
            MOUSE_UP => {
                let (x, y) = point()?;
                Input::MouseUp { x, y }
            }
            MOUSE_MOVE => {
                let (x, y) = point()?;
                Input::MouseMove {
                    x,
                    y,
                    dx: f64_at(items, 3, WHAT)?,
                    dy: f64_at(items, 4, WHAT)?,
                    down: flag_at(items, 5),
                }
            }
            ZOOM_IN => {
                let (x, y) = point()?;
                Input::ZoomIn { x, y }
            }
            ZOOM_OUT => {
                let (x, y) = point()?;
                Input::ZoomOut { x, y }
            }
            BG_COLOR => Input::BgColor(str_at(items, 1, WHAT)?.to_owned()),
            PLAYER_COLOR => Input::PlayerColor(str_at(items, 1, WHAT)?.to_owned()),
            PLAYER_NAME => Input::PlayerName(str_at(items, 1, WHAT)?.to_owned()),
            PAN => {
                let (dx, dy) = point()?;
                Input::Pan { dx, dy }
            }
            CONNECTION_CLOSE => Input::ConnectionClose,
            tag => Input::Other {
                tag,
                args: items[1..].to_vec(),
            },
        };
        Ok(input)
    }
}

wire_serde!(Input);
