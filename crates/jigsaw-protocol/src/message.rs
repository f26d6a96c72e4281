//! Change-sets and the client/server message envelopes.

use serde_json::{Value, json};

use crate::wire::{array, slot, str_at, u64_at};
use crate::{Input, Piece, Player, PlayerId, ProtocolError, PuzzleData};

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

const CHANGE_DATA: u64 = 1;
const CHANGE_PIECE: u64 = 2;
const CHANGE_PLAYER: u64 = 3;
const CHANGE_SNAP: u64 = 4;

/// One entry of a change-set produced by a single input.
///
/// Data, piece and player changes carry the full new value of what they
/// touched, so applying them is a plain overwrite.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Data(PuzzleData),
    Piece(Piece),
    Player(Player),
    /// A snap happened for this player (sound cue only).
    Snap(PlayerId),
}

impl Change {
    pub fn encode(&self) -> Value {
        match self {
            Change::Data(data) => json!([CHANGE_DATA, data]),
            Change::Piece(piece) => json!([CHANGE_PIECE, piece.encode()]),
            Change::Player(player) => json!([CHANGE_PLAYER, player.encode()]),
            Change::Snap(id) => json!([CHANGE_SNAP, id.as_str()]),
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        const WHAT: &str = "change";
        let items = array(value, WHAT)?;
        let payload = slot(items, 1, WHAT)?;
        match u64_at(items, 0, WHAT)? {
            CHANGE_DATA => serde_json::from_value(payload.clone())
                .map(Change::Data)
                .map_err(ProtocolError::Decode),
            CHANGE_PIECE => Piece::decode(payload).map(Change::Piece),
            CHANGE_PLAYER => Player::decode(payload).map(Change::Player),
            CHANGE_SNAP => Ok(Change::Snap(PlayerId::new(str_at(items, 1, WHAT)?))),
            other => Err(ProtocolError::invalid(format!("unknown change tag {other}"))),
        }
    }
}

wire_serde!(Change);

fn encode_changes(changes: &[Change]) -> Value {
    Value::Array(changes.iter().map(Change::encode).collect())
}

fn decode_changes(value: &Value) -> Result<Vec<Change>, ProtocolError> {
    array(value, "changes")?.iter().map(Change::decode).collect()
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

const SERVER_EVENT: u64 = 1;
const CLIENT_EVENT: u64 = 2;
const CLIENT_INIT: u64 = 3;
const SERVER_INIT: u64 = 4;
const SERVER_ERROR: u64 = 5;

/// Client → server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `[3]`: "send me the game". Registers the player and the socket.
    Init,
    /// `[2, clientSeq, input]`.
    Event { client_seq: u64, input: Input },
}

impl ClientMessage {
    pub fn encode(&self) -> Value {
        match self {
            ClientMessage::Init => json!([CLIENT_INIT]),
            ClientMessage::Event { client_seq, input } => {
                json!([CLIENT_EVENT, client_seq, input.encode()])
            }
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        const WHAT: &str = "client message";
        let items = array(value, WHAT)?;
        match u64_at(items, 0, WHAT)? {
            CLIENT_INIT => Ok(ClientMessage::Init),
            CLIENT_EVENT => Ok(ClientMessage::Event {
                client_seq: u64_at(items, 1, WHAT)?,
                input: Input::decode(slot(items, 2, WHAT)?)?,
            }),
            other => Err(ProtocolError::invalid(format!(
                "unknown client message tag {other}"
            ))),
        }
    }
}

wire_serde!(ClientMessage);

/// Server → client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// `[4, encodedGame]`: full snapshot, always sent before any deltas.
    Init(Value),
    /// `[1, actingClientId, clientSeq, changes]`.
    Event {
        client_id: PlayerId,
        client_seq: u64,
        changes: Vec<Change>,
    },
    /// `[5, code, message]`: a message from this socket was rejected.
    /// `code` follows HTTP conventions (400 bad message, 404 unknown game).
    Error { code: u16, message: String },
}

impl ServerMessage {
    pub fn encode(&self) -> Value {
        match self {
            ServerMessage::Init(game) => json!([SERVER_INIT, game]),
            ServerMessage::Event { client_id, client_seq, changes } => json!([
                SERVER_EVENT,
                client_id.as_str(),
                client_seq,
                encode_changes(changes)
            ]),
            ServerMessage::Error { code, message } => json!([SERVER_ERROR, code, message]),
        }
    }

    pub fn decode(value: &Value) -> Result<Self, ProtocolError> {
        const WHAT: &str = "server message";
        let items = array(value, WHAT)?;
        match u64_at(items, 0, WHAT)? {
            SERVER_INIT => Ok(ServerMessage::Init(slot(items, 1, WHAT)?.clone())),
            SERVER_EVENT => Ok(ServerMessage::Event {
                client_id: PlayerId::new(str_at(items, 1, WHAT)?),
                client_seq: u64_at(items, 2, WHAT)?,
                changes: decode_changes(slot(items, 3, WHAT)?)?,
            }),
            SERVER_ERROR => Ok(ServerMessage::Error {
                code: u16::try_from(u64_at(items, 1, WHAT)?)
                    .map_err(|_| ProtocolError::invalid("error code out of range"))?,
                message: str_at(items, 2, WHAT)?.to_owned(),
            }),
            other => Err(ProtocolError::invalid(format!(
                "unknown server message tag {other}"
            ))),
        }
    }
}

wire_serde!(ServerMessage);
