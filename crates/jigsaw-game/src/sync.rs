//! Client-side prediction reconciliation.
//!
//! A client applies its own inputs immediately and tags each one with a
//! local sequence number. When the server echoes an event carrying the
//! client's own id and a sequence number still pending, the client already
//! has that state and drops the echo. Everything else is applied.

use std::collections::BTreeMap;

use jigsaw_protocol::{ClientMessage, Input, PlayerId, ServerMessage};

use crate::{Game, GameError};

/// Sequence bookkeeping for one client connection.
#[derive(Debug, Clone)]
pub struct ClientSync {
    client_id: PlayerId,
    last_seq: u64,
    pending: BTreeMap<u64, Input>,
}

impl ClientSync {
    pub fn new(client_id: PlayerId) -> Self {
        Self {
            client_id,
            last_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn client_id(&self) -> &PlayerId {
        &self.client_id
    }

    /// Inputs sent but not yet echoed back.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Applies `input` to the local copy and returns the message to send.
    pub fn submit(&mut self, game: &mut Game, input: Input, ts: u64) -> Result<ClientMessage, GameError> {
        game.handle_input(&self.client_id, &input, ts)?;
        self.last_seq += 1;
        self.pending.insert(self.last_seq, input.clone());
        Ok(ClientMessage::Event {
            client_seq: self.last_seq,
            input,
        })
    }

    /// Handles a server message against the local copy.
    ///
    /// Returns `true` if the local game changed. `SERVER_INIT` replaces
    /// the local game wholesale and clears pending inputs.
    pub fn receive(&mut self, game: &mut Game, msg: &ServerMessage) -> Result<bool, GameError> {
        match msg {
            ServerMessage::Init(encoded) => {
                *game = Game::decode(encoded.clone())?;
                self.pending.clear();
                Ok(true)
            }
            ServerMessage::Event { client_id, client_seq, changes } => {
                if client_id == &self.client_id && self.pending.remove(client_seq).is_some() {
                    return Ok(false);
                }
                game.apply_changes(changes, Some(&self.client_id));
                Ok(true)
            }
            ServerMessage::Error { code, message } => {
                tracing::warn!(client_id = %self.client_id, code, %message, "server rejected message");
                Ok(false)
            }
        }
    }
}
