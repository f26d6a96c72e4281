//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// A `ProtocolError` always means the bytes or the tuple shape were
/// wrong. It never says anything about game state: an input for an
/// unknown player decodes fine and is rejected later by the game layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, truncated frames, or a
    /// tuple that does not match the expected layout.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed as JSON but violates the tuple layout, for
    /// example a piece tuple with five entries or an unknown message tag.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidMessage(what.into())
    }
}
