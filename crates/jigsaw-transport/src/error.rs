use std::io;

#[cfg(feature = "websocket")]
use tokio_tungstenite::tungstenite;

/// Socket-level failures. None of these carry game meaning; the server
/// treats any of them as the end of that one connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("tcp accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The peer connected but the upgrade request was not a valid
    /// WebSocket handshake.
    #[cfg(feature = "websocket")]
    #[error("handshake with {peer} failed: {source}")]
    Handshake {
        peer: std::net::SocketAddr,
        #[source]
        source: Box<tungstenite::Error>,
    },

    #[cfg(feature = "websocket")]
    #[error("websocket error on {conn}: {source}")]
    Socket {
        conn: crate::ConnectionId,
        #[source]
        source: Box<tungstenite::Error>,
    },
}
