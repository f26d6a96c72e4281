//! Socket plumbing for the jigsaw server.
//!
//! The game layers above only see whole frames: a client message comes in
//! as one frame and every server message goes out as one. [`Transport`]
//! hands out [`Connection`]s; each connection remembers the request URI it
//! was opened with, because that is where the browser puts the game and
//! client ids (`/?game=abc&client=p1`).
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] over `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Process-unique number of an accepted connection. Shows up in logs as
/// `conn-N` and doubles as the room's socket id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and finishes its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One client socket.
///
/// Reading and writing are independent: a task parked in
/// [`recv`](Self::recv) never holds up [`send`](Self::send) from another.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame. Valid UTF-8 goes out as a text frame, anything
    /// else as binary.
    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Next data frame, skipping control frames. `Ok(None)` once the peer
    /// has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;

    /// Path and query of the upgrade request.
    fn path(&self) -> &str;
}
