//! Per-connection handler: query parsing, message routing and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Read `game` and `client` from the request query string
//!   2. Spawn a writer task that drains the socket's outbound channel
//!   3. Loop: decode client messages → forward to the game actor
//!   4. On close: tell the game, so the player's held pieces are released
//!
//! Failures inside the loop are answered with a `SERVER_ERROR` frame and
//! never end the connection.

use std::sync::Arc;

use jigsaw_protocol::{ClientMessage, Codec, GameId, PlayerId, ServerMessage};
use jigsaw_replay::ReplayStore;
use jigsaw_room::{RoomError, RoomHandle, Socket, SocketId, SocketSender, Storage, now_ms};
use jigsaw_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::JigsawError;
use crate::server::ServerState;

/// Game and client ids from a request path like `/?game=abc&client=p1`.
pub(crate) fn parse_query(path: &str) -> Result<(GameId, PlayerId), String> {
    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut game = None;
    let mut client = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("game", value)) => game = Some(value),
            Some(("client", value)) => client = Some(value),
            _ => {}
        }
    }

    let game = GameId::new(game.ok_or("missing game id")?);
    if !game.is_valid() {
        return Err(format!("invalid game id {:?}", game.as_str()));
    }
    let client = client.filter(|c| !c.is_empty()).ok_or("missing client id")?;
    Ok((game, PlayerId::new(client)))
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, R>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, R>>,
) -> Result<(), JigsawError>
where
    S: Storage,
    R: ReplayStore,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    let (game_id, player_id) = match parse_query(conn.path()) {
        Ok(ids) => ids,
        Err(reason) => {
            tracing::debug!(%conn_id, %reason, "rejecting connection");
            let frame = state.codec.encode(&ServerMessage::Error {
                code: 400,
                message: reason,
            })?;
            conn.send(&frame).await?;
            conn.close().await?;
            return Ok(());
        }
    };
    tracing::debug!(%conn_id, %game_id, %player_id, "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), state.codec, rx));
    let socket = Socket {
        id: SocketId(conn_id.0),
        player_id,
        sender: tx.clone(),
    };

    let mut room: Option<RoomHandle> = None;
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode client message");
                send_error(&tx, 400, format!("invalid message: {e}"));
                continue;
            }
        };

        if let Err(e) = dispatch(&state, &game_id, &socket, &mut room, &msg).await {
            tracing::warn!(%conn_id, %game_id, error = %e, "message failed");
            send_error(&tx, e.code(), e.to_string());
        }
    }

    if let Some(handle) = room {
        if let Err(e) = handle.leave(socket, now_ms()).await {
            tracing::debug!(%conn_id, %game_id, error = %e, "leave after close failed");
        }
    }
    writer.abort();
    Ok(())
}

/// Forwards one message to the game actor. If the actor stopped since
/// the handle was cached (idle unload), the game is loaded again and the
/// message retried once.
async fn dispatch<S, R>(
    state: &ServerState<S, R>,
    game_id: &GameId,
    socket: &Socket,
    room: &mut Option<RoomHandle>,
    msg: &ClientMessage,
) -> Result<(), RoomError>
where
    S: Storage,
    R: ReplayStore,
{
    let mut retried = false;
    loop {
        let handle = match room.as_ref().filter(|h| !h.is_closed()) {
            Some(handle) => handle.clone(),
            None => {
                let handle = load_room(state, game_id).await?;
                *room = Some(handle.clone());
                handle
            }
        };

        let result = match msg {
            ClientMessage::Init => handle.init(socket.clone(), now_ms()).await,
            ClientMessage::Event { client_seq, input } => {
                handle
                    .send_event(socket.clone(), *client_seq, input.clone(), now_ms())
                    .await
            }
        };

        match result {
            Err(RoomError::Unavailable(_)) if !retried => {
                retried = true;
                *room = None;
            }
            other => return other,
        }
    }
}

/// The registry lock is only held for the lookup and the insert; reading
/// the game from disk happens without it, so other games stay reachable.
async fn load_room<S, R>(state: &ServerState<S, R>, game_id: &GameId) -> Result<RoomHandle, RoomError>
where
    S: Storage,
    R: ReplayStore,
{
    let loader = {
        let mut registry = state.registry.lock().await;
        if let Some(handle) = registry.loaded(game_id) {
            return Ok(handle);
        }
        registry.loader()
    };
    let (game, log) = loader.load(game_id).await?;
    Ok(state.registry.lock().await.insert_loaded(game, log))
}

/// Drains the socket's outbound channel onto the connection.
async fn write_frames<C: Codec>(
    conn: Arc<WebSocketConnection>,
    codec: C,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let frame = match codec.encode(&msg) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode server message");
                continue;
            }
        };
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Queues a `SERVER_ERROR` frame behind whatever the socket already has
/// pending.
fn send_error(tx: &SocketSender, code: u16, message: String) {
    let _ = tx.send(ServerMessage::Error { code, message });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_reads_game_and_client() {
        let (game, client) = parse_query("/?game=abc123&client=p1").unwrap();
        assert_eq!(game, GameId::new("abc123"));
        assert_eq!(client, PlayerId::new("p1"));
    }

    #[test]
    fn test_parse_query_ignores_order_and_extra_params() {
        let (game, client) = parse_query("/play?v=2&client=x&game=g-1").unwrap();
        assert_eq!(game, GameId::new("g-1"));
        assert_eq!(client, PlayerId::new("x"));
    }

    #[test]
    fn test_parse_query_rejects_missing_ids() {
        assert!(parse_query("/").is_err());
        assert!(parse_query("/?game=abc").is_err());
        assert!(parse_query("/?game=abc&client=").is_err());
        assert!(parse_query("/?client=p1").is_err());
    }

    #[test]
    fn test_parse_query_rejects_invalid_game_id() {
        let err = parse_query("/?game=../etc&client=p1").unwrap_err();
        assert!(err.contains("invalid game id"));
    }
}
