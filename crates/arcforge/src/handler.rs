//! Per-connection handler: handshake, auth, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a small pump task draining its outbound queue. The flow is:
//!   1. Receive Handshake → validate version → authenticate
//!   2. Send HandshakeAck → player is connected, register with the hub
//!   3. Loop: receive envelopes → dispatch system messages or session events

use std::sync::Arc;
use std::time::{Duration, Instant};

use arcforge_protocol::{
    Action, Channel, Codec, Envelope, Payload, PlayerId, SessionEvent, SystemMessage,
};
use arcforge_session::Authenticator;
use arcforge_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{ServerState, PROTOCOL_VERSION};
use crate::ArcforgeError;

/// Drop guard that tears a player's session and room membership down
/// when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
struct SessionGuard<A: Authenticator, C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for SessionGuard<A, C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        state.hub.unregister(player_id);
        tokio::spawn(async move {
            let mut sessions = state.sessions.lock().await;
            let _ = sessions.disconnect(player_id);
            drop(sessions);
            if let Err(e) = state.coordinator.disconnect(player_id).await {
                tracing::debug!(%player_id, error = %e, "disconnect cleanup");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), ArcforgeError>
where
    A: Authenticator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Handshake ---
    let player_id = perform_handshake(&conn, &state).await?;

    tracing::info!(%conn_id, %player_id, "player authenticated");

    // Create session and guard atomically — if session creation fails,
    // no guard is needed. If it succeeds, the guard is immediately active.
    {
        let mut sessions = state.sessions.lock().await;
        sessions.create(player_id).map_err(ArcforgeError::Session)?;
    }
    state.coordinator.connect(player_id).await;

    // Outbound pump: the coordinator's broadcaster writes pre-encoded
    // bytes into this channel; we own the only thing allowed to call
    // `conn.send`, so the recv loop below and this pump never race on
    // the socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    state.hub.register(player_id, tx);
    let pump_conn = Arc::clone(&conn);
    let pump = tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            if pump_conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });

    let _guard = SessionGuard {
        player_id,
        state: Arc::clone(&state),
    };

    // --- Step 2: Message loop ---
    let mut seq: u64 = 1;
    let start = Instant::now();

    loop {
        let data = match tokio::time::timeout(Duration::from_secs(15), conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        match envelope.payload {
            Payload::System(sys_msg) => {
                let should_close =
                    handle_system_message(&conn, &state, player_id, sys_msg, &mut seq, &start)
                        .await?;
                if should_close {
                    break;
                }
            }
            Payload::Session(event) => {
                handle_session_event(&conn, &state, player_id, event, &mut seq, &start).await?;
            }
        }
    }

    pump.abort();
    // _guard drops here → session and coordinator cleanup fire.
    Ok(())
}

/// Performs the initial handshake: receive Handshake, validate, auth, send Ack.
async fn perform_handshake<A, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, C>>,
) -> Result<PlayerId, ArcforgeError>
where
    A: Authenticator,
    C: Codec,
{
    let start = Instant::now();

    let data = match tokio::time::timeout(Duration::from_secs(5), conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ArcforgeError::Protocol(
                arcforge_protocol::ProtocolError::InvalidMessage(
                    "connection closed before handshake".into(),
                ),
            ));
        }
        Ok(Err(e)) => return Err(ArcforgeError::Transport(e)),
        Err(_) => {
            return Err(ArcforgeError::Protocol(
                arcforge_protocol::ProtocolError::InvalidMessage("handshake timed out".into()),
            ));
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let (version, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => (version, token),
        _ => {
            send_error(conn, &state.codec, 400, "expected Handshake", 0, &start).await?;
            return Err(ArcforgeError::Protocol(
                arcforge_protocol::ProtocolError::InvalidMessage(
                    "first message must be Handshake".into(),
                ),
            ));
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            0,
            &start,
        )
        .await?;
        return Err(ArcforgeError::Protocol(
            arcforge_protocol::ProtocolError::InvalidMessage(
                "protocol version mismatch".into(),
            ),
        ));
    }

    let token_str = token.as_deref().unwrap_or("");
    let player_id = match state.auth.authenticate(token_str).await {
        Ok(pid) => pid,
        Err(e) => {
            send_error(conn, &state.codec, 401, "unauthorized", 0, &start).await?;
            return Err(ArcforgeError::Session(e));
        }
    };

    let ack = Envelope {
        seq: 0,
        timestamp: start.elapsed().as_millis() as u64,
        channel: Channel::ReliableOrdered,
        payload: Payload::System(SystemMessage::HandshakeAck {
            player_id,
            server_time: start.elapsed().as_millis() as u64,
        }),
    };
    let ack_bytes = state.codec.encode(&ack)?;
    conn.send(&ack_bytes).await.map_err(ArcforgeError::Transport)?;

    Ok(player_id)
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<A, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, C>>,
    player_id: PlayerId,
    msg: SystemMessage,
    seq: &mut u64,
    start: &Instant,
) -> Result<bool, ArcforgeError>
where
    A: Authenticator,
    C: Codec,
{
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            let ack = Envelope {
                seq: next_seq(seq),
                timestamp: start.elapsed().as_millis() as u64,
                channel: Channel::ReliableOrdered,
                payload: Payload::System(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: start.elapsed().as_millis() as u64,
                }),
            };
            let bytes = state.codec.encode(&ack)?;
            conn.send(&bytes).await.map_err(ArcforgeError::Transport)?;
        }

        SystemMessage::Disconnect { reason } => {
            tracing::info!(%player_id, %reason, "client disconnected");
            return Ok(true);
        }

        _ => {
            tracing::debug!(%player_id, "ignoring unexpected system message");
        }
    }

    Ok(false)
}

/// Handles a matchmaking or gameplay event by delegating to the
/// coordinator. The coordinator does its own broadcasting on success;
/// here we only need to surface failures back to the sender.
async fn handle_session_event<A, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, C>>,
    player_id: PlayerId,
    event: SessionEvent,
    seq: &mut u64,
    start: &Instant,
) -> Result<(), ArcforgeError>
where
    A: Authenticator,
    C: Codec,
{
    let result = match event {
        SessionEvent::Create { game_kind, params } => {
            state.coordinator.create(player_id, &game_kind, params).await
        }
        SessionEvent::Join {
            game_kind,
            create_if_not_found,
            params,
        } => {
            state
                .coordinator
                .join(player_id, &game_kind, create_if_not_found, params)
                .await
        }
        SessionEvent::Leave => state.coordinator.leave(player_id).await,
        SessionEvent::Action { action } => coordinator_action(state, player_id, action).await,
        // The remaining variants are server→client only; a client
        // sending one is a protocol violation, not a crash.
        other => {
            tracing::debug!(%player_id, event = ?other, "ignoring server-only session event from client");
            return Ok(());
        }
    };

    if let Err(e) = result {
        send_error(conn, &state.codec, 400, &e.to_string(), next_seq(seq), start).await?;
    }

    Ok(())
}

async fn coordinator_action<A, C>(
    state: &Arc<ServerState<A, C>>,
    player_id: PlayerId,
    action: Action,
) -> Result<(), arcforge_room::CoreError>
where
    A: Authenticator,
    C: Codec,
{
    state.coordinator.action(player_id, action).await
}

/// Sends a SystemMessage::Error envelope to the client.
async fn send_error(
    conn: &Arc<WebSocketConnection>,
    codec: &impl Codec,
    code: u16,
    message: &str,
    seq: u64,
    start: &Instant,
) -> Result<(), ArcforgeError> {
    let envelope = Envelope {
        seq,
        timestamp: start.elapsed().as_millis() as u64,
        channel: Channel::ReliableOrdered,
        payload: Payload::System(SystemMessage::Error {
            code,
            message: message.to_string(),
        }),
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await.map_err(ArcforgeError::Transport)?;
    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
