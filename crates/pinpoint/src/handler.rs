//! Per-connection handler: handshake, auth, action routing, and the
//! outbound event pump.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Receive Handshake (or Reconnect) → validate version
//!   2. Authenticate token → PlayerId, or validate the reconnect token
//!   3. Send HandshakeAck → player is connected
//!   4. Spawn the event pump: room events → envelopes → the socket
//!   5. Loop: receive envelopes → dispatch system messages and actions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pinpoint_protocol::{
    ClientAction, Codec, Envelope, Payload, PlayerId, ProtocolError, RoomCode, ServerEvent,
    SystemMessage,
};
use pinpoint_room::{ChallengeProvider, GameStore, PlayerSender, RoomError};
use pinpoint_session::Authenticator;
use pinpoint_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::{ServerState, PROTOCOL_VERSION};
use crate::PinpointError;

/// How long a client may stay silent before the server drops them.
/// Clients heartbeat well inside this window.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Drop guard that starts the player's reconnection grace period when
/// the handler exits, even on panic. `Drop` is synchronous, so the async
/// cleanup runs in a fire-and-forget task.
struct SessionGuard<S, P, A, C>
where
    S: GameStore,
    P: ChallengeProvider,
    A: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    player_id: PlayerId,
    state: Arc<ServerState<S, P, A, C>>,
}

impl<S, P, A, C> Drop for SessionGuard<S, P, A, C>
where
    S: GameStore,
    P: ChallengeProvider,
    A: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let _ = state.sessions.lock().await.disconnect(player_id);
            // Keep their seat; the session sweeper unseats them if the
            // grace period lapses.
            let _ = state.rooms.lock().await.detach(player_id).await;
        });
    }
}

/// What the handshake established.
struct HandshakeOutcome {
    player_id: PlayerId,
    /// Room to re-attach to, for a reconnecting player.
    resumed_room: Option<RoomCode>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, P, A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, P, A, C>>,
) -> Result<(), PinpointError>
where
    S: GameStore,
    P: ChallengeProvider,
    A: Authenticator,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let start = Instant::now();
    let seq = Arc::new(AtomicU64::new(1));

    let outcome = perform_handshake(&conn, &state, start).await?;
    let player_id = outcome.player_id;

    tracing::info!(%conn_id, %player_id, "player authenticated");

    let _guard = SessionGuard {
        player_id,
        state: Arc::clone(&state),
    };

    // Outbound pump: room events are enqueued by the room actor and
    // serialized onto the socket here, never blocking the actor.
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    spawn_event_pump(
        conn.clone(),
        state.codec.clone(),
        Arc::clone(&seq),
        start,
        event_rx,
    );

    if let Some(room) = &outcome.resumed_room {
        let result = {
            let mut rooms = state.rooms.lock().await;
            rooms.resume(player_id, room, event_tx.clone()).await
        };
        if let Err(e) = result {
            tracing::debug!(%player_id, %room, error = %e, "room resume failed");
            let _ = state.sessions.lock().await.set_room(player_id, None);
            let _ = event_tx.send(ServerEvent::Error {
                message: e.to_string(),
            });
        }
    }

    loop {
        let data = match tokio::time::timeout(IDLE_TIMEOUT, conn.recv()).await {
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
            Payload::System(msg) => {
                let should_close =
                    handle_system_message(&conn, &state, player_id, msg, &seq, start).await?;
                if should_close {
                    break;
                }
            }
            Payload::Action(action) => {
                handle_action(&state, player_id, action, &event_tx).await;
            }
            Payload::Event(_) => {
                tracing::debug!(%player_id, "ignoring event sent by client");
            }
        }
    }

    // _guard drops here → grace period starts.
    Ok(())
}

/// Receives the first message and resolves it to a player: a fresh
/// `Handshake` goes through the authenticator, a `Reconnect` through the
/// session manager's token check.
async fn perform_handshake<S, P, A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, P, A, C>>,
    start: Instant,
) -> Result<HandshakeOutcome, PinpointError>
where
    S: GameStore,
    P: ChallengeProvider,
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into())
                .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let (version, reconnecting, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => {
            (version, false, token.unwrap_or_default())
        }
        Payload::System(SystemMessage::Reconnect { version, token }) => (version, true, token),
        _ => {
            send_error(conn, &state.codec, 400, "expected Handshake", 0, start).await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            0,
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let (player_id, reconnect_token, resumed_room) = if reconnecting {
        let mut sessions = state.sessions.lock().await;
        match sessions.reconnect(&token) {
            Ok(session) => (
                session.player_id,
                session.reconnect_token.clone(),
                session.room.clone(),
            ),
            Err(e) => {
                drop(sessions);
                send_error(conn, &state.codec, 401, &e.to_string(), 0, start).await?;
                return Err(e.into());
            }
        }
    } else {
        let player_id = match state.auth.verify(&token).await {
            Ok(pid) => pid,
            Err(e) => {
                send_error(conn, &state.codec, 401, "unauthorized", 0, start).await?;
                return Err(e.into());
            }
        };
        let mut sessions = state.sessions.lock().await;
        match sessions.create(player_id) {
            Ok(session) => (player_id, session.reconnect_token.clone(), None),
            Err(e) => {
                drop(sessions);
                send_error(conn, &state.codec, 409, &e.to_string(), 0, start).await?;
                return Err(e.into());
            }
        }
    };

    let ack = Envelope {
        seq: 0,
        timestamp: elapsed_ms(start),
        payload: Payload::System(SystemMessage::HandshakeAck {
            player_id,
            reconnect_token,
            server_time: elapsed_ms(start),
        }),
    };
    let bytes = state.codec.encode(&ack)?;
    conn.send(&bytes).await.map_err(PinpointError::Transport)?;

    Ok(HandshakeOutcome {
        player_id,
        resumed_room,
    })
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<S, P, A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, P, A, C>>,
    player_id: PlayerId,
    msg: SystemMessage,
    seq: &AtomicU64,
    start: Instant,
) -> Result<bool, PinpointError>
where
    S: GameStore,
    P: ChallengeProvider,
    C: Codec,
{
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            let ack = Envelope {
                seq: next_seq(seq),
                timestamp: elapsed_ms(start),
                payload: Payload::System(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: elapsed_ms(start),
                }),
            };
            let bytes = state.codec.encode(&ack)?;
            conn.send(&bytes).await.map_err(PinpointError::Transport)?;
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

/// Routes a game action to the room layer. Failures go back to this
/// client alone as an `Error` event.
async fn handle_action<S, P, A, C>(
    state: &Arc<ServerState<S, P, A, C>>,
    player_id: PlayerId,
    action: ClientAction,
    event_tx: &PlayerSender,
) where
    S: GameStore,
    P: ChallengeProvider,
{
    if let Err(e) = dispatch_action(state, player_id, action, event_tx).await {
        tracing::debug!(%player_id, error = %e, "action rejected");
        let _ = event_tx.send(ServerEvent::Error {
            message: e.to_string(),
        });
    }
}

/// Membership changes go through the directory under its lock; everything
/// else clones the room handle out and awaits the actor reply with the
/// lock released, so one room blocked on a slow challenge fetch cannot
/// stall every other player's actions. Locks are never held across
/// socket I/O.
async fn dispatch_action<S, P, A, C>(
    state: &Arc<ServerState<S, P, A, C>>,
    player_id: PlayerId,
    action: ClientAction,
    event_tx: &PlayerSender,
) -> Result<(), RoomError>
where
    S: GameStore,
    P: ChallengeProvider,
{
    match action {
        ClientAction::CreateRoom { settings } => {
            let code = {
                let mut rooms = state.rooms.lock().await;
                rooms.create_room(player_id, settings, event_tx.clone()).await?
            };
            let _ = state.sessions.lock().await.set_room(player_id, Some(code));
            Ok(())
        }

        ClientAction::JoinRoom { room } => {
            {
                let mut rooms = state.rooms.lock().await;
                rooms.join_room(player_id, &room, event_tx.clone()).await?;
            }
            let _ = state.sessions.lock().await.set_room(player_id, Some(room));
            Ok(())
        }

        ClientAction::LeaveRoom => {
            {
                let mut rooms = state.rooms.lock().await;
                rooms.leave_room(player_id).await?;
            }
            let _ = state.sessions.lock().await.set_room(player_id, None);
            Ok(())
        }

        ClientAction::SetReady { ready } => {
            let handle = state.rooms.lock().await.player_handle(&player_id)?;
            handle.set_ready(player_id, ready).await
        }

        ClientAction::StartGame => {
            let handle = state.rooms.lock().await.player_handle(&player_id)?;
            handle.start_game(player_id).await
        }

        ClientAction::SubmitGuess {
            round_index,
            lat,
            lng,
        } => {
            let handle = state.rooms.lock().await.player_handle(&player_id)?;
            handle.submit_guess(player_id, round_index, lat, lng).await
        }

        ClientAction::RequestCurrentRound => {
            let handle = state.rooms.lock().await.player_handle(&player_id)?;
            handle.current_round(player_id).await
        }

        ClientAction::AdvanceRound => {
            let handle = state.rooms.lock().await.player_handle(&player_id)?;
            handle.advance(player_id).await
        }
    }
}

/// Forwards room events to the socket, one envelope each, until the
/// channel closes (player unseated) or the socket dies.
fn spawn_event_pump<C: Codec + Clone>(
    conn: WebSocketConnection,
    codec: C,
    seq: Arc<AtomicU64>,
    start: Instant,
    mut event_rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let envelope = Envelope {
                seq: next_seq(&seq),
                timestamp: elapsed_ms(start),
                payload: Payload::Event(event),
            };
            let bytes = match codec.encode(&envelope) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });
}

/// Sends a `SystemMessage::Error` envelope to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    seq: u64,
    start: Instant,
) -> Result<(), PinpointError> {
    let envelope = Envelope {
        seq,
        timestamp: elapsed_ms(start),
        payload: Payload::System(SystemMessage::Error {
            code,
            message: message.to_string(),
        }),
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await.map_err(PinpointError::Transport)?;
    Ok(())
}

fn next_seq(seq: &AtomicU64) -> u64 {
    seq.fetch_add(1, Ordering::Relaxed)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
