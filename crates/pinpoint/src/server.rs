//! `PinpointServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use pinpoint_protocol::{Codec, JsonCodec};
use pinpoint_room::{ChallengeProvider, GameStore, RoomDirectory};
use pinpoint_session::{Authenticator, SessionConfig, SessionManager};
use pinpoint_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::PinpointError;

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// How often the server sweeps for sessions whose reconnection grace
/// period has elapsed.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S, P, A, C> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomDirectory<S, P>>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Pinpoint server.
///
/// # Example
///
/// ```rust,ignore
/// use pinpoint::prelude::*;
///
/// let server = PinpointServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(store, challenges, my_auth)
///     .await?;
/// server.run().await
/// ```
pub struct PinpointServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
}

impl PinpointServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration (reconnection grace period).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the server with the given store, challenge provider, and
    /// authenticator. Uses `JsonCodec` over WebSockets.
    pub async fn build<S, P, A>(
        self,
        store: Arc<S>,
        challenges: Arc<P>,
        auth: A,
    ) -> Result<PinpointServer<S, P, A, JsonCodec>, PinpointError>
    where
        S: GameStore,
        P: ChallengeProvider,
        A: Authenticator,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: Mutex::new(RoomDirectory::new(store, challenges)),
            auth,
            codec: JsonCodec,
        });

        Ok(PinpointServer { transport, state })
    }
}

impl Default for PinpointServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Pinpoint server. Call [`run()`](Self::run) to start
/// accepting connections.
pub struct PinpointServer<S, P, A, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, P, A, C>>,
}

impl<S, P, A, C> PinpointServer<S, P, A, C>
where
    S: GameStore,
    P: ChallengeProvider,
    A: Authenticator,
    C: Codec + Clone,
{
    pub fn builder() -> PinpointServerBuilder {
        PinpointServerBuilder::new()
    }

    /// The local address the server is bound to. Useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: each connection gets its own handler task.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), PinpointError> {
        tracing::info!("Pinpoint server running");

        spawn_session_sweeper(Arc::clone(&self.state));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically expires sessions whose grace period lapsed, removes the
/// expired players from their rooms, and frees the dead sessions.
fn spawn_session_sweeper<S, P, A, C>(state: Arc<ServerState<S, P, A, C>>)
where
    S: GameStore + Send,
    P: ChallengeProvider,
    A: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;

            let expired = state.sessions.lock().await.expire_stale();
            if expired.is_empty() {
                continue;
            }

            // Unseat the players who are gone for good. Locks are taken
            // one at a time: sessions, then rooms, then sessions again.
            {
                let mut rooms = state.rooms.lock().await;
                for player_id in &expired {
                    if let Err(e) = rooms.leave_room(*player_id).await {
                        tracing::debug!(%player_id, error = %e, "expired player had no room");
                    }
                }
            }

            state.sessions.lock().await.cleanup_expired();
        }
    });
}
