//! The session manager: tracks every player session on the server.
//!
//! Responsibilities:
//! - Creating sessions when players authenticate
//! - Tracking which players are connected / disconnected
//! - Validating reconnection tokens
//! - Remembering which room a player was in so reconnects can re-attach
//! - Expiring sessions after the grace period and cleaning them up
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself. It is owned by the
//! server and accessed through a mutex at a higher level; keeping it a
//! plain `HashMap` avoids hidden locking overhead here.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pinpoint_protocol::{PlayerId, RoomCode};
use rand::Rng;

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Registry of every player currently connected (or recently
/// disconnected) to the server.
///
/// ## Lifecycle
///
/// ```text
/// verify() ──→ create() ──→ disconnect() ──→ reconnect()
///                 │               │                │
///                 │               ▼                │
///                 │          expire_stale()        │
///                 │               │                │
///                 ▼               ▼                ▼
///              [Connected]   [Disconnected]   [Connected]
///                                 │
///                                 ▼ (after grace period)
///                             [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,

    /// Index from reconnection tokens to player IDs, kept in sync with
    /// `sessions`. Reconnecting clients present a token, not a player ID.
    tokens: HashMap<String, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            config,
        }
    }

    /// Creates a new session for a player after successful authentication.
    ///
    /// Generates a fresh reconnection token. A leftover disconnected or
    /// expired session for the same player is replaced (and its old token
    /// invalidated).
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the player already
    /// has an active session.
    pub fn create(&mut self, player_id: PlayerId) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            self.tokens.remove(&existing.reconnect_token);
        }

        let token = generate_token();

        let session = Session {
            player_id,
            state: SessionState::Connected,
            reconnect_token: token.clone(),
            room: None,
        };

        self.tokens.insert(token, player_id);
        self.sessions.insert(player_id, session);

        tracing::info!(%player_id, "session created");

        Ok(self.sessions.get(&player_id).expect("just inserted"))
    }

    /// Marks a player as disconnected, starting the reconnection grace
    /// period. The session (and its room association) survives until the
    /// grace period elapses.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };

        tracing::info!(%player_id, "player disconnected, grace period started");
        Ok(())
    }

    /// Reconnects a player using their reconnection token.
    ///
    /// On success the session transitions back to Connected; the caller
    /// can read `session.room` to re-attach the player to their game.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] — token not recognized
    /// - [`SessionError::SessionExpired`] — grace period elapsed
    /// - [`SessionError::AlreadyConnected`] — session never disconnected
    pub fn reconnect(&mut self, token: &str) -> Result<&Session, SessionError> {
        let player_id = self
            .tokens
            .get(token)
            .copied()
            .ok_or(SessionError::InvalidToken)?;

        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;

        match &session.state {
            SessionState::Disconnected { since } => {
                let grace = Duration::from_secs(self.config.reconnect_grace_secs);
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(player_id));
                }
                session.state = SessionState::Connected;
                tracing::info!(%player_id, "player reconnected");
                Ok(self.sessions.get(&player_id).expect("just modified"))
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(player_id)),
        }
    }

    /// Records which room a player is in (or `None` when they leave).
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn set_room(
        &mut self,
        player_id: PlayerId,
        room: Option<RoomCode>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        session.room = room;
        Ok(())
    }

    /// Scans all sessions and expires any that exceeded the grace period.
    ///
    /// Call periodically. Returns the player IDs that were expired so
    /// higher layers can notify their rooms before [`cleanup_expired`]
    /// deletes the data.
    ///
    /// [`cleanup_expired`]: SessionManager::cleanup_expired
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = &session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired.push(session.player_id);
                    tracing::info!(
                        player_id = %session.player_id,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Removes all expired sessions and invalidates their tokens.
    pub fn cleanup_expired(&mut self) {
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Expired) {
                self.tokens.remove(&session.reconnect_token);
                false
            } else {
                true
            }
        });
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
/// Guessing a valid reconnection token is computationally infeasible.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
