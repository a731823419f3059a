//! Session types: the server's record of a connected player.

use std::time::Instant;

use pinpoint_protocol::{PlayerId, RoomCode};

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected player has to reconnect
    /// before their session is permanently expired.
    ///
    /// Default: 60 seconds — long enough to survive a round plus the
    /// results screen on a flaky connection. Set to 0 to disable
    /// reconnection entirely.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 60,
        }
    }
}

/// The current state of a player's session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Player is actively connected.
    Connected,

    /// Player disconnected at the given instant. They have until
    /// `since + grace` to come back with their reconnection token.
    Disconnected { since: Instant },

    /// Grace period elapsed; the session is dead and will be cleaned up.
    Expired,
}

/// A single player's session on the server.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,

    pub state: SessionState,

    /// Secret the client presents to resume after a disconnect instead of
    /// re-authenticating. 32 hex chars (128 bits of randomness).
    pub reconnect_token: String,

    /// The room the player was last in, if any. On reconnect the handler
    /// uses this to re-attach the player to their game in progress.
    pub room: Option<RoomCode>,
}
