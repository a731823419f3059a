//! Core wire types: identities, coordinates, and the message envelope.
//!
//! Everything in this module crosses the network or is shared between the
//! game core and its collaborators. Game-level actions and events live in
//! [`crate::events`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player, produced by the authenticator.
///
/// Newtype over `u64` so a player ID can't be confused with any other
/// numeric field. `#[serde(transparent)]` keeps the JSON a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short room join code, e.g. `"K7QPXN"`.
///
/// Room codes are case-insensitive: the code is normalized to uppercase on
/// construction and on deserialization, so `"k7qpxn"` and `"K7QPXN"` name
/// the same room everywhere in the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Creates a room code, trimming whitespace and uppercasing.
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite and within
    /// [-90, 90] / [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One photo challenge: what the players see, and where it really is.
///
/// The true location must never be sent to clients before the round ends;
/// round-start events carry only the `photo_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Opaque reference to the photo (URL, asset ID — the core doesn't care).
    pub photo_ref: String,
    /// The true coordinates of the photo.
    pub location: LatLng,
}

// ---------------------------------------------------------------------------
// Room configuration and status
// ---------------------------------------------------------------------------

/// Per-room rules, chosen at room creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Maximum players allowed in the room.
    pub max_players: usize,
    /// Number of rounds in a full game.
    pub total_rounds: u32,
    /// Hard per-round deadline in seconds. `None` = untimed rounds.
    pub round_time_limit_secs: Option<u32>,
    /// `true`: the next round starts automatically after a results
    /// countdown. `false`: the host must advance explicitly.
    pub auto_advance: bool,
    /// Length of the between-round results countdown, in seconds.
    /// Only used when `auto_advance` is set.
    pub results_display_secs: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: 8,
            total_rounds: 5,
            round_time_limit_secs: Some(60),
            auto_advance: true,
            results_display_secs: 10,
        }
    }
}

/// The coarse persisted status of a room, as seen on the wire and by the
/// store. The room actor's internal phase machine is finer-grained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Active,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Active => f.write_str("active"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Whether a guess record came from a solo or a multiplayer game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Solo,
    Multiplayer,
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// Messages used by the framework itself, outside any room.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "Handshake", "version": 1, "token": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server: first message on a fresh connection.
    Handshake { version: u32, token: Option<String> },

    /// Client → Server: resume a recent session instead of
    /// re-authenticating. `token` is the reconnection token from the
    /// original `HandshakeAck`.
    Reconnect { version: u32, token: String },

    /// Server → Client: connection accepted.
    HandshakeAck {
        player_id: PlayerId,
        /// Secret the client presents in a later `Reconnect`.
        reconnect_token: String,
        server_time: u64,
    },

    /// Either direction: orderly close with a reason.
    Disconnect { reason: String },

    /// Client → Server keep-alive.
    Heartbeat { client_time: u64 },

    /// Server → Client keep-alive echo.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Server → Client: a request failed. `code` follows HTTP
    /// conventions (400 bad request, 401 unauthorized, 404 not found).
    Error { code: u16, message: String },
}

/// The content of an envelope: connection plumbing, a player action, or a
/// game event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Framework-level message (handshake, heartbeat, errors).
    System(SystemMessage),
    /// Client → Server game action.
    Action(crate::ClientAction),
    /// Server → Client game event.
    Event(crate::ServerEvent),
}

/// The top-level message wrapper. Every message on the wire is an Envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction auto-incrementing sequence number.
    pub seq: u64,
    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,
    /// The actual message content.
    pub payload: Payload,
}
