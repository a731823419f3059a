//! Game-level actions and events.
//!
//! [`ClientAction`] is everything a connected player can ask the game core
//! to do; [`ServerEvent`] is everything the core tells clients about. Both
//! are internally tagged so the JSON reads `{ "type": "SubmitGuess", ... }`.

use serde::{Deserialize, Serialize};

use crate::{GameSettings, LatLng, PlayerId, RoomCode, RoomStatus};

// ---------------------------------------------------------------------------
// Inbound: client actions
// ---------------------------------------------------------------------------

/// An action a player sends to the server after the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientAction {
    /// Create a new room with the sender as host.
    CreateRoom {
        #[serde(default)]
        settings: GameSettings,
    },

    /// Join an existing room by code (case-insensitive).
    JoinRoom { room: RoomCode },

    /// Leave the current room.
    LeaveRoom,

    /// Toggle the ready flag shown in the lobby.
    SetReady { ready: bool },

    /// Start the game. Host only.
    StartGame,

    /// Submit a guess for the given round. Rejected if the round index
    /// doesn't match the active round or the deadline has passed.
    SubmitGuess {
        round_index: u32,
        lat: f64,
        lng: f64,
    },

    /// Ask for the current round state (used after a reconnect, or by a
    /// client that suspects it missed the round-started event).
    RequestCurrentRound,

    /// Start the next round in manual-advance mode. Host only.
    AdvanceRound,
}

// ---------------------------------------------------------------------------
// Outbound: server events
// ---------------------------------------------------------------------------

/// One player's outcome for a single round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub player_id: PlayerId,
    /// `false` when the player never submitted — they score zero and their
    /// cumulative total is unchanged.
    pub has_guessed: bool,
    /// The player's guess, present only when `has_guessed`.
    pub guess: Option<LatLng>,
    pub distance_km: f64,
    /// Round score in `[0, 1000]`.
    pub score: u32,
    /// Cumulative score after this round.
    pub total_score: u32,
}

/// A row in the final standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub total_score: u32,
}

/// One roster entry in a room snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub ready: bool,
    pub total_score: u32,
    pub connected: bool,
}

/// The full lobby-visible state of a room, sent to a player when they join
/// or reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomCode,
    pub status: RoomStatus,
    pub host: PlayerId,
    /// Roster in join order.
    pub players: Vec<PlayerSummary>,
    /// Index of the current (or last started) round, 1-based. 0 before the
    /// first round.
    pub current_round: u32,
    pub settings: GameSettings,
}

/// An event the game core pushes to clients.
///
/// Ordering guarantee (per room): `RoundStarted(n)` precedes every
/// `GuessSubmitted(n)`, which precede `RoundEnded(n)`, which precedes
/// `RoundStarted(n + 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    PlayerJoined { player_id: PlayerId },
    PlayerLeft { player_id: PlayerId },
    PlayerReadyChanged { player_id: PlayerId, ready: bool },

    GameStarted,

    /// A round began. Carries the photo and the clock — never the true
    /// coordinates. For a mid-round joiner this is sent to that connection
    /// alone, with `time_limit_secs` reduced by the time already elapsed.
    RoundStarted {
        photo_ref: String,
        round_index: u32,
        time_limit_secs: Option<u32>,
    },

    /// Someone locked in a guess. Deliberately does not reveal where.
    GuessSubmitted { player_id: PlayerId, round_index: u32 },

    /// The round resolved. `results` are sorted by round score descending,
    /// ties kept in roster order. The true location is now safe to reveal.
    RoundEnded {
        round_index: u32,
        results: Vec<RoundResult>,
        true_location: LatLng,
        photo_ref: String,
    },

    /// One tick of the between-round results countdown.
    CountdownTick { seconds_remaining: u32 },

    /// Manual-advance mode: the next round is ready, waiting on the host.
    NextRoundReady,

    /// The next round is being prepared (challenge fetch in flight).
    LoadingNextRound,

    /// The last round resolved. `standings` sorted by total descending,
    /// ties kept in roster order.
    GameEnded { standings: Vec<Standing> },

    RoomSnapshot(RoomSnapshot),

    /// A request from this client failed. Sent only to the originating
    /// connection, never broadcast.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_action_submit_guess_json_format() {
        let action = ClientAction::SubmitGuess {
            round_index: 2,
            lat: 48.85,
            lng: 2.29,
        };
        let json: serde_json::Value = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "SubmitGuess");
        assert_eq!(json["round_index"], 2);
        assert_eq!(json["lat"], 48.85);
    }

    #[test]
    fn test_client_action_create_room_defaults_settings() {
        let action: ClientAction = serde_json::from_str(r#"{"type": "CreateRoom"}"#).unwrap();
        assert_eq!(
            action,
            ClientAction::CreateRoom {
                settings: GameSettings::default()
            }
        );
    }

    #[test]
    fn test_client_action_join_room_normalizes_code() {
        let action: ClientAction =
            serde_json::from_str(r#"{"type": "JoinRoom", "room": "abc123"}"#).unwrap();
        assert_eq!(
            action,
            ClientAction::JoinRoom {
                room: RoomCode::new("ABC123")
            }
        );
    }

    #[test]
    fn test_server_event_round_started_omits_true_location() {
        // The round-started wire shape carries only the photo reference
        // and the clock. A regression here would leak answers.
        let event = ServerEvent::RoundStarted {
            photo_ref: "photo-1".into(),
            round_index: 1,
            time_limit_secs: Some(60),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("lat"));
        assert!(!json.contains("location"));
    }

    #[test]
    fn test_server_event_round_ended_round_trip() {
        let event = ServerEvent::RoundEnded {
            round_index: 3,
            results: vec![RoundResult {
                player_id: PlayerId(1),
                has_guessed: true,
                guess: Some(LatLng::new(48.0, 2.0)),
                distance_km: 97.5,
                score: 953,
                total_score: 2100,
            }],
            true_location: LatLng::new(48.8584, 2.2945),
            photo_ref: "photo-3".into(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_server_event_guess_submitted_has_no_coordinates() {
        let event = ServerEvent::GuessSubmitted {
            player_id: PlayerId(9),
            round_index: 1,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("lat"));
        assert!(!json.contains("lng"));
    }
}
