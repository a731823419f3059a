//! The room's lifecycle phase machine.

use pinpoint_protocol::RoomStatus;

/// The fine-grained phase of a room, as tracked by the room actor.
///
/// ```text
/// Waiting ──(start)──→ RoundActive ──(all guessed / deadline)──→ Resolving
///                           ↑                                       │
///                           │            ┌──── Countdown ←──────────┤ auto-advance
///                           ├────────────┤                          │
///                           │            └── AwaitingHost ←─────────┤ manual
///                           │                                       │
///                           └───────────────────────────── Finished ┘ last round
/// ```
///
/// The wire and the store only see the coarse [`RoomStatus`]; everything
/// between `RoundActive` and `AwaitingHost` collapses to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Lobby: accepting joins, waiting for the host to start.
    Waiting,
    /// A round is live and collecting guesses.
    RoundActive,
    /// The round just closed; results are being computed and broadcast.
    /// Transient — the actor leaves this phase in the same turn.
    Resolving,
    /// Results are on screen; the countdown to the next round is ticking.
    Countdown,
    /// Manual-advance mode: waiting for the host's advance action.
    AwaitingHost,
    /// The final round resolved. No further rounds will start.
    Finished,
}

impl RoomPhase {
    /// `true` while the room accepts new members.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// `true` from game start until the final results.
    pub fn in_game(&self) -> bool {
        matches!(
            self,
            Self::RoundActive | Self::Resolving | Self::Countdown | Self::AwaitingHost
        )
    }

    /// The coarse status persisted and put on the wire.
    pub fn wire_status(&self) -> RoomStatus {
        match self {
            Self::Waiting => RoomStatus::Waiting,
            Self::Finished => RoomStatus::Finished,
            _ => RoomStatus::Active,
        }
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::RoundActive => write!(f, "RoundActive"),
            Self::Resolving => write!(f, "Resolving"),
            Self::Countdown => write!(f, "Countdown"),
            Self::AwaitingHost => write!(f, "AwaitingHost"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
