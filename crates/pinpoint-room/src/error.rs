//! Error types for the game core.

use pinpoint_protocol::{PlayerId, RoomCode};

use crate::challenge::ChallengeError;

/// Errors returned by room operations.
///
/// These map onto the error events clients see: the handler forwards the
/// `Display` string to the offending connection and nothing else.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room exists with this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room is at its `max_players` capacity.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The player is already in a room (this one or another).
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The player is not a member of any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The operation is reserved for the room's host.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The guess was malformed (out-of-range or non-finite coordinates).
    #[error("invalid guess: {0}")]
    InvalidGuess(String),

    /// The guess arrived after the round's deadline, or named a round
    /// that is not the active one.
    #[error("round {round_index} is closed")]
    RoundClosed { round_index: u32 },

    /// The operation doesn't make sense in the room's current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The room actor is gone (crashed or shut down mid-request).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The challenge provider failed while preparing a round.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}
