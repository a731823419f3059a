//! Unified error type for the Pinpoint server.

use pinpoint_protocol::ProtocolError;
use pinpoint_room::RoomError;
use pinpoint_session::SessionError;
use pinpoint_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Users of the `pinpoint` meta-crate deal with this single type; the
/// `#[from]` impls let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PinpointError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),
}
