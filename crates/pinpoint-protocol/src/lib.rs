//! Wire protocol for Pinpoint.
//!
//! This crate defines the language clients and servers speak:
//!
//! - **Types** ([`Envelope`], [`SystemMessage`], [`PlayerId`], [`RoomCode`],
//!   [`LatLng`], …) — the structures that travel on the wire.
//! - **Actions and events** ([`ClientAction`], [`ServerEvent`]) — what
//!   players can do and what the game core announces.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw bytes) and the session
//! and room layers. It knows nothing about connections or rooms — only how
//! to describe and serialize messages.

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    ClientAction, PlayerSummary, RoomSnapshot, RoundResult, ServerEvent, Standing,
};
pub use types::{
    Challenge, Envelope, GameMode, GameSettings, LatLng, Payload, PlayerId, RoomCode,
    RoomStatus, SystemMessage,
};
