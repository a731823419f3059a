//! The Pinpoint game core: rooms, rounds, guesses, and scores.
//!
//! A room is a small multiplayer session identified by a short join code.
//! Players gather in a lobby, the host starts the game, and the room plays
//! a fixed number of rounds: each shows a photo, everyone drops a pin on
//! the world map, and when the last guess lands (or the clock runs out)
//! the room reveals where the photo was taken and who got closest.
//!
//! # Architecture
//!
//! Every room is an actor — a Tokio task that exclusively owns that
//! room's state and processes commands from an mpsc channel
//! ([`room::RoomHandle`]). The [`RoomDirectory`] sits above the actors,
//! mapping join codes to handles and players to rooms.
//!
//! Collaborators are traits: challenges come from a [`ChallengeProvider`],
//! results go to a [`GameStore`]. The in-crate [`StaticChallenges`] and
//! [`MemoryStore`] back the tests and the demo server.

#![allow(async_fn_in_trait)]

mod directory;
mod error;
mod guesses;
mod phase;
mod round;

pub mod challenge;
pub mod room;
pub mod scoring;
pub mod store;

pub use challenge::{builtin_fallback, ChallengeError, ChallengeProvider, StaticChallenges};
pub use directory::RoomDirectory;
pub use error::RoomError;
pub use guesses::GuessSheet;
pub use phase::RoomPhase;
pub use room::{PlayerSender, RoomHandle, RoomInfo};
pub use round::ActiveRound;
pub use store::{GameStore, GuessRecord, MemoryStore, StoreError};
