//! # Pinpoint
//!
//! Server for a multiplayer photo-location guessing game. Players join a
//! room with a short code, everyone sees the same photo, drops a pin on
//! the world map, and the closest guess scores the most points.
//!
//! This meta-crate ties the layers together and exposes the server entry
//! point:
//!
//! - [`pinpoint_protocol`] — wire types, actions, events, codec
//! - [`pinpoint_transport`] — WebSocket transport
//! - [`pinpoint_session`] — auth, sessions, reconnection tokens
//! - [`pinpoint_room`] — rooms, rounds, scoring (the game core)
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pinpoint::prelude::*;
//!
//! # struct MyAuth;
//! # impl Authenticator for MyAuth {
//! #     async fn verify(&self, token: &str) -> Result<PlayerId, SessionError> {
//! #         token.parse().map(PlayerId).map_err(|_| SessionError::AuthFailed("bad".into()))
//! #     }
//! # }
//! # async fn run() -> Result<(), PinpointError> {
//! let server = PinpointServer::<MemoryStore, StaticChallenges, MyAuth, JsonCodec>::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(builtin_fallback()),
//!         MyAuth,
//!     )
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::PinpointError;
pub use server::{PinpointServer, PinpointServerBuilder, PROTOCOL_VERSION};

/// The usual imports for building and running a server.
pub mod prelude {
    pub use crate::{PinpointError, PinpointServer, PinpointServerBuilder, PROTOCOL_VERSION};
    pub use pinpoint_protocol::{
        Challenge, ClientAction, Envelope, GameSettings, JsonCodec, LatLng, Payload, PlayerId,
        RoomCode, ServerEvent, SystemMessage,
    };
    pub use pinpoint_room::{
        builtin_fallback, ChallengeProvider, GameStore, MemoryStore, StaticChallenges,
    };
    pub use pinpoint_session::{Authenticator, SessionConfig, SessionError};
}
