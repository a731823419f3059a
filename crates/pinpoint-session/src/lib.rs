//! Player session management for Pinpoint.
//!
//! This crate handles the lifecycle of player connections:
//!
//! 1. **Identity verification** — turning an auth token into a
//!    [`PlayerId`](pinpoint_protocol::PlayerId) ([`Authenticator`] trait;
//!    token issuance lives outside this system entirely)
//! 2. **Session tracking** — knowing who is connected ([`SessionManager`])
//! 3. **Reconnection** — letting a player resume mid-game after a brief
//!    disconnect, via a secret token and a configurable grace period.
//!    The session remembers which room the player was in so the handler
//!    can re-attach them and catch them up on the round in progress.

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::Authenticator;
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
