//! Identity verification hook.
//!
//! Pinpoint does not issue or validate tokens itself — that belongs to an
//! auth provider (JWT service, OAuth, a custom backend). The core consumes
//! identity through a single trait method: token in, player identity out.

use pinpoint_protocol::PlayerId;

use crate::SessionError;

/// Verifies a client's auth token and returns their identity.
///
/// Called once during the handshake. Implementations must be `Send +
/// Sync + 'static` because the server shares one authenticator across all
/// connection tasks.
///
/// # Example
///
/// ```rust
/// use pinpoint_session::{Authenticator, SessionError};
/// use pinpoint_protocol::PlayerId;
///
/// /// Accepts any numeric token and uses it as the player ID.
/// /// Development only — never use this in production.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn verify(&self, token: &str) -> Result<PlayerId, SessionError> {
///         let id: u64 = token.parse().map_err(|_| {
///             SessionError::AuthFailed("token must be a number".into())
///         })?;
///         Ok(PlayerId(id))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Verifies the given token and returns the player's identity.
    ///
    /// Returns [`SessionError::AuthFailed`] for an invalid or expired
    /// token; the failure is reported only to the connecting client.
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, SessionError>> + Send;
}
