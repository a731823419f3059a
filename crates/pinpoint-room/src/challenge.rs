//! Challenge sourcing: where photos come from.
//!
//! The core doesn't know or care whether challenges come from a database,
//! an HTTP API, or a hard-coded list. It asks a [`ChallengeProvider`] for
//! the next one and deals with failure by parking the round.

use std::sync::atomic::{AtomicUsize, Ordering};

use pinpoint_protocol::{Challenge, LatLng};

/// Errors from a challenge provider.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// The provider has no challenges at all.
    #[error("no challenges available")]
    Exhausted,

    /// The backing source failed (network, database, ...).
    #[error("challenge source unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the next photo challenge for a round.
///
/// Implementations must be `Send + Sync + 'static`: one provider is shared
/// across every room actor on the server.
pub trait ChallengeProvider: Send + Sync + 'static {
    /// Returns the next challenge to play.
    ///
    /// Called once per round, from inside the room actor. A slow
    /// implementation delays that one room, not the server.
    fn next_challenge(
        &self,
    ) -> impl std::future::Future<Output = Result<Challenge, ChallengeError>> + Send;
}

/// A provider backed by a fixed list, cycling when it runs out.
///
/// Used in tests and the demo server; also the backing for
/// [`WithFallback`].
pub struct StaticChallenges {
    challenges: Vec<Challenge>,
    cursor: AtomicUsize,
}

impl StaticChallenges {
    pub fn new(challenges: Vec<Challenge>) -> Self {
        Self {
            challenges,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

impl ChallengeProvider for StaticChallenges {
    async fn next_challenge(&self) -> Result<Challenge, ChallengeError> {
        if self.challenges.is_empty() {
            return Err(ChallengeError::Exhausted);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.challenges.len();
        Ok(self.challenges[i].clone())
    }
}

/// Wraps a primary provider with a static fallback.
///
/// When the primary fails, the failure is logged and a fallback challenge
/// is served instead, so one flaky backend doesn't strand every room in
/// its between-rounds phase.
pub struct WithFallback<P> {
    primary: P,
    fallback: StaticChallenges,
}

impl<P: ChallengeProvider> WithFallback<P> {
    pub fn new(primary: P, fallback: StaticChallenges) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ChallengeProvider> ChallengeProvider for WithFallback<P> {
    async fn next_challenge(&self) -> Result<Challenge, ChallengeError> {
        match self.primary.next_challenge().await {
            Ok(challenge) => Ok(challenge),
            Err(err) => {
                tracing::warn!(error = %err, "primary challenge provider failed, using fallback");
                self.fallback.next_challenge().await
            }
        }
    }
}

/// A handful of well-known landmarks, for demos and as fallback content.
pub fn builtin_fallback() -> StaticChallenges {
    StaticChallenges::new(vec![
        Challenge {
            photo_ref: "builtin/eiffel-tower".into(),
            location: LatLng::new(48.8584, 2.2945),
        },
        Challenge {
            photo_ref: "builtin/statue-of-liberty".into(),
            location: LatLng::new(40.6892, -74.0445),
        },
        Challenge {
            photo_ref: "builtin/sydney-opera-house".into(),
            location: LatLng::new(-33.8568, 151.2153),
        },
        Challenge {
            photo_ref: "builtin/christ-the-redeemer".into(),
            location: LatLng::new(-22.9519, -43.2105),
        },
        Challenge {
            photo_ref: "builtin/table-mountain".into(),
            location: LatLng::new(-33.9628, 18.4098),
        },
    ])
}
