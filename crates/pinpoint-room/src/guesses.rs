//! The guess sheet: one round's collected guesses.

use std::collections::HashMap;

use pinpoint_protocol::{LatLng, PlayerId};
use tokio::time::Instant;

use crate::RoomError;

/// Collects guesses for a single round, enforcing the deadline and
/// coordinate validity. Resubmission replaces the earlier guess
/// (last write wins) as long as the round is open.
pub struct GuessSheet {
    round_index: u32,
    deadline: Option<Instant>,
    guesses: HashMap<PlayerId, LatLng>,
}

impl GuessSheet {
    pub fn new(round_index: u32, deadline: Option<Instant>) -> Self {
        Self {
            round_index,
            deadline,
            guesses: HashMap::new(),
        }
    }

    /// Records a guess. Returns `true` if this was the player's first
    /// guess this round, `false` if it replaced an earlier one.
    ///
    /// # Errors
    /// - [`RoomError::InvalidGuess`] for out-of-range or non-finite
    ///   coordinates
    /// - [`RoomError::RoundClosed`] when `now` is past the deadline
    pub fn submit(
        &mut self,
        player_id: PlayerId,
        guess: LatLng,
        now: Instant,
    ) -> Result<bool, RoomError> {
        if !guess.is_valid() {
            return Err(RoomError::InvalidGuess(format!(
                "coordinates out of range: ({}, {})",
                guess.lat, guess.lng
            )));
        }
        if let Some(deadline) = self.deadline {
            if now > deadline {
                return Err(RoomError::RoundClosed {
                    round_index: self.round_index,
                });
            }
        }

        Ok(self.guesses.insert(player_id, guess).is_none())
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<LatLng> {
        self.guesses.get(player_id).copied()
    }

    pub fn has_guessed(&self, player_id: &PlayerId) -> bool {
        self.guesses.contains_key(player_id)
    }

    pub fn count(&self) -> usize {
        self.guesses.len()
    }

    /// `true` when every player in `players` has a guess on the sheet.
    /// Callers decide who counts (the room excludes departed players, and
    /// disconnected ones too when the round has no deadline).
    pub fn is_complete<'a>(&self, mut players: impl Iterator<Item = &'a PlayerId>) -> bool {
        players.all(|p| self.guesses.contains_key(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_valid_guess_before_deadline_accepted() {
        let now = Instant::now();
        let mut sheet = GuessSheet::new(1, Some(now + Duration::from_secs(60)));

        let first = sheet.submit(pid(1), LatLng::new(10.0, 20.0), now).unwrap();

        assert!(first);
        assert_eq!(sheet.get(&pid(1)), Some(LatLng::new(10.0, 20.0)));
        assert_eq!(sheet.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_resubmission_replaces_guess() {
        let now = Instant::now();
        let mut sheet = GuessSheet::new(1, Some(now + Duration::from_secs(60)));

        sheet.submit(pid(1), LatLng::new(10.0, 20.0), now).unwrap();
        let first = sheet.submit(pid(1), LatLng::new(-5.0, 7.0), now).unwrap();

        assert!(!first, "resubmission is not a first guess");
        assert_eq!(sheet.get(&pid(1)), Some(LatLng::new(-5.0, 7.0)));
        assert_eq!(sheet.count(), 1, "replacement must not add a row");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_deadline_rejected() {
        let now = Instant::now();
        let mut sheet = GuessSheet::new(3, Some(now + Duration::from_secs(60)));

        let late = now + Duration::from_secs(61);
        let result = sheet.submit(pid(1), LatLng::new(10.0, 20.0), late);

        assert!(matches!(
            result,
            Err(RoomError::RoundClosed { round_index: 3 })
        ));
        assert_eq!(sheet.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_at_exact_deadline_accepted() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(60);
        let mut sheet = GuessSheet::new(1, Some(deadline));

        assert!(sheet.submit(pid(1), LatLng::new(0.0, 0.0), deadline).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_invalid_coordinates_rejected() {
        let now = Instant::now();
        let mut sheet = GuessSheet::new(1, None);

        for bad in [
            LatLng::new(91.0, 0.0),
            LatLng::new(0.0, 181.0),
            LatLng::new(f64::NAN, 0.0),
        ] {
            let result = sheet.submit(pid(1), bad, now);
            assert!(matches!(result, Err(RoomError::InvalidGuess(_))));
        }
        assert_eq!(sheet.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untimed_sheet_never_closes() {
        let now = Instant::now();
        let mut sheet = GuessSheet::new(1, None);

        let much_later = now + Duration::from_secs(100_000);
        assert!(sheet.submit(pid(1), LatLng::new(1.0, 1.0), much_later).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_complete_tracks_given_players() {
        let now = Instant::now();
        let mut sheet = GuessSheet::new(1, None);
        let players = [pid(1), pid(2)];

        assert!(!sheet.is_complete(players.iter()));

        sheet.submit(pid(1), LatLng::new(1.0, 1.0), now).unwrap();
        assert!(!sheet.is_complete(players.iter()));

        sheet.submit(pid(2), LatLng::new(2.0, 2.0), now).unwrap();
        assert!(sheet.is_complete(players.iter()));

        // A guess from someone outside the list doesn't matter.
        assert!(sheet.is_complete([pid(1)].iter()));
    }
}
