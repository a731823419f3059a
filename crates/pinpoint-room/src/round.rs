//! One round in flight, and its resolution into results.

use std::collections::HashMap;

use pinpoint_protocol::{Challenge, PlayerId, RoundResult};
use tokio::time::Instant;

use crate::guesses::GuessSheet;
use crate::scoring;

/// The state of the round currently being played.
///
/// Lives in the room actor's single `Option<ActiveRound>` slot; taking it
/// out of the slot IS the close of the round, which makes ending a round
/// idempotent no matter whether the deadline or the last guess got there
/// first.
pub struct ActiveRound {
    /// 1-based round number.
    pub index: u32,
    pub challenge: Challenge,
    pub guesses: GuessSheet,
    pub started: Instant,
}

impl ActiveRound {
    pub fn new(index: u32, challenge: Challenge, deadline: Option<Instant>) -> Self {
        Self {
            index,
            challenge,
            guesses: GuessSheet::new(index, deadline),
            started: Instant::now(),
        }
    }

    /// Seconds left on the clock from `limit_secs`, for a client that
    /// joins or reconnects mid-round. `None` for untimed rounds.
    pub fn remaining_secs(&self, limit_secs: Option<u32>, now: Instant) -> Option<u32> {
        let limit = limit_secs?;
        let elapsed = now.saturating_duration_since(self.started).as_secs();
        Some(u64::from(limit).saturating_sub(elapsed) as u32)
    }

    /// Resolves the round into per-player results, in descending order of
    /// round score. Ties keep `roster` (join) order — the sort is stable.
    ///
    /// Every roster player gets a row. A player with no guess scores zero
    /// and keeps their previous total. `totals` is updated in place.
    pub fn resolve(
        &self,
        roster: &[PlayerId],
        totals: &mut HashMap<PlayerId, u32>,
    ) -> Vec<RoundResult> {
        let mut results: Vec<RoundResult> = roster
            .iter()
            .map(|&player_id| {
                let guess = self.guesses.get(&player_id);
                let (distance_km, score) = match guess {
                    Some(g) => {
                        let d = scoring::distance_km(g, self.challenge.location);
                        (d, scoring::score_for_distance(d))
                    }
                    None => (0.0, 0),
                };

                let total = totals.entry(player_id).or_insert(0);
                *total += score;

                RoundResult {
                    player_id,
                    has_guessed: guess.is_some(),
                    guess,
                    distance_km,
                    score,
                    total_score: *total,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.cmp(&a.score));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpoint_protocol::LatLng;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn paris_round(index: u32) -> ActiveRound {
        ActiveRound::new(
            index,
            Challenge {
                photo_ref: "photo-paris".into(),
                location: LatLng::new(48.8584, 2.2945),
            },
            None,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_sorts_by_score_descending() {
        let mut round = paris_round(1);
        let now = Instant::now();
        // Player 2 guesses dead-on; player 1 is in Sydney.
        round
            .guesses
            .submit(pid(1), LatLng::new(-33.8688, 151.2093), now)
            .unwrap();
        round
            .guesses
            .submit(pid(2), LatLng::new(48.8584, 2.2945), now)
            .unwrap();

        let mut totals = HashMap::new();
        let results = round.resolve(&[pid(1), pid(2)], &mut totals);

        assert_eq!(results[0].player_id, pid(2));
        assert_eq!(results[0].score, 1000);
        assert_eq!(results[1].player_id, pid(1));
        assert!(results[1].score < 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_ties_keep_roster_order() {
        let round = paris_round(1);
        // Nobody guessed: everyone scores 0, a three-way tie.
        let mut totals = HashMap::new();
        let results = round.resolve(&[pid(3), pid(1), pid(2)], &mut totals);

        let order: Vec<PlayerId> = results.iter().map(|r| r.player_id).collect();
        assert_eq!(order, vec![pid(3), pid(1), pid(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_absent_player_scores_zero_keeps_total() {
        let mut round = paris_round(2);
        let now = Instant::now();
        round
            .guesses
            .submit(pid(1), LatLng::new(48.8584, 2.2945), now)
            .unwrap();

        let mut totals = HashMap::from([(pid(1), 500), (pid(2), 800)]);
        let results = round.resolve(&[pid(1), pid(2)], &mut totals);

        let absent = results.iter().find(|r| r.player_id == pid(2)).unwrap();
        assert!(!absent.has_guessed);
        assert!(absent.guess.is_none());
        assert_eq!(absent.score, 0);
        assert_eq!(absent.total_score, 800, "total unchanged for a no-show");

        let present = results.iter().find(|r| r.player_id == pid(1)).unwrap();
        assert!(present.has_guessed);
        assert_eq!(present.score, 1000);
        assert_eq!(present.total_score, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_updates_totals_map() {
        let mut round = paris_round(1);
        let now = Instant::now();
        round
            .guesses
            .submit(pid(1), LatLng::new(48.8584, 2.2945), now)
            .unwrap();

        let mut totals = HashMap::new();
        round.resolve(&[pid(1)], &mut totals);

        assert_eq!(totals.get(&pid(1)), Some(&1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_secs_counts_down() {
        let round = paris_round(1);

        let at_start = round.remaining_secs(Some(60), round.started);
        assert_eq!(at_start, Some(60));

        let later = round.started + std::time::Duration::from_secs(25);
        assert_eq!(round.remaining_secs(Some(60), later), Some(35));

        let way_later = round.started + std::time::Duration::from_secs(500);
        assert_eq!(round.remaining_secs(Some(60), way_later), Some(0));

        assert_eq!(round.remaining_secs(None, later), None);
    }
}
