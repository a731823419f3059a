//! Integration tests for the room system: lobby, rounds, timers,
//! reconnection, and persistence.
//!
//! Time-dependent behavior runs under Tokio's paused clock
//! (`start_paused`), so deadline and countdown tests advance virtual time
//! instead of sleeping.

use std::sync::Arc;
use std::time::Duration;

use pinpoint_protocol::{Challenge, GameSettings, LatLng, PlayerId, ServerEvent};
use pinpoint_room::{
    MemoryStore, PlayerSender, RoomDirectory, RoomError, RoomPhase, StaticChallenges,
};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const EIFFEL: LatLng = LatLng {
    lat: 48.8584,
    lng: 2.2945,
};
const SYDNEY: LatLng = LatLng {
    lat: -33.8688,
    lng: 151.2093,
};

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn challenge(n: usize) -> Challenge {
    Challenge {
        photo_ref: format!("photo-{n}"),
        location: EIFFEL,
    }
}

type Directory = RoomDirectory<MemoryStore, StaticChallenges>;

fn directory(n_challenges: usize) -> (Directory, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let challenges = Arc::new(StaticChallenges::new(
        (1..=n_challenges).map(challenge).collect(),
    ));
    (RoomDirectory::new(Arc::clone(&store), challenges), store)
}

/// Short game: 2 rounds, 60 s rounds, 2 s results countdown.
fn quick_settings() -> GameSettings {
    GameSettings {
        max_players: 4,
        total_rounds: 2,
        round_time_limit_secs: Some(60),
        auto_advance: true,
        results_display_secs: 2,
    }
}

fn manual_settings() -> GameSettings {
    GameSettings {
        auto_advance: false,
        ..quick_settings()
    }
}

fn player_channel() -> (PlayerSender, mpsc::UnboundedReceiver<ServerEvent>) {
    mpsc::unbounded_channel()
}

/// Yields so the room actor (and its fire-and-forget persistence tasks)
/// can run.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advances virtual time and lets timers and tasks catch up.
async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn round_ended_results(
    events: &[ServerEvent],
    index: u32,
) -> Option<Vec<pinpoint_protocol::RoundResult>> {
    events.iter().find_map(|e| match e {
        ServerEvent::RoundEnded {
            round_index,
            results,
            ..
        } if *round_index == index => Some(results.clone()),
        _ => None,
    })
}

fn count_round_ended(events: &[ServerEvent], index: u32) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoundEnded { round_index, .. } if *round_index == index))
        .count()
}

/// Creates a room with `players` members; returns the code and each
/// player's event receiver (in `players` order, host first).
async fn room_with_players(
    dir: &mut Directory,
    settings: GameSettings,
    players: &[PlayerId],
) -> (
    pinpoint_protocol::RoomCode,
    Vec<mpsc::UnboundedReceiver<ServerEvent>>,
) {
    let mut receivers = Vec::new();

    let (tx, rx) = player_channel();
    receivers.push(rx);
    let code = dir.create_room(players[0], settings, tx).await.unwrap();

    for &player in &players[1..] {
        let (tx, rx) = player_channel();
        receivers.push(rx);
        dir.join_room(player, &code, tx).await.unwrap();
    }
    (code, receivers)
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_create_room_seats_host_and_sends_snapshot() {
    let (mut dir, _) = directory(2);
    let (tx, mut rx) = player_channel();

    let code = dir.create_room(pid(1), quick_settings(), tx).await.unwrap();

    assert_eq!(dir.player_room(&pid(1)), Some(&code));
    assert_eq!(dir.room_count(), 1);

    let events = drain(&mut rx);
    match &events[..] {
        [ServerEvent::RoomSnapshot(snap)] => {
            assert_eq!(snap.room, code);
            assert_eq!(snap.host, pid(1));
            assert_eq!(snap.players.len(), 1);
            assert_eq!(snap.current_round, 0);
        }
        other => panic!("expected a single snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room_not_found() {
    let (mut dir, _) = directory(2);
    let (tx, _rx) = player_channel();

    let result = dir
        .join_room(pid(1), &pinpoint_protocol::RoomCode::new("ZZZZ99"), tx)
        .await;

    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_player_cannot_be_in_two_rooms() {
    let (mut dir, _) = directory(2);
    let (code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1)]).await;

    let (tx, _rx) = player_channel();
    let result = dir.join_room(pid(1), &code, tx).await;
    assert!(matches!(result, Err(RoomError::AlreadyInRoom(p, _)) if p == pid(1)));

    let (tx, _rx) = player_channel();
    let result = dir.create_room(pid(1), quick_settings(), tx).await;
    assert!(matches!(result, Err(RoomError::AlreadyInRoom(p, _)) if p == pid(1)));
}

#[tokio::test]
async fn test_full_room_rejects_join() {
    let (mut dir, _) = directory(2);
    let settings = GameSettings {
        max_players: 2,
        ..quick_settings()
    };
    let (code, _rxs) = room_with_players(&mut dir, settings, &[pid(1), pid(2)]).await;

    let (tx, _rx) = player_channel();
    let result = dir.join_room(pid(3), &code, tx).await;

    assert!(matches!(result, Err(RoomError::RoomFull(_))));
}

#[tokio::test]
async fn test_join_after_start_rejected() {
    let (mut dir, _) = directory(2);
    let (code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    let (tx, _rx) = player_channel();
    let result = dir.join_room(pid(3), &code, tx).await;

    assert!(matches!(result, Err(RoomError::InvalidState(_))));
}

#[tokio::test]
async fn test_ready_toggle_broadcast() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    drain(&mut rxs[0]);

    dir.set_ready(pid(2), true).await.unwrap();

    let events = drain(&mut rxs[0]);
    assert!(events.contains(&ServerEvent::PlayerReadyChanged {
        player_id: pid(2),
        ready: true
    }));
}

#[tokio::test]
async fn test_only_host_can_start() {
    let (mut dir, _) = directory(2);
    let (_code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;

    let result = dir.start_game(pid(2)).await;

    assert!(matches!(result, Err(RoomError::NotHost(p)) if p == pid(2)));
}

#[tokio::test]
async fn test_last_player_leaving_removes_room() {
    let (mut dir, _) = directory(2);
    let (_code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;

    dir.leave_room(pid(2)).await.unwrap();
    assert_eq!(dir.room_count(), 1);

    dir.leave_room(pid(1)).await.unwrap();
    assert_eq!(dir.room_count(), 0);
    assert_eq!(dir.player_room(&pid(1)), None);
}

#[tokio::test]
async fn test_host_leaving_lobby_migrates_host() {
    let (mut dir, _) = directory(2);
    let (code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    drain(&mut rxs[1]);

    dir.leave_room(pid(1)).await.unwrap();

    // The remaining player becomes host and may start the game.
    dir.start_game(pid(2)).await.unwrap();
    let info = dir.room_info(&code).await.unwrap();
    assert_eq!(info.phase, RoomPhase::RoundActive);
}

// =========================================================================
// Rounds: guessing, deadlines, completion
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_round_starts_without_revealing_location() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;

    dir.start_game(pid(1)).await.unwrap();

    let events = drain(&mut rxs[1]);
    assert!(events.contains(&ServerEvent::GameStarted));
    assert!(events.contains(&ServerEvent::LoadingNextRound));
    assert!(events.contains(&ServerEvent::RoundStarted {
        photo_ref: "photo-1".into(),
        round_index: 1,
        time_limit_secs: Some(60),
    }));
}

#[tokio::test(start_paused = true)]
async fn test_round_ends_early_when_all_have_guessed() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();
    drain(&mut rxs[0]);

    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    let mid = drain(&mut rxs[0]);
    assert!(
        round_ended_results(&mid, 1).is_none(),
        "round must stay open while a guess is outstanding"
    );

    dir.submit_guess(pid(2), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();

    let events = drain(&mut rxs[0]);
    let results = round_ended_results(&events, 1).expect("round should end on the last guess");
    assert_eq!(results.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_results_sorted_by_score_with_true_location() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    // Player 2 nails it, player 1 is half a planet off.
    dir.submit_guess(pid(1), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();
    dir.submit_guess(pid(2), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    let events = drain(&mut rxs[0]);
    let ended = events
        .iter()
        .find_map(|e| match e {
            ServerEvent::RoundEnded {
                results,
                true_location,
                ..
            } => Some((results.clone(), *true_location)),
            _ => None,
        })
        .expect("round ended");

    let (results, true_location) = ended;
    assert_eq!(true_location, EIFFEL);
    assert_eq!(results[0].player_id, pid(2));
    assert_eq!(results[0].score, 1000);
    assert_eq!(results[1].player_id, pid(1));
    assert!(results[1].score < results[0].score);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_scores_missing_player_zero() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    advance(Duration::from_secs(61)).await;

    let events = drain(&mut rxs[0]);
    let results = round_ended_results(&events, 1).expect("deadline should close the round");

    let missing = results.iter().find(|r| r.player_id == pid(2)).unwrap();
    assert!(!missing.has_guessed);
    assert!(missing.guess.is_none());
    assert_eq!(missing.score, 0);
    assert_eq!(missing.total_score, 0);

    let guessed = results.iter().find(|r| r.player_id == pid(1)).unwrap();
    assert!(guessed.has_guessed);
    assert_eq!(guessed.score, 1000);
}

#[tokio::test(start_paused = true)]
async fn test_guess_after_deadline_rejected() {
    let (mut dir, _) = directory(2);
    let (_code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    advance(Duration::from_secs(61)).await;

    let result = dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await;
    assert!(matches!(
        result,
        Err(RoomError::RoundClosed { round_index: 1 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_wrong_round_index_rejected() {
    let (mut dir, _) = directory(2);
    let (_code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    let result = dir.submit_guess(pid(1), 7, EIFFEL.lat, EIFFEL.lng).await;
    assert!(matches!(
        result,
        Err(RoomError::RoundClosed { round_index: 7 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_coordinates_rejected() {
    let (mut dir, _) = directory(2);
    let (_code, _rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    let result = dir.submit_guess(pid(1), 1, 91.0, 0.0).await;
    assert!(matches!(result, Err(RoomError::InvalidGuess(_))));

    let result = dir.submit_guess(pid(1), 1, 0.0, f64::NAN).await;
    assert!(matches!(result, Err(RoomError::InvalidGuess(_))));
}

#[tokio::test(start_paused = true)]
async fn test_resubmission_overwrites_and_reannounces() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();
    drain(&mut rxs[1]);

    dir.submit_guess(pid(1), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    // Every accepted submission is announced, replacements included; the
    // event never carries coordinates, so nothing leaks.
    let events = drain(&mut rxs[1]);
    let guess_events = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::GuessSubmitted { player_id, .. } if *player_id == pid(1)))
        .count();
    assert_eq!(guess_events, 2, "each submission is signalled");

    // The replacement is what scores.
    dir.submit_guess(pid(2), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();
    let events = drain(&mut rxs[1]);
    let results = round_ended_results(&events, 1).unwrap();
    let p1 = results.iter().find(|r| r.player_id == pid(1)).unwrap();
    assert_eq!(p1.score, 1000);
}

#[tokio::test(start_paused = true)]
async fn test_round_never_ends_twice() {
    let (mut dir, _) = directory(3);
    let settings = GameSettings {
        total_rounds: 3,
        results_display_secs: 10,
        ..quick_settings()
    };
    let (_code, mut rxs) = room_with_players(&mut dir, settings, &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    // Round 1 ends early on the last guess; its 60 s deadline is cancelled
    // in the same turn. Sailing past where that deadline would have fired
    // must not produce a second RoundEnded for round 1.
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.submit_guess(pid(2), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    advance(Duration::from_secs(90)).await;

    let events = drain(&mut rxs[0]);
    assert_eq!(count_round_ended(&events, 1), 1);
}

// =========================================================================
// Advancement: countdown and manual
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_auto_advance_full_game() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    // Round 1: both guess, round ends, 2 s countdown begins.
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.submit_guess(pid(2), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();
    drain(&mut rxs[0]);

    advance(Duration::from_secs(1)).await;
    let events = drain(&mut rxs[0]);
    assert!(events.contains(&ServerEvent::CountdownTick {
        seconds_remaining: 1
    }));

    advance(Duration::from_secs(1)).await;
    let events = drain(&mut rxs[0]);
    assert!(events.contains(&ServerEvent::CountdownTick {
        seconds_remaining: 0
    }));
    assert!(events.contains(&ServerEvent::RoundStarted {
        photo_ref: "photo-2".into(),
        round_index: 2,
        time_limit_secs: Some(60),
    }));

    // Round 2 is the last: ending it ends the game.
    dir.submit_guess(pid(1), 2, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.submit_guess(pid(2), 2, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    let events = drain(&mut rxs[0]);
    assert!(round_ended_results(&events, 2).is_some());
    let standings = events
        .iter()
        .find_map(|e| match e {
            ServerEvent::GameEnded { standings } => Some(standings.clone()),
            _ => None,
        })
        .expect("game should end after the final round");

    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].player_id, pid(1), "two perfects beat one");
    assert!(standings[0].total_score >= standings[1].total_score);
}

#[tokio::test(start_paused = true)]
async fn test_manual_advance_waits_for_host() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, manual_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.submit_guess(pid(2), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    let events = drain(&mut rxs[0]);
    assert!(events.contains(&ServerEvent::NextRoundReady));

    // Time passing does nothing in manual mode.
    advance(Duration::from_secs(300)).await;
    let events = drain(&mut rxs[0]);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ServerEvent::RoundStarted { .. })),
        "manual mode must not advance on its own"
    );

    // Only the host advances.
    let result = dir.advance(pid(2)).await;
    assert!(matches!(result, Err(RoomError::NotHost(p)) if p == pid(2)));

    dir.advance(pid(1)).await.unwrap();
    let events = drain(&mut rxs[0]);
    assert!(events.contains(&ServerEvent::RoundStarted {
        photo_ref: "photo-2".into(),
        round_index: 2,
        time_limit_secs: Some(60),
    }));
}

#[tokio::test(start_paused = true)]
async fn test_host_can_cut_countdown_short() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.submit_guess(pid(2), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    drain(&mut rxs[0]);

    // Countdown is running; the host skips straight to round 2.
    dir.advance(pid(1)).await.unwrap();

    let events = drain(&mut rxs[0]);
    assert!(events
        .iter()
        .any(|e| matches!(e, ServerEvent::RoundStarted { round_index: 2, .. })));

    // The cancelled countdown must not tick afterwards.
    advance(Duration::from_secs(5)).await;
    let events = drain(&mut rxs[0]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ServerEvent::CountdownTick { .. })));
}

// =========================================================================
// Reconnection
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_resume_mid_round_gets_reduced_clock() {
    let (mut dir, _) = directory(2);
    let (code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();
    drain(&mut rxs[0]);

    dir.detach(pid(2)).await.unwrap();
    advance(Duration::from_secs(20)).await;

    let (tx, mut rx2) = player_channel();
    dir.resume(pid(2), &code, tx).await.unwrap();

    let events = drain(&mut rx2);
    let snapshot = events.iter().find_map(|e| match e {
        ServerEvent::RoomSnapshot(s) => Some(s.clone()),
        _ => None,
    });
    assert!(snapshot.is_some(), "resume must include a snapshot");

    let catch_up: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::RoundStarted { .. }))
        .collect();
    assert_eq!(catch_up.len(), 1, "exactly one catch-up round event");
    match catch_up[0] {
        ServerEvent::RoundStarted {
            round_index,
            time_limit_secs,
            ..
        } => {
            assert_eq!(*round_index, 1);
            assert_eq!(*time_limit_secs, Some(40), "60 s limit minus 20 s elapsed");
        }
        _ => unreachable!(),
    }

    // Other players get no duplicate round event from the resume.
    let p1_events = drain(&mut rxs[0]);
    assert!(!p1_events
        .iter()
        .any(|e| matches!(e, ServerEvent::RoundStarted { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_detached_player_keeps_timed_round_open() {
    let (mut dir, _) = directory(2);
    let (code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    dir.detach(pid(2)).await.unwrap();
    settle().await;

    // A timed round waits for the detached player: they may still come
    // back, and the deadline bounds the wait.
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    let events = drain(&mut rxs[0]);
    assert!(
        round_ended_results(&events, 1).is_none(),
        "round must stay open for the grace period"
    );

    // The reconnector's guess still counts, and completes the round.
    let (tx, _rx2) = player_channel();
    dir.resume(pid(2), &code, tx).await.unwrap();
    dir.submit_guess(pid(2), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();

    let events = drain(&mut rxs[0]);
    let results = round_ended_results(&events, 1).expect("round ends once everyone guessed");
    assert!(results.iter().all(|r| r.has_guessed));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_closes_round_with_detached_player() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    dir.detach(pid(2)).await.unwrap();
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    advance(Duration::from_secs(61)).await;

    let events = drain(&mut rxs[0]);
    let results = round_ended_results(&events, 1).expect("deadline closes the round");
    let detached = results.iter().find(|r| r.player_id == pid(2)).unwrap();
    assert!(!detached.has_guessed);
    assert_eq!(detached.score, 0);
}

#[tokio::test(start_paused = true)]
async fn test_detached_player_does_not_block_untimed_round() {
    let (mut dir, _) = directory(2);
    let settings = GameSettings {
        round_time_limit_secs: None,
        ..quick_settings()
    };
    let (_code, mut rxs) = room_with_players(&mut dir, settings, &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    dir.detach(pid(2)).await.unwrap();
    settle().await;

    // No deadline will ever rescue this round, so only connected players
    // are waited on.
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();

    let events = drain(&mut rxs[0]);
    let results = round_ended_results(&events, 1).expect("round should end");
    let detached = results.iter().find(|r| r.player_id == pid(2)).unwrap();
    assert!(!detached.has_guessed);
}

#[tokio::test(start_paused = true)]
async fn test_mid_game_leaver_does_not_hold_round_open() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();

    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.leave_room(pid(2)).await.unwrap();

    // The leaver is gone for good; the remaining player's guess was the
    // last one outstanding.
    let events = drain(&mut rxs[0]);
    let results = round_ended_results(&events, 1).expect("leaver must not hold the round open");
    let leaver = results.iter().find(|r| r.player_id == pid(2)).unwrap();
    assert!(!leaver.has_guessed);
}

#[tokio::test(start_paused = true)]
async fn test_request_current_round_resends_to_requester_only() {
    let (mut dir, _) = directory(2);
    let (_code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();
    drain(&mut rxs[0]);
    drain(&mut rxs[1]);

    advance(Duration::from_secs(15)).await;
    dir.current_round(pid(2)).await.unwrap();

    let events = drain(&mut rxs[1]);
    assert!(events.contains(&ServerEvent::RoundStarted {
        photo_ref: "photo-1".into(),
        round_index: 1,
        time_limit_secs: Some(45),
    }));

    assert!(drain(&mut rxs[0]).is_empty(), "no broadcast to others");
}

// =========================================================================
// Persistence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_store_receives_guesses_totals_and_status() {
    let (mut dir, store) = directory(2);
    let settings = GameSettings {
        total_rounds: 1,
        ..quick_settings()
    };
    let (code, _rxs) = room_with_players(&mut dir, settings, &[pid(1), pid(2)]).await;
    dir.start_game(pid(1)).await.unwrap();
    settle().await;

    assert_eq!(
        store.status_of(&code),
        Some(pinpoint_protocol::RoomStatus::Active)
    );

    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    dir.submit_guess(pid(2), 1, SYDNEY.lat, SYDNEY.lng).await.unwrap();
    settle().await;

    let guesses = store.guesses_for(&code);
    assert_eq!(guesses.len(), 2);
    for record in &guesses {
        assert_eq!(record.round_index, 1);
        assert_eq!(record.mode, pinpoint_protocol::GameMode::Multiplayer);
    }

    assert_eq!(store.total_for(&code, pid(1)), Some(1000));
    assert_eq!(
        store.status_of(&code),
        Some(pinpoint_protocol::RoomStatus::Finished)
    );
}

#[tokio::test(start_paused = true)]
async fn test_solo_game_recorded_as_solo_mode() {
    let (mut dir, store) = directory(2);
    let settings = GameSettings {
        total_rounds: 1,
        ..quick_settings()
    };
    let (code, _rxs) = room_with_players(&mut dir, settings, &[pid(1)]).await;
    dir.start_game(pid(1)).await.unwrap();
    dir.submit_guess(pid(1), 1, EIFFEL.lat, EIFFEL.lng).await.unwrap();
    settle().await;

    let guesses = store.guesses_for(&code);
    assert_eq!(guesses.len(), 1);
    assert_eq!(guesses[0].mode, pinpoint_protocol::GameMode::Solo);
}

// =========================================================================
// Challenge provider failure
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_challenge_failure_parks_room_for_retry() {
    let (mut dir, _) = directory(0); // provider has nothing to serve
    let (code, mut rxs) = room_with_players(&mut dir, quick_settings(), &[pid(1), pid(2)]).await;

    dir.start_game(pid(1)).await.unwrap();

    let events = drain(&mut rxs[0]);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerEvent::Error { .. })),
        "players should hear about the failure"
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, ServerEvent::RoundStarted { .. })));

    let info = dir.room_info(&code).await.unwrap();
    assert_eq!(info.phase, RoomPhase::AwaitingHost);

    // The host's advance retries the fetch (and fails again here).
    dir.advance(pid(1)).await.unwrap();
    let events = drain(&mut rxs[0]);
    assert!(events
        .iter()
        .any(|e| matches!(e, ServerEvent::Error { .. })));
}
