//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task and is the single writer of everything
//! about that room: roster, phase, the active round's guess sheet, and the
//! timers. The outside world talks to it through an mpsc channel, so two
//! simultaneous guesses for the last slot are decided by channel order and
//! nothing needs a lock.
//!
//! The actor's `select!` loop multiplexes commands with its
//! [`RoundClock`]: a round ends either because the last required player
//! guessed (command path) or because the deadline fired (clock path), and
//! both funnel into the same idempotent [`end_round`](RoomActor::end_round).

use std::collections::HashMap;
use std::sync::Arc;

use pinpoint_clock::{ClockEvent, RoundClock};
use pinpoint_protocol::{
    GameMode, GameSettings, LatLng, PlayerId, PlayerSummary, RoomCode, RoomSnapshot, RoundResult,
    ServerEvent, Standing,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};

use crate::challenge::ChallengeProvider;
use crate::phase::RoomPhase;
use crate::round::ActiveRound;
use crate::store::{GameStore, GuessRecord};
use crate::RoomError;

/// Channel sender for delivering events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/response: the caller
/// awaits the reply. The rest are fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Re-attach a reconnecting player's new connection.
    Resume {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        /// Replies with the number of members still in the room.
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },
    /// The player's connection dropped; their session grace period is
    /// running. Keeps their seat and scores.
    Detach { player_id: PlayerId },
    SetReady {
        player_id: PlayerId,
        ready: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SubmitGuess {
        player_id: PlayerId,
        round_index: u32,
        lat: f64,
        lng: f64,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Re-send the current round (or a snapshot) to one player.
    CurrentRound {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Advance {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata for matchmaking and admin surfaces.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: RoomPhase,
    /// Members who haven't left (connected or in their grace period).
    pub player_count: usize,
    pub max_players: usize,
    /// 1-based index of the last started round; 0 in the lobby.
    pub current_round: u32,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub async fn join(&self, player_id: PlayerId, sender: PlayerSender) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            sender,
            reply,
        })
        .await?
    }

    pub async fn resume(&self, player_id: PlayerId, sender: PlayerSender) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Resume {
            player_id,
            sender,
            reply,
        })
        .await?
    }

    /// Removes the player. Returns how many members remain, so the caller
    /// can destroy an emptied room.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    /// Marks the player's connection as dropped without unseating them.
    pub async fn detach(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Detach { player_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    pub async fn set_ready(&self, player_id: PlayerId, ready: bool) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SetReady {
            player_id,
            ready,
            reply,
        })
        .await?
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartGame { player_id, reply })
            .await?
    }

    pub async fn submit_guess(
        &self,
        player_id: PlayerId,
        round_index: u32,
        lat: f64,
        lng: f64,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SubmitGuess {
            player_id,
            round_index,
            lat,
            lng,
            reply,
        })
        .await?
    }

    pub async fn current_round(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::CurrentRound { player_id, reply })
            .await?
    }

    pub async fn advance(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Advance { player_id, reply })
            .await?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// One seat in the room.
struct PlayerSlot {
    ready: bool,
    total_score: u32,
    /// `false` while the player's connection is down (grace period).
    connected: bool,
    /// `true` once the player left for good mid-game. Their seat and
    /// scores stay for the results, but they no longer count for
    /// completion and cannot resume.
    departed: bool,
}

impl PlayerSlot {
    fn new() -> Self {
        Self {
            ready: false,
            total_score: 0,
            connected: true,
            departed: false,
        }
    }
}

/// The room actor state. Runs inside a Tokio task; see the module docs.
struct RoomActor<S, P> {
    code: RoomCode,
    phase: RoomPhase,
    settings: GameSettings,
    host: PlayerId,
    /// Join order. Drives tie-breaks in results and standings.
    roster: Vec<PlayerId>,
    slots: HashMap<PlayerId, PlayerSlot>,
    senders: HashMap<PlayerId, PlayerSender>,
    /// The single active-round slot. `Some` only in `RoundActive`; taking
    /// the value is what closes the round.
    round: Option<ActiveRound>,
    /// Number of rounds started so far.
    rounds_played: u32,
    mode: GameMode,
    clock: RoundClock,
    store: Arc<S>,
    challenges: Arc<P>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: GameStore, P: ChallengeProvider> RoomActor<S, P> {
    async fn run(mut self) {
        tracing::info!(room = %self.code, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).await {
                            break;
                        }
                    }
                    None => break,
                },
                event = self.clock.wait() => match event {
                    ClockEvent::DeadlineElapsed => {
                        tracing::debug!(room = %self.code, "round deadline elapsed");
                        self.end_round().await;
                    }
                    ClockEvent::CountdownTick { seconds_remaining } => {
                        self.broadcast(ServerEvent::CountdownTick { seconds_remaining });
                        if seconds_remaining == 0 {
                            self.start_round().await;
                        }
                    }
                },
            }
        }

        tracing::info!(room = %self.code, "room actor stopped");
    }

    /// Handles one command. Returns `true` when the actor should stop.
    async fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Resume {
                player_id,
                sender,
                reply,
            } => {
                let result = self.handle_resume(player_id, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id).await;
                let empty = matches!(result, Ok(0));
                let _ = reply.send(result);
                if empty {
                    tracing::info!(room = %self.code, "last player left, room closing");
                    return true;
                }
            }
            RoomCommand::Detach { player_id } => {
                self.handle_detach(player_id);
            }
            RoomCommand::SetReady {
                player_id,
                ready,
                reply,
            } => {
                let result = self.handle_set_ready(player_id, ready);
                let _ = reply.send(result);
            }
            RoomCommand::StartGame { player_id, reply } => {
                let result = self.handle_start_game(player_id).await;
                let _ = reply.send(result);
            }
            RoomCommand::SubmitGuess {
                player_id,
                round_index,
                lat,
                lng,
                reply,
            } => {
                let result = self.handle_submit_guess(player_id, round_index, lat, lng).await;
                let _ = reply.send(result);
            }
            RoomCommand::CurrentRound { player_id, reply } => {
                let result = self.handle_current_round(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::Advance { player_id, reply } => {
                let result = self.handle_advance(player_id).await;
                let _ = reply.send(result);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.code, "room shutting down");
                return true;
            }
        }
        false
    }

    // -- membership -------------------------------------------------------

    fn handle_join(&mut self, player_id: PlayerId, sender: PlayerSender) -> Result<(), RoomError> {
        if self.is_member(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.code.clone()));
        }
        if !self.phase.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in phase {}",
                self.phase
            )));
        }
        if self.member_count() >= self.settings.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        self.roster.push(player_id);
        self.slots.insert(player_id, PlayerSlot::new());
        self.senders.insert(player_id, sender);

        tracing::info!(
            room = %self.code,
            %player_id,
            players = self.member_count(),
            "player joined"
        );

        self.broadcast_except(player_id, ServerEvent::PlayerJoined { player_id });
        self.send_to(player_id, ServerEvent::RoomSnapshot(self.snapshot()));
        Ok(())
    }

    fn handle_resume(
        &mut self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        let slot = self.slots.get_mut(&player_id).expect("member has a slot");
        slot.connected = true;
        self.senders.insert(player_id, sender);

        tracing::info!(room = %self.code, %player_id, "player resumed");

        // Catch them up: the lobby view, plus the live round with however
        // much time is actually left on its clock. Sent to this connection
        // only — other players already saw the original RoundStarted.
        self.send_to(player_id, ServerEvent::RoomSnapshot(self.snapshot()));
        if let Some(round) = &self.round {
            let remaining =
                round.remaining_secs(self.settings.round_time_limit_secs, Instant::now());
            self.send_to(
                player_id,
                ServerEvent::RoundStarted {
                    photo_ref: round.challenge.photo_ref.clone(),
                    round_index: round.index,
                    time_limit_secs: remaining,
                },
            );
        }
        Ok(())
    }

    async fn handle_leave(&mut self, player_id: PlayerId) -> Result<usize, RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }

        if self.phase.in_game() {
            // Keep the seat so their scores survive into the results.
            let slot = self.slots.get_mut(&player_id).expect("member has a slot");
            slot.departed = true;
            slot.connected = false;
            self.senders.remove(&player_id);
        } else {
            self.roster.retain(|p| *p != player_id);
            self.slots.remove(&player_id);
            self.senders.remove(&player_id);
        }

        tracing::info!(
            room = %self.code,
            %player_id,
            players = self.member_count(),
            "player left"
        );
        self.broadcast(ServerEvent::PlayerLeft { player_id });

        if player_id == self.host {
            if let Some(next_host) = self.roster.iter().copied().find(|p| self.is_member(p)) {
                self.host = next_host;
                tracing::info!(room = %self.code, new_host = %next_host, "host migrated");
                self.broadcast(ServerEvent::RoomSnapshot(self.snapshot()));
            }
        }

        // A departing non-guesser may have been the last thing holding the
        // round open.
        self.maybe_complete_round().await;

        Ok(self.member_count())
    }

    fn handle_detach(&mut self, player_id: PlayerId) {
        if let Some(slot) = self.slots.get_mut(&player_id) {
            if !slot.departed {
                slot.connected = false;
                self.senders.remove(&player_id);
                tracing::info!(room = %self.code, %player_id, "player connection dropped");
            }
        }
    }

    // -- lobby ------------------------------------------------------------

    fn handle_set_ready(&mut self, player_id: PlayerId, ready: bool) -> Result<(), RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::InvalidState(format!(
                "cannot change readiness in phase {}",
                self.phase
            )));
        }
        self.slots.get_mut(&player_id).expect("member has a slot").ready = ready;
        self.broadcast(ServerEvent::PlayerReadyChanged { player_id, ready });
        Ok(())
    }

    async fn handle_start_game(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        if player_id != self.host {
            return Err(RoomError::NotHost(player_id));
        }
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::InvalidState(format!(
                "cannot start game in phase {}",
                self.phase
            )));
        }

        self.mode = if self.member_count() == 1 {
            GameMode::Solo
        } else {
            GameMode::Multiplayer
        };

        tracing::info!(
            room = %self.code,
            players = self.member_count(),
            mode = ?self.mode,
            "game started"
        );
        self.broadcast(ServerEvent::GameStarted);
        // Persist after the phase transition, not before: the wire status
        // must read Active (even when the first fetch parks the room).
        self.start_round().await;
        self.persist_status();
        Ok(())
    }

    // -- rounds -----------------------------------------------------------

    /// Fetches the next challenge and opens a round. On provider failure
    /// the room parks in `AwaitingHost` so the host's advance retries.
    async fn start_round(&mut self) {
        debug_assert!(self.round.is_none(), "active round slot must be empty");
        self.broadcast(ServerEvent::LoadingNextRound);

        let challenge = match self.challenges.next_challenge().await {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(room = %self.code, error = %err, "challenge fetch failed");
                self.phase = RoomPhase::AwaitingHost;
                self.broadcast(ServerEvent::Error {
                    message: format!("could not load the next round: {err}"),
                });
                return;
            }
        };

        self.rounds_played += 1;
        let limit = self.settings.round_time_limit_secs;
        let deadline = limit.map(|secs| {
            let d = Duration::from_secs(u64::from(secs));
            self.clock.arm_deadline(d);
            Instant::now() + d
        });
        let round = ActiveRound::new(self.rounds_played, challenge, deadline);
        self.phase = RoomPhase::RoundActive;

        tracing::info!(
            room = %self.code,
            round_index = round.index,
            photo = %round.challenge.photo_ref,
            "round started"
        );
        self.broadcast(ServerEvent::RoundStarted {
            photo_ref: round.challenge.photo_ref.clone(),
            round_index: round.index,
            time_limit_secs: limit,
        });
        self.round = Some(round);
    }

    async fn handle_submit_guess(
        &mut self,
        player_id: PlayerId,
        round_index: u32,
        lat: f64,
        lng: f64,
    ) -> Result<(), RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }

        let required = self.completion_players();
        let round = self
            .round
            .as_mut()
            .ok_or(RoomError::RoundClosed { round_index })?;
        if round.index != round_index {
            return Err(RoomError::RoundClosed { round_index });
        }

        round
            .guesses
            .submit(player_id, LatLng::new(lat, lng), Instant::now())?;
        let complete = round.guesses.is_complete(required.iter());

        tracing::debug!(
            room = %self.code,
            %player_id,
            round_index,
            guesses = self.round.as_ref().map(|r| r.guesses.count()).unwrap_or(0),
            "guess recorded"
        );
        // Announced for replacements too; the payload carries no
        // coordinates, only who has a guess locked in.
        self.broadcast(ServerEvent::GuessSubmitted {
            player_id,
            round_index,
        });
        if complete {
            self.end_round().await;
        }
        Ok(())
    }

    /// Ends a round early if everyone who counts has now guessed.
    async fn maybe_complete_round(&mut self) {
        let required = self.completion_players();
        let complete = match &self.round {
            Some(round) => !required.is_empty() && round.guesses.is_complete(required.iter()),
            None => false,
        };
        if complete {
            self.end_round().await;
        }
    }

    /// Closes the active round, broadcasts results, and decides what
    /// happens next. Idempotent: the deadline and an all-guessed
    /// completion can race, and whichever runs second finds the slot
    /// empty and does nothing.
    async fn end_round(&mut self) {
        let Some(round) = self.round.take() else {
            return;
        };
        self.clock.cancel_deadline();
        self.phase = RoomPhase::Resolving;

        let roster: Vec<PlayerId> = self.roster.clone();
        let mut totals: HashMap<PlayerId, u32> = self
            .slots
            .iter()
            .map(|(p, s)| (*p, s.total_score))
            .collect();
        let results = round.resolve(&roster, &mut totals);
        for result in &results {
            if let Some(slot) = self.slots.get_mut(&result.player_id) {
                slot.total_score = result.total_score;
            }
        }

        tracing::info!(
            room = %self.code,
            round_index = round.index,
            guesses = round.guesses.count(),
            "round ended"
        );

        self.persist_round(&round, &results);
        self.broadcast(ServerEvent::RoundEnded {
            round_index: round.index,
            results,
            true_location: round.challenge.location,
            photo_ref: round.challenge.photo_ref.clone(),
        });

        if round.index >= self.settings.total_rounds {
            self.finish_game();
        } else if self.settings.auto_advance {
            if self.settings.results_display_secs > 0 {
                self.phase = RoomPhase::Countdown;
                self.clock.start_countdown(self.settings.results_display_secs);
            } else {
                self.start_round().await;
            }
        } else {
            self.phase = RoomPhase::AwaitingHost;
            self.broadcast(ServerEvent::NextRoundReady);
        }
    }

    async fn handle_advance(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        if player_id != self.host {
            return Err(RoomError::NotHost(player_id));
        }
        match self.phase {
            RoomPhase::AwaitingHost => {}
            // The host may cut the results countdown short.
            RoomPhase::Countdown => self.clock.cancel_countdown(),
            _ => {
                return Err(RoomError::InvalidState(format!(
                    "cannot advance in phase {}",
                    self.phase
                )));
            }
        }
        self.start_round().await;
        Ok(())
    }

    fn handle_current_round(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.is_member(&player_id) {
            return Err(RoomError::NotInRoom(player_id));
        }
        match &self.round {
            Some(round) => {
                let remaining =
                    round.remaining_secs(self.settings.round_time_limit_secs, Instant::now());
                self.send_to(
                    player_id,
                    ServerEvent::RoundStarted {
                        photo_ref: round.challenge.photo_ref.clone(),
                        round_index: round.index,
                        time_limit_secs: remaining,
                    },
                );
            }
            None => {
                self.send_to(player_id, ServerEvent::RoomSnapshot(self.snapshot()));
            }
        }
        Ok(())
    }

    fn finish_game(&mut self) {
        self.phase = RoomPhase::Finished;

        let mut standings: Vec<Standing> = self
            .roster
            .iter()
            .filter_map(|p| {
                self.slots.get(p).map(|s| Standing {
                    player_id: *p,
                    total_score: s.total_score,
                })
            })
            .collect();
        standings.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        tracing::info!(room = %self.code, "game finished");
        self.broadcast(ServerEvent::GameEnded { standings });
        self.persist_status();
    }

    // -- persistence ------------------------------------------------------

    /// Fire-and-forget: results are written behind the broadcast. A dead
    /// store costs history, not gameplay.
    fn persist_round(&self, round: &ActiveRound, results: &[RoundResult]) {
        let store = Arc::clone(&self.store);
        let room = self.code.clone();
        let mode = self.mode;
        let round_index = round.index;
        let rows: Vec<(GuessRecord, u32)> = results
            .iter()
            .filter_map(|r| {
                let guess = r.guess?;
                Some((
                    GuessRecord {
                        room: room.clone(),
                        player_id: r.player_id,
                        round_index,
                        guess,
                        distance_km: r.distance_km,
                        score: r.score,
                        mode,
                    },
                    r.total_score,
                ))
            })
            .collect();

        tokio::spawn(async move {
            for (record, total) in rows {
                let player_id = record.player_id;
                if let Err(err) = store.record_guess(record).await {
                    tracing::warn!(%room, %player_id, error = %err, "failed to persist guess");
                }
                if let Err(err) = store.update_total_score(room.clone(), player_id, total).await {
                    tracing::warn!(%room, %player_id, error = %err, "failed to persist total");
                }
            }
        });
    }

    fn persist_status(&self) {
        let store = Arc::clone(&self.store);
        let room = self.code.clone();
        let status = self.phase.wire_status();
        tokio::spawn(async move {
            if let Err(err) = store.set_room_status(room.clone(), status).await {
                tracing::warn!(%room, %status, error = %err, "failed to persist room status");
            }
        });
    }

    // -- helpers ----------------------------------------------------------

    fn is_member(&self, player_id: &PlayerId) -> bool {
        self.slots.get(player_id).is_some_and(|s| !s.departed)
    }

    fn member_count(&self) -> usize {
        self.slots.values().filter(|s| !s.departed).count()
    }

    /// Players whose guesses are required before a round can end early.
    ///
    /// In a timed round every member counts, connected or not: a player
    /// in their reconnect grace period may still come back and submit, and
    /// the deadline bounds how long the room waits for them. In an untimed
    /// room only connected players count, so a vanished player cannot hold
    /// the round open forever. Departed players never count.
    fn completion_players(&self) -> Vec<PlayerId> {
        let timed = self.settings.round_time_limit_secs.is_some();
        self.roster
            .iter()
            .filter(|p| {
                self.slots
                    .get(*p)
                    .is_some_and(|s| !s.departed && (timed || s.connected))
            })
            .copied()
            .collect()
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room: self.code.clone(),
            status: self.phase.wire_status(),
            host: self.host,
            players: self
                .roster
                .iter()
                .filter_map(|p| {
                    let slot = self.slots.get(p)?;
                    if slot.departed {
                        return None;
                    }
                    Some(PlayerSummary {
                        player_id: *p,
                        ready: slot.ready,
                        total_score: slot.total_score,
                        connected: slot.connected,
                    })
                })
                .collect(),
            current_round: self.rounds_played,
            settings: self.settings.clone(),
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            phase: self.phase,
            player_count: self.member_count(),
            max_players: self.settings.max_players,
            current_round: self.rounds_played,
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn broadcast_except(&self, excluded: PlayerId, event: ServerEvent) {
        for (pid, sender) in &self.senders {
            if *pid != excluded {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Sends to one player. Silently drops if their channel is gone.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
///
/// The host is recorded but not yet a member — the caller joins them
/// through the handle like anyone else.
pub(crate) fn spawn_room<S: GameStore, P: ChallengeProvider>(
    code: RoomCode,
    host: PlayerId,
    settings: GameSettings,
    store: Arc<S>,
    challenges: Arc<P>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        code: code.clone(),
        phase: RoomPhase::Waiting,
        settings,
        host,
        roster: Vec::new(),
        slots: HashMap::new(),
        senders: HashMap::new(),
        round: None,
        rounds_played: 0,
        mode: GameMode::Multiplayer,
        clock: RoundClock::new(),
        store,
        challenges,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
