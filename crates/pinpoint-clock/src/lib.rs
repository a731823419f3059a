//! Timers for the round engine: a one-shot round deadline and a 1 Hz
//! results countdown.
//!
//! One [`RoundClock`] lives inside each room actor and is multiplexed into
//! the actor's `tokio::select!` loop through [`RoundClock::wait`]:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = clock.wait() => match event {
//!             ClockEvent::DeadlineElapsed => { /* end the round */ }
//!             ClockEvent::CountdownTick { seconds_remaining } => { /* tick */ }
//!         }
//!     }
//! }
//! ```
//!
//! When nothing is armed, `wait` pends forever, so the select loop simply
//! processes commands. Both timers are cancellable, and `wait` mutates no
//! state until a timer actually fires, which makes it safe to drop the
//! future when another select branch wins.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

/// What fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// The round's hard deadline elapsed. The deadline disarms itself;
    /// re-arm it for the next round.
    DeadlineElapsed,
    /// One second of the results countdown passed. `seconds_remaining`
    /// counts down to 0; the countdown disarms itself after the 0 tick.
    CountdownTick { seconds_remaining: u32 },
}

struct Countdown {
    next: TokioInstant,
    remaining: u32,
}

/// The per-room timer pair: round deadline + results countdown.
#[derive(Default)]
pub struct RoundClock {
    deadline: Option<TokioInstant>,
    countdown: Option<Countdown>,
}

impl RoundClock {
    pub fn new() -> Self {
        Self {
            deadline: None,
            countdown: None,
        }
    }

    /// Arms the round deadline to fire after `limit`. Replaces any
    /// previously armed deadline.
    pub fn arm_deadline(&mut self, limit: Duration) {
        self.deadline = Some(TokioInstant::now() + limit);
        debug!(limit_secs = limit.as_secs(), "round deadline armed");
    }

    /// Disarms the deadline. Returns `true` if one was armed.
    ///
    /// Called inside the end-round transition so that a deadline racing
    /// with an all-players-guessed completion can never fire twice.
    pub fn cancel_deadline(&mut self) -> bool {
        let was_armed = self.deadline.take().is_some();
        if was_armed {
            debug!("round deadline cancelled");
        }
        was_armed
    }

    pub fn deadline_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Starts a countdown of `seconds` ticks, one per second. The first
    /// tick fires one second from now with `seconds - 1` remaining.
    ///
    /// `seconds` must be non-zero; a zero-length countdown is the
    /// caller's no-countdown case.
    pub fn start_countdown(&mut self, seconds: u32) {
        debug_assert!(seconds > 0, "zero-length countdown");
        self.countdown = Some(Countdown {
            next: TokioInstant::now() + Duration::from_secs(1),
            remaining: seconds,
        });
        debug!(seconds, "results countdown started");
    }

    /// Stops the countdown, if one is running.
    pub fn cancel_countdown(&mut self) {
        if self.countdown.take().is_some() {
            debug!("results countdown cancelled");
        }
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown.is_some()
    }

    /// `true` when neither timer is armed — `wait` would pend forever.
    pub fn is_idle(&self) -> bool {
        self.deadline.is_none() && self.countdown.is_none()
    }

    /// Waits for the next timer event. Pends forever while idle.
    ///
    /// Cancel-safe: no internal state changes until a timer fires.
    pub async fn wait(&mut self) -> ClockEvent {
        enum Arm {
            Deadline,
            Tick,
        }

        let deadline = self.deadline;
        let next_tick = self.countdown.as_ref().map(|c| c.next);

        let fired = tokio::select! {
            () = sleep_opt(deadline) => Arm::Deadline,
            () = sleep_opt(next_tick) => Arm::Tick,
        };

        match fired {
            Arm::Deadline => {
                self.deadline = None;
                trace!("deadline elapsed");
                ClockEvent::DeadlineElapsed
            }
            Arm::Tick => {
                // The tick arm can only win while a countdown is armed;
                // sleep_opt(None) never resolves.
                let mut remaining = 0;
                if let Some(c) = self.countdown.as_mut() {
                    c.remaining -= 1;
                    c.next += Duration::from_secs(1);
                    remaining = c.remaining;
                }
                if remaining == 0 {
                    self.countdown = None;
                }
                trace!(remaining, "countdown tick");
                ClockEvent::CountdownTick {
                    seconds_remaining: remaining,
                }
            }
        }
    }
}

/// Sleeps until the given instant, or forever when `None`.
async fn sleep_opt(until: Option<TokioInstant>) {
    match until {
        Some(t) => time::sleep_until(t).await,
        None => std::future::pending().await,
    }
}
