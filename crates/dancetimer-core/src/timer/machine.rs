//! Timer state machine.
//!
//! Like the billing engine it runs on, the machine has no internal thread:
//! the owner calls [`TimerMachine::tick`] periodically and forwards user
//! commands. Every derived field is recomputed from the monotonic anchor, so
//! late, missed or duplicated ticks all converge on the same state.
//!
//! ## State Transitions
//!
//! ```text
//!            start            stop
//! Idle ───────────────► Running ──────────► Finished
//!  ▲                    │   ▲                  │
//!  │       cancel_auto  │   │ resume           │ acknowledge
//!  ├────────────────────┘   │                  │
//!  │                  pause ▼                  │
//!  │                 Running(paused)           │
//!  └───────────────────────────────────────────┘
//! ```
//!
//! Commands that do not apply to the current state return `None` and leave
//! everything untouched.

use std::sync::Arc;
use std::time::Duration;

use crate::billing::{current_song_index, BillingPolicy};
use crate::events::Event;
use crate::feedback::{Cue, Feedback, NoFeedback};
use crate::pricing::PricingRule;
use crate::storage::DanceRecord;

use super::clock::Clock;
use super::session::Session;
use super::state::{FinishedState, RunningState, TimerState};
use super::wake_lock::{NoopWakeLock, WakeLock, WakeLockBackend, DEFAULT_MAX_HOLD};

/// How long an auto-started session can be cancelled as a false trigger.
pub const DEFAULT_AUTO_CONFIRM_SECONDS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSettings {
    pub billing: BillingPolicy,
    pub auto_confirm_seconds: u64,
    /// Pulse when a new song starts. Transition pulses are always on.
    pub haptic_on_song_boundary: bool,
    pub wake_lock_max_hold: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            billing: BillingPolicy::default(),
            auto_confirm_seconds: DEFAULT_AUTO_CONFIRM_SECONDS,
            haptic_on_song_boundary: true,
            wake_lock_max_hold: DEFAULT_MAX_HOLD,
        }
    }
}

pub struct TimerMachine {
    settings: TimerSettings,
    clock: Arc<dyn Clock>,
    feedback: Arc<dyn Feedback>,
    wake_lock: WakeLock,
    /// `Some` exactly while the state is `Running`.
    session: Option<Session>,
    state: TimerState,
}

impl std::fmt::Debug for TimerMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerMachine")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TimerMachine {
    /// Create an idle machine with no haptics and no platform wake lock.
    pub fn new(clock: Arc<dyn Clock>, settings: TimerSettings) -> Self {
        Self {
            wake_lock: WakeLock::new(Arc::new(NoopWakeLock), settings.wake_lock_max_hold),
            settings,
            clock,
            feedback: Arc::new(NoFeedback),
            session: None,
            state: TimerState::Idle,
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn Feedback>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_wake_lock(mut self, backend: Arc<dyn WakeLockBackend>) -> Self {
        self.wake_lock = WakeLock::new(backend, self.settings.wake_lock_max_hold);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Running and not paused: the periodic tick should be live.
    pub fn is_ticking(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_paused)
    }

    pub fn holds_wake_lock(&self) -> bool {
        self.wake_lock.is_held(self.clock.now_monotonic_ms())
    }

    pub fn set_haptic_on_song_boundary(&mut self, enabled: bool) {
        self.settings.haptic_on_song_boundary = enabled;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session billed by `rule`. `None` runs the session at zero cost.
    pub fn start(&mut self, rule: Option<PricingRule>, is_auto: bool) -> Option<Event> {
        if !self.state.is_idle() {
            return None;
        }
        let now = self.clock.now_monotonic_ms();
        let session = Session::new(rule, is_auto, now, self.clock.now_wall());
        let event = Event::TimerStarted {
            rule_name: session.rule_name.clone(),
            rule_id: session.rule_id,
            is_auto_started: is_auto,
            at: session.start_wall,
        };
        tracing::info!(
            rule = %session.rule_name,
            tiers = session.tiers.len(),
            auto = is_auto,
            "timer started"
        );
        self.session = Some(session);
        self.wake_lock.acquire(now);
        self.feedback.pulse(Cue::Started);
        self.refresh(now);
        Some(event)
    }

    /// Re-derive the running state. Returns `SongReached` when a new song
    /// started since the last tick.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now_monotonic_ms();
        let auto_confirm = self.settings.auto_confirm_seconds;
        let session = self.session.as_mut().filter(|s| !s.is_paused)?;

        let elapsed = session.elapsed_seconds(now);
        if session.is_auto_started && elapsed >= auto_confirm {
            session.is_auto_started = false;
            tracing::debug!(elapsed, "auto-start confirmed");
        }
        let song_index = current_song_index(elapsed, &session.tiers);
        let reached = song_index > session.last_song_index;
        if reached {
            session.last_song_index = song_index;
        }

        self.refresh(now);

        if !reached {
            return None;
        }
        tracing::debug!(song_index, elapsed, "song boundary");
        if self.settings.haptic_on_song_boundary {
            self.feedback.pulse(Cue::SongBoundary { song_index });
        }
        Some(Event::SongReached {
            song_index,
            elapsed_seconds: elapsed,
            at: self.clock.now_wall(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        let now = self.clock.now_monotonic_ms();
        let session = self.session.as_mut().filter(|s| !s.is_paused)?;
        session.pause(now);
        let elapsed = session.paused_accumulated_seconds;
        tracing::info!(elapsed, "timer paused");

        self.wake_lock.release();
        self.feedback.pulse(Cue::Paused);
        self.refresh(now);
        Some(Event::TimerPaused {
            elapsed_seconds: elapsed,
            at: self.clock.now_wall(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        let now = self.clock.now_monotonic_ms();
        let session = self.session.as_mut().filter(|s| s.is_paused)?;
        session.resume(now);
        let elapsed = session.paused_accumulated_seconds;
        tracing::info!(elapsed, "timer resumed");

        self.wake_lock.acquire(now);
        self.feedback.pulse(Cue::Resumed);
        self.refresh(now);
        Some(Event::TimerResumed {
            elapsed_seconds: elapsed,
            at: self.clock.now_wall(),
        })
    }

    /// Close the session with its final buffered bill. The returned event
    /// carries the record to persist.
    pub fn stop(&mut self) -> Option<Event> {
        let now = self.clock.now_monotonic_ms();
        let session = self.session.take()?;
        self.wake_lock.release();

        let end_time = self.clock.now_wall();
        let elapsed = session.elapsed_seconds(now);
        let quote = self.settings.billing.quote(elapsed, &session.tiers);
        let record = DanceRecord {
            id: 0,
            start_time: session.start_wall,
            end_time,
            duration_seconds: elapsed,
            cost: quote.cost,
            pricing_rule_name: session.rule_name.clone(),
            pricing_rule_id: session.rule_id,
        };
        self.state = TimerState::Finished(FinishedState {
            duration_seconds: elapsed,
            cost: quote.cost,
            song_count: quote.song_count,
            rule_name: session.rule_name,
            rule_id: session.rule_id,
            start_time: session.start_wall,
            end_time,
            is_grace_applied: quote.is_in_grace_period,
            saved_amount: quote.grace_saved_amount,
        });
        tracing::info!(
            elapsed,
            cost = quote.cost,
            songs = quote.song_count,
            grace = quote.is_in_grace_period,
            "timer stopped"
        );
        self.feedback.pulse(Cue::Stopped);
        Some(Event::TimerStopped {
            record,
            song_count: quote.song_count,
            is_grace_applied: quote.is_in_grace_period,
            saved_amount: quote.grace_saved_amount,
            at: end_time,
        })
    }

    /// Discard an auto-started session while it is still inside the
    /// confirmation window. Nothing is recorded.
    pub fn cancel_auto(&mut self) -> Option<Event> {
        let now = self.clock.now_monotonic_ms();
        let auto_confirm = self.settings.auto_confirm_seconds;
        let session = self.session.as_ref()?;
        let elapsed = session.elapsed_seconds(now);
        if !session.is_auto_started || elapsed >= auto_confirm {
            return None;
        }
        self.session = None;
        self.wake_lock.release();
        self.state = TimerState::Idle;
        tracing::info!(elapsed, "auto-started session cancelled");
        self.feedback.pulse(Cue::Cancelled);
        Some(Event::AutoStartCancelled {
            elapsed_seconds: elapsed,
            at: self.clock.now_wall(),
        })
    }

    /// Dismiss the finished summary.
    pub fn acknowledge(&mut self) -> Option<Event> {
        if !self.state.is_finished() {
            return None;
        }
        self.state = TimerState::Idle;
        Some(Event::Acknowledged {
            at: self.clock.now_wall(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn refresh(&mut self, now_ms: u64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let elapsed = session.elapsed_seconds(now_ms);
        let quote = self.settings.billing.quote(elapsed, &session.tiers);
        self.state = TimerState::Running(RunningState {
            elapsed_seconds: elapsed,
            current_song_index: quote.current_song_index,
            cost: quote.cost,
            song_count: quote.song_count,
            start_time: session.start_wall,
            tiers: session.tiers.clone(),
            rule_name: session.rule_name.clone(),
            rule_id: session.rule_id,
            is_paused: session.is_paused,
            is_in_grace_period: quote.is_in_grace_period,
            grace_remaining_seconds: quote.grace_remaining_seconds,
            is_auto_started: session.is_auto_started
                && elapsed < self.settings.auto_confirm_seconds,
        });
    }
}
