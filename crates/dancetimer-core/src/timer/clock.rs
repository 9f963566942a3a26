//! Time sources for the timer.
//!
//! Elapsed time is always measured on the monotonic clock; the wall clock is
//! only used to stamp records.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub trait Clock: Send + Sync {
    /// Milliseconds on a clock that never jumps backwards.
    fn now_monotonic_ms(&self) -> u64;
    fn now_wall(&self) -> DateTime<Utc>;
}

/// Process clock backed by tokio's [`Instant`].
///
/// Outside a paused test runtime this is the OS monotonic clock; whether it
/// keeps counting through device suspend is platform dependent.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays. Both clocks advance together.
#[derive(Debug)]
pub struct ManualClock {
    monotonic_ms: AtomicU64,
    wall: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(wall_start: DateTime<Utc>) -> Self {
        Self {
            monotonic_ms: AtomicU64::new(0),
            wall: Mutex::new(wall_start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.monotonic_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        if let Ok(mut wall) = self.wall.lock() {
            *wall += chrono::Duration::milliseconds(by.as_millis() as i64);
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn now_monotonic_ms(&self) -> u64 {
        self.monotonic_ms.load(Ordering::SeqCst)
    }

    fn now_wall(&self) -> DateTime<Utc> {
        self.wall.lock().map(|w| *w).unwrap_or_else(|p| *p.into_inner())
    }
}
