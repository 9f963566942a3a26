//! Exclusive timing resource held while the timer is counting.
//!
//! The platform side (a partial wake lock, an inhibitor, ...) sits behind
//! [`WakeLockBackend`]. [`WakeLock`] tracks ownership and the hard maximum
//! hold so a leaked lock expires on its own.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Longest a single acquisition may keep the device awake.
pub const DEFAULT_MAX_HOLD: Duration = Duration::from_secs(60 * 60);

pub trait WakeLockBackend: Send + Sync {
    /// Acquire with a timeout after which the platform drops the lock itself.
    fn acquire(&self, max_hold: Duration);
    fn release(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

impl WakeLockBackend for NoopWakeLock {
    fn acquire(&self, _max_hold: Duration) {}
    fn release(&self) {}
}

pub struct WakeLock {
    backend: Arc<dyn WakeLockBackend>,
    max_hold: Duration,
    acquired_at_ms: Option<u64>,
}

impl fmt::Debug for WakeLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeLock")
            .field("max_hold", &self.max_hold)
            .field("acquired_at_ms", &self.acquired_at_ms)
            .finish()
    }
}

impl WakeLock {
    pub fn new(backend: Arc<dyn WakeLockBackend>, max_hold: Duration) -> Self {
        Self {
            backend,
            max_hold,
            acquired_at_ms: None,
        }
    }

    /// Re-acquiring while held restarts the hold window.
    pub fn acquire(&mut self, now_ms: u64) {
        if self.acquired_at_ms.is_some() {
            self.backend.release();
        }
        self.backend.acquire(self.max_hold);
        self.acquired_at_ms = Some(now_ms);
    }

    pub fn release(&mut self) {
        if self.acquired_at_ms.take().is_some() {
            self.backend.release();
        }
    }

    /// False once released or once the maximum hold has run out.
    pub fn is_held(&self, now_ms: u64) -> bool {
        self.acquired_at_ms
            .map(|at| now_ms.saturating_sub(at) < u64::try_from(self.max_hold.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(false)
    }
}

impl Drop for WakeLock {
    fn drop(&mut self) {
        self.release();
    }
}
