//! Haptic feedback hook.
//!
//! The timer pulses on every transition and, when the user allows it, on
//! every song boundary. Pulses are fire-and-forget.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum Cue {
    Started,
    Paused,
    Resumed,
    Stopped,
    Cancelled,
    SongBoundary { song_index: u64 },
}

pub trait Feedback: Send + Sync {
    fn pulse(&self, cue: Cue);
}

/// Discards every pulse.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn pulse(&self, _cue: Cue) {}
}

/// Reports pulses through `tracing`; stands in for a vibrator on hosts
/// without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn pulse(&self, cue: Cue) {
        tracing::debug!(?cue, "haptic pulse");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every cue it receives.
    #[derive(Debug, Default)]
    pub struct RecordingFeedback {
        pub cues: Mutex<Vec<Cue>>,
    }

    impl RecordingFeedback {
        pub fn take(&self) -> Vec<Cue> {
            std::mem::take(&mut *self.cues.lock().unwrap())
        }
    }

    impl Feedback for RecordingFeedback {
        fn pulse(&self, cue: Cue) {
            self.cues.lock().unwrap().push(cue);
        }
    }
}
