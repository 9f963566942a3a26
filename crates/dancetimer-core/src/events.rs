use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::DanceRecord;

/// Every timer transition produces an Event.
/// The service broadcasts them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        rule_name: String,
        rule_id: Option<i64>,
        is_auto_started: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    /// A new song began (unadjusted by the stop buffer).
    SongReached {
        song_index: u64,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Session ended; `record` is ready to persist (its id is still 0).
    TimerStopped {
        record: DanceRecord,
        song_count: u64,
        is_grace_applied: bool,
        saved_amount: f64,
        at: DateTime<Utc>,
    },
    /// An auto-started session was discarded as a false trigger.
    AutoStartCancelled {
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Finished summary dismissed.
    Acknowledged {
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::TimerPaused {
            elapsed_seconds: 42,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerPaused");
        assert_eq!(json["elapsed_seconds"], 42);
    }
}
