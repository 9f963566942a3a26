use chrono::{DateTime, Utc};

use crate::pricing::{PriceTier, PricingRule};

/// Name shown for sessions started without any pricing rule.
pub const NO_RULE_NAME: &str = "No rule configured";

/// The one live dance session. Owned by the timer state machine.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    /// Monotonic anchor; elapsed time is always `now - start_monotonic_ms`.
    pub start_monotonic_ms: u64,
    pub start_wall: DateTime<Utc>,
    pub tiers: Vec<PriceTier>,
    pub rule_name: String,
    pub rule_id: Option<i64>,
    pub paused_accumulated_seconds: u64,
    pub is_auto_started: bool,
    pub is_paused: bool,
    pub last_song_index: u64,
}

impl Session {
    pub fn new(
        rule: Option<PricingRule>,
        is_auto_started: bool,
        now_ms: u64,
        now_wall: DateTime<Utc>,
    ) -> Self {
        let (tiers, rule_name, rule_id) = match rule {
            Some(rule) => (rule.sorted_tiers(), rule.name, Some(rule.id)),
            None => (Vec::new(), NO_RULE_NAME.to_string(), None),
        };
        Self {
            start_monotonic_ms: now_ms,
            start_wall: now_wall,
            tiers,
            rule_name,
            rule_id,
            paused_accumulated_seconds: 0,
            is_auto_started,
            is_paused: false,
            last_song_index: 0,
        }
    }

    /// Whole seconds danced. Frozen while paused.
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        if self.is_paused {
            self.paused_accumulated_seconds
        } else {
            now_ms.saturating_sub(self.start_monotonic_ms) / 1000
        }
    }

    pub fn pause(&mut self, now_ms: u64) {
        self.paused_accumulated_seconds = self.elapsed_seconds(now_ms);
        self.is_paused = true;
    }

    /// Rebase the anchor so elapsed time continues from the frozen value.
    pub fn resume(&mut self, now_ms: u64) {
        self.start_monotonic_ms =
            now_ms.saturating_sub(self.paused_accumulated_seconds.saturating_mul(1000));
        self.is_paused = false;
    }
}
