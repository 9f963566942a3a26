//! Half-song midpoint billing with a stop buffer.
//!
//! Every function here is a pure function of `(elapsed_seconds, tiers)`:
//! the timer re-derives the whole bill from elapsed time on each tick, so a
//! late or duplicated tick can never double-charge.
//!
//! ## Rules
//!
//! - Only the shortest tier is used. Its duration is the billing period
//!   (one song) and its price is charged per song.
//! - A song is charged once the elapsed time passes its midpoint:
//!   `charged = floor(t / period + 0.5)`.
//! - Right after a song boundary there is a grace window of
//!   `min(grace_seconds, period / 2)` seconds. Inside it the bill is pinned
//!   to one second before the boundary.
//! - With no tiers, or a tier whose period rounds to zero, every output is
//!   zero and the timer keeps running.
//!
//! ```text
//! 4 min / 20:   0:00-1:59 -> 0    2:00-5:59 -> 20    6:00-9:59 -> 40
//! 3 min / 10:   0:00-1:29 -> 0    1:30-4:29 -> 10    4:30-7:29 -> 20
//! ```

use serde::{Deserialize, Serialize};

use crate::pricing::PriceTier;

/// Default stop buffer after each song boundary.
pub const DEFAULT_GRACE_SECONDS: u64 = 30;

/// The single tier billing runs on, resolved once per calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meter {
    period_secs: u64,
    duration_minutes: f64,
    price: f64,
}

impl Meter {
    /// Pick the shortest tier. Returns `None` when there is nothing to bill.
    pub fn from_tiers(tiers: &[PriceTier]) -> Option<Self> {
        let first = tiers
            .iter()
            .min_by(|a, b| a.duration_minutes.total_cmp(&b.duration_minutes))?;
        let period = first.period_secs();
        if period <= 0 {
            return None;
        }
        Some(Self {
            period_secs: period as u64,
            duration_minutes: first.duration_minutes,
            price: first.price,
        })
    }

    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// `floor(t / period + 0.5)`, evaluated in integers.
    pub fn charged_units(&self, elapsed_secs: u64) -> u64 {
        let p = self.period_secs;
        elapsed_secs.saturating_mul(2).saturating_add(p) / (2 * p)
    }

    /// Midpoint billing without the stop buffer.
    pub fn raw_cost(&self, elapsed_secs: u64) -> f64 {
        self.charged_units(elapsed_secs) as f64 * self.price
    }

    /// Unadjusted index of the song currently playing (0-based).
    pub fn song_index(&self, elapsed_secs: u64) -> u64 {
        elapsed_secs / self.period_secs
    }
}

/// Everything the billing engine knows about one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BillingQuote {
    pub elapsed_seconds: u64,
    pub song_count: u64,
    pub cost: f64,
    pub raw_cost: f64,
    pub current_song_index: u64,
    pub is_in_grace_period: bool,
    pub grace_remaining_seconds: u64,
    pub grace_saved_amount: f64,
}

/// Billing parameters that are not part of a pricing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPolicy {
    pub grace_seconds: u64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            grace_seconds: DEFAULT_GRACE_SECONDS,
        }
    }
}

impl BillingPolicy {
    pub fn new(grace_seconds: u64) -> Self {
        Self { grace_seconds }
    }

    /// The grace window never exceeds half a song: past the midpoint the
    /// next song is already charged.
    pub fn effective_grace(&self, meter: &Meter) -> u64 {
        self.grace_seconds.min(meter.period_secs / 2)
    }

    fn in_grace(&self, meter: &Meter, t: u64) -> bool {
        t >= meter.period_secs && t % meter.period_secs < self.effective_grace(meter)
    }

    fn effective_secs(&self, meter: &Meter, t: u64) -> u64 {
        if self.in_grace(meter, t) {
            (t / meter.period_secs) * meter.period_secs - 1
        } else {
            t
        }
    }

    /// Grace-adjusted cost. This is what a stopped session is billed.
    pub fn cost(&self, elapsed_secs: u64, tiers: &[PriceTier]) -> f64 {
        Meter::from_tiers(tiers)
            .map(|m| m.raw_cost(self.effective_secs(&m, elapsed_secs)))
            .unwrap_or(0.0)
    }

    /// Grace-adjusted number of charged songs; always `cost / price`.
    pub fn song_count(&self, elapsed_secs: u64, tiers: &[PriceTier]) -> u64 {
        Meter::from_tiers(tiers)
            .map(|m| m.charged_units(self.effective_secs(&m, elapsed_secs)))
            .unwrap_or(0)
    }

    pub fn is_in_grace_period(&self, elapsed_secs: u64, tiers: &[PriceTier]) -> bool {
        Meter::from_tiers(tiers)
            .map(|m| self.in_grace(&m, elapsed_secs))
            .unwrap_or(false)
    }

    /// Seconds left in the current grace window, 0 outside of it.
    pub fn grace_remaining_seconds(&self, elapsed_secs: u64, tiers: &[PriceTier]) -> u64 {
        match Meter::from_tiers(tiers) {
            Some(m) if self.in_grace(&m, elapsed_secs) => {
                self.effective_grace(&m) - elapsed_secs % m.period_secs
            }
            _ => 0,
        }
    }

    /// Amount the stop buffer is holding back, 0 outside of grace.
    pub fn grace_saved_amount(&self, elapsed_secs: u64, tiers: &[PriceTier]) -> f64 {
        match Meter::from_tiers(tiers) {
            Some(m) if self.in_grace(&m, elapsed_secs) => {
                m.raw_cost(elapsed_secs) - m.raw_cost(self.effective_secs(&m, elapsed_secs))
            }
            _ => 0.0,
        }
    }

    /// All outputs for a single instant, resolving the tier only once.
    pub fn quote(&self, elapsed_secs: u64, tiers: &[PriceTier]) -> BillingQuote {
        let Some(m) = Meter::from_tiers(tiers) else {
            return BillingQuote {
                elapsed_seconds: elapsed_secs,
                ..BillingQuote::default()
            };
        };
        let in_grace = self.in_grace(&m, elapsed_secs);
        let effective = self.effective_secs(&m, elapsed_secs);
        let cost = m.raw_cost(effective);
        let raw_cost = m.raw_cost(elapsed_secs);
        BillingQuote {
            elapsed_seconds: elapsed_secs,
            song_count: m.charged_units(effective),
            cost,
            raw_cost,
            current_song_index: m.song_index(elapsed_secs),
            is_in_grace_period: in_grace,
            grace_remaining_seconds: if in_grace {
                self.effective_grace(&m) - elapsed_secs % m.period_secs
            } else {
                0
            },
            grace_saved_amount: if in_grace { raw_cost - cost } else { 0.0 },
        }
    }
}

/// Raw (unbuffered) cost for the given tiers.
pub fn raw_cost(elapsed_secs: u64, tiers: &[PriceTier]) -> f64 {
    Meter::from_tiers(tiers)
        .map(|m| m.raw_cost(elapsed_secs))
        .unwrap_or(0.0)
}

/// Unadjusted song index; drives boundary haptics only.
pub fn current_song_index(elapsed_secs: u64, tiers: &[PriceTier]) -> u64 {
    Meter::from_tiers(tiers)
        .map(|m| m.song_index(elapsed_secs))
        .unwrap_or(0)
}

/// Charge points for a progress timeline.
///
/// Yields `(midpoint_minutes, cumulative_cost)` for every song whose midpoint
/// is at most `max_minutes`. Clone the iterator to walk it again. A
/// non-finite bound yields nothing.
pub fn timeline_marks(tiers: &[PriceTier], max_minutes: f64) -> TimelineMarks {
    TimelineMarks {
        meter: Meter::from_tiers(tiers).filter(|_| max_minutes.is_finite()),
        max_minutes,
        next_index: 0,
    }
}

#[derive(Debug, Clone)]
pub struct TimelineMarks {
    meter: Option<Meter>,
    max_minutes: f64,
    next_index: u64,
}

impl Iterator for TimelineMarks {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let meter = self.meter?;
        let d = meter.duration_minutes;
        let midpoint = self.next_index as f64 * d + d / 2.0;
        if !(midpoint <= self.max_minutes) {
            return None;
        }
        self.next_index += 1;
        Some((midpoint, self.next_index as f64 * meter.price))
    }
}
