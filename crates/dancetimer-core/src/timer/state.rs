//! Observable timer state.
//!
//! Always replaced as a whole value; a reader never sees fields computed
//! from two different instants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::PriceTier;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running(RunningState),
    Finished(FinishedState),
}

impl TimerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TimerState::Idle)
    }

    /// Running, paused or not.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running(_))
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, TimerState::Running(r) if r.is_paused)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TimerState::Finished(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningState {
    pub elapsed_seconds: u64,
    pub current_song_index: u64,
    pub cost: f64,
    pub song_count: u64,
    pub start_time: DateTime<Utc>,
    pub tiers: Vec<PriceTier>,
    pub rule_name: String,
    pub rule_id: Option<i64>,
    pub is_paused: bool,
    pub is_in_grace_period: bool,
    pub grace_remaining_seconds: u64,
    pub is_auto_started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedState {
    pub duration_seconds: u64,
    pub cost: f64,
    pub song_count: u64,
    pub rule_name: String,
    pub rule_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_grace_applied: bool,
    pub saved_amount: f64,
}
