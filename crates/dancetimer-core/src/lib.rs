//! # Dance Timer Core Library
//!
//! This library provides the core logic for Dance Timer, a personal timer
//! that tracks time on a dance floor and bills it per song. Every operation
//! is available through the standalone `dancetimer` CLI built on the same
//! library.
//!
//! ## Architecture
//!
//! - **Billing Engine**: pure functions from elapsed seconds to songs charged,
//!   cost and grace status. Billing commits at the midpoint of each song.
//! - **Timer State Machine**: Idle → Running ⇄ Paused → Finished, re-derived
//!   from a monotonic anchor on every tick
//! - **Timer Service**: a tokio task that owns the machine, runs the ticks and
//!   publishes snapshots
//! - **Gestures**: sustained-hold or rapid-repeat recognition over two buttons
//! - **Storage**: SQLite rules and history, TOML preferences
//!
//! ## Key Components
//!
//! - [`BillingPolicy`]: grace-aware billing over a rule's tiers
//! - [`TimerMachine`]: session lifecycle
//! - [`TimerService`] / [`TimerHandle`]: async owner and its front door
//! - [`TriggerDetector`]: raw key events to triggers
//! - [`Database`]: pricing rules and dance history
//! - [`Config`]: application configuration management

pub mod billing;
pub mod error;
pub mod events;
pub mod feedback;
pub mod gesture;
pub mod pricing;
pub mod storage;
pub mod store;
pub mod timer;

pub use billing::{BillingPolicy, BillingQuote, Meter};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use feedback::{Cue, Feedback, NoFeedback, TracingFeedback};
pub use gesture::{Button, KeyAction, Trigger, TriggerDetector, TriggerMode};
pub use pricing::{PriceTier, PricingRule, TierInput};
pub use storage::{Config, DanceRecord, Database, HistorySummary};
pub use store::{HistoryStore, RuleStore};
pub use timer::{
    Clock, Command, ManualClock, SystemClock, TimerHandle, TimerMachine, TimerService,
    TimerSettings, TimerState,
};
