//! Storage seams used by the timer service.
//!
//! The service only needs two narrow capabilities: find the rule to bill a
//! new session with, and save a finished session. [`crate::storage::Database`]
//! implements both; tests and embedders can supply their own.

use crate::error::Result;
use crate::pricing::PricingRule;
use crate::storage::DanceRecord;

pub trait RuleStore: Send + Sync {
    /// The rule flagged as default, with its tiers.
    fn default_rule(&self) -> Result<Option<PricingRule>>;

    /// A specific rule, with its tiers.
    fn rule(&self, id: i64) -> Result<Option<PricingRule>>;
}

pub trait HistoryStore: Send + Sync {
    /// Persist a finished session and return its new id.
    fn insert_record(&self, record: &DanceRecord) -> Result<i64>;
}
