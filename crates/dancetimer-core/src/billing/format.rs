//! Text rendering for durations, costs and the one-line billing summary
//! shown by notifications and the CLI.

use super::BillingQuote;

/// `m:ss`, minutes unbounded.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Whole amounts print without decimals, anything else with one.
pub fn format_cost(cost: f64, currency: &str) -> String {
    if cost.fract() == 0.0 {
        format!("{currency}{}", cost as i64)
    } else {
        format!("{currency}{cost:.1}")
    }
}

/// `grace 7s · 2 songs charged · ¥40`
///
/// Empty when the session has no pricing tiers.
pub fn billing_summary(quote: &BillingQuote, has_tiers: bool, currency: &str) -> String {
    if !has_tiers {
        return String::new();
    }
    let mut parts = Vec::with_capacity(3);
    if quote.is_in_grace_period {
        parts.push(format!("grace {}s", quote.grace_remaining_seconds));
    }
    parts.push(match quote.song_count {
        0 => "under 1 song".to_string(),
        1 => "1 song charged".to_string(),
        n => format!("{n} songs charged"),
    });
    parts.push(format_cost(quote.cost, currency));
    parts.join(" · ")
}
