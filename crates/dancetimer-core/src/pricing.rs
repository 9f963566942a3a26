//! Pricing rules and their price tiers.
//!
//! A rule is a named price plan ("4 min ¥20"). Each tier says "N minutes of
//! dancing costs P". Billing only ever consults the shortest tier; longer
//! tiers are kept so edits and history stay lossless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub rule_id: i64,
    /// Length of one billed song in minutes. Fractions such as 3.5 are allowed.
    pub duration_minutes: f64,
    /// Price of one song.
    pub price: f64,
    #[serde(default)]
    pub sort_order: i32,
}

impl PriceTier {
    /// A tier not yet attached to a stored rule.
    pub fn new(duration_minutes: f64, price: f64) -> Self {
        Self {
            id: 0,
            rule_id: 0,
            duration_minutes,
            price,
            sort_order: 0,
        }
    }

    /// Billing period in whole seconds.
    pub fn period_secs(&self) -> i64 {
        (self.duration_minutes * 60.0).round() as i64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tier(self.duration_minutes, self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tiers: Vec<PriceTier>,
}

impl PricingRule {
    pub fn new(name: impl Into<String>, tiers: Vec<PriceTier>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            is_default: false,
            created_at: Utc::now(),
            tiers,
        }
    }

    /// Tiers ordered by duration, shortest first.
    pub fn sorted_tiers(&self) -> Vec<PriceTier> {
        let mut tiers = self.tiers.clone();
        tiers.sort_by(|a, b| a.duration_minutes.total_cmp(&b.duration_minutes));
        tiers
    }

    /// Check a rule before it is written to the store.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for a blank name, a rule without tiers,
    /// or a tier with a non-positive duration or a negative price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "rule name must not be empty".into(),
            });
        }
        if self.tiers.is_empty() {
            return Err(ValidationError::EmptyCollection("tiers".into()));
        }
        for tier in &self.tiers {
            tier.validate()?;
        }
        Ok(())
    }
}

/// Raw text input for one tier, as typed into an editor or on the CLI.
#[derive(Debug, Clone, Default)]
pub struct TierInput {
    pub duration_minutes: String,
    pub price: String,
}

impl TierInput {
    pub fn new(duration_minutes: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            duration_minutes: duration_minutes.into(),
            price: price.into(),
        }
    }

    /// Parse and validate the text fields into a [`PriceTier`].
    ///
    /// # Errors
    /// Non-numeric input, a duration that is not positive, or a negative price.
    pub fn parse(&self) -> Result<PriceTier, ValidationError> {
        let duration = parse_number("duration_minutes", &self.duration_minutes)?;
        let price = parse_number("price", &self.price)?;
        validate_tier(duration, price)?;
        Ok(PriceTier::new(duration, price))
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidValue {
            field: field.into(),
            message: format!("'{raw}' is not a number"),
        })
}

fn validate_tier(duration_minutes: f64, price: f64) -> Result<(), ValidationError> {
    if !(duration_minutes > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "duration_minutes".into(),
            message: format!("{duration_minutes} must be greater than zero"),
        });
    }
    if !(price >= 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "price".into(),
            message: format!("{price} must not be negative"),
        });
    }
    Ok(())
}

/// Rules installed when the store holds none. The first one is the default.
pub fn preset_rules() -> Vec<PricingRule> {
    let mut rules = vec![
        PricingRule::new("4 min ¥20", vec![PriceTier::new(4.0, 20.0)]),
        PricingRule::new("3 min ¥10", vec![PriceTier::new(3.0, 10.0)]),
        PricingRule::new("1 min ¥5", vec![PriceTier::new(1.0, 5.0)]),
    ];
    rules[0].is_default = true;
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_tiers_orders_by_duration() {
        let rule = PricingRule::new(
            "mixed",
            vec![
                PriceTier::new(4.0, 20.0),
                PriceTier::new(3.0, 10.0),
                PriceTier::new(3.5, 20.0),
            ],
        );
        let durations: Vec<f64> = rule.sorted_tiers().iter().map(|t| t.duration_minutes).collect();
        assert_eq!(durations, vec![3.0, 3.5, 4.0]);
    }

    #[test]
    fn period_rounds_fractional_minutes() {
        assert_eq!(PriceTier::new(3.5, 20.0).period_secs(), 210);
        assert_eq!(PriceTier::new(0.999, 1.0).period_secs(), 60);
    }

    #[test]
    fn tier_input_parses_valid_numbers() {
        let tier = TierInput::new(" 3.5 ", "20").parse().unwrap();
        assert_eq!(tier.duration_minutes, 3.5);
        assert_eq!(tier.price, 20.0);
    }

    #[test]
    fn tier_input_rejects_garbage() {
        let err = TierInput::new("abc", "20").parse().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "duration_minutes"));
        assert!(TierInput::new("4", "NaN").parse().is_err());
    }

    #[test]
    fn tier_input_rejects_non_positive_duration_and_negative_price() {
        assert!(TierInput::new("0", "20").parse().is_err());
        assert!(TierInput::new("-1", "20").parse().is_err());
        assert!(TierInput::new("4", "-5").parse().is_err());
        assert!(TierInput::new("4", "0").parse().is_ok());
    }

    #[test]
    fn validate_requires_name_and_tiers() {
        assert!(PricingRule::new("  ", vec![PriceTier::new(4.0, 20.0)]).validate().is_err());
        assert_eq!(
            PricingRule::new("empty", vec![]).validate(),
            Err(ValidationError::EmptyCollection("tiers".into()))
        );
        assert!(PricingRule::new("ok", vec![PriceTier::new(4.0, 20.0)]).validate().is_ok());
    }

    #[test]
    fn presets_have_exactly_one_default() {
        let presets = preset_rules();
        assert_eq!(presets.len(), 3);
        assert_eq!(presets.iter().filter(|r| r.is_default).count(), 1);
        assert!(presets.iter().all(|r| r.validate().is_ok()));
    }
}
