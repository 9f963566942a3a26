pub mod config;
pub mod gesture;
pub mod history;
pub mod quote;
pub mod rule;
pub mod run;

use dancetimer_core::{Database, PriceTier, PricingRule, RuleStore, TierInput};
use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the history database, installing the preset rules on first use.
pub fn open_db() -> CliResult<Database> {
    let db = Database::open()?;
    db.seed_default_rules()?;
    Ok(db)
}

/// The rule with `id`, or the default rule when no id is given.
///
/// An unknown id is an error; a missing default is not.
pub fn resolve_rule(db: &Database, id: Option<i64>) -> CliResult<Option<PricingRule>> {
    match id {
        Some(id) => match db.rule(id)? {
            Some(rule) => Ok(Some(rule)),
            None => Err(format!("no pricing rule with id {id}").into()),
        },
        None => Ok(db.default_rule()?),
    }
}

/// Parse `MINUTES:PRICE`, e.g. `4:20` or `3.5:15`.
pub fn parse_tier(raw: &str) -> Result<PriceTier, String> {
    let (minutes, price) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MINUTES:PRICE, got '{raw}'"))?;
    TierInput::new(minutes, price).parse().map_err(|e| e.to_string())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
