use clap::Args;
use dancetimer_core::billing::format::{billing_summary, format_duration};
use dancetimer_core::billing::timeline_marks;
use dancetimer_core::{BillingPolicy, BillingQuote, Config, PriceTier};
use serde::Serialize;

use super::{open_db, parse_tier, print_json, resolve_rule, CliResult};

/// Where the tiers come from: a stored rule or an ad-hoc `--tier`.
#[derive(Args)]
pub struct TierSource {
    /// Pricing rule id (default rule when omitted)
    #[arg(long, conflicts_with = "tier")]
    rule: Option<i64>,
    /// Ad-hoc tier as MINUTES:PRICE instead of a stored rule
    #[arg(long, value_parser = parse_tier)]
    tier: Option<PriceTier>,
}

#[derive(Args)]
pub struct QuoteArgs {
    /// Elapsed seconds
    seconds: u64,
    #[command(flatten)]
    source: TierSource,
    /// Grace seconds (configured value when omitted)
    #[arg(long)]
    grace: Option<u64>,
}

#[derive(Args)]
pub struct MarksArgs {
    #[command(flatten)]
    source: TierSource,
    /// Last minute to mark (at most one day)
    #[arg(long, default_value = "30", value_parser = parse_max_minutes)]
    max_minutes: f64,
}

#[derive(Serialize)]
struct QuoteOutput {
    rule_name: String,
    elapsed: String,
    #[serde(flatten)]
    quote: BillingQuote,
    summary: String,
}

#[derive(Serialize)]
struct Mark {
    minute: f64,
    cost: f64,
}

const MAX_TIMELINE_MINUTES: f64 = 24.0 * 60.0;

fn parse_max_minutes(raw: &str) -> Result<f64, String> {
    let minutes: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !minutes.is_finite() || !(0.0..=MAX_TIMELINE_MINUTES).contains(&minutes) {
        return Err(format!("must be between 0 and {MAX_TIMELINE_MINUTES}"));
    }
    Ok(minutes)
}

impl TierSource {
    fn resolve(&self) -> CliResult<(String, Vec<PriceTier>)> {
        if let Some(tier) = &self.tier {
            let name = format!("{} min {}", tier.duration_minutes, tier.price);
            return Ok((name, vec![tier.clone()]));
        }
        let db = open_db()?;
        Ok(match resolve_rule(&db, self.rule)? {
            Some(rule) => {
                let tiers = rule.sorted_tiers();
                (rule.name, tiers)
            }
            None => (dancetimer_core::timer::NO_RULE_NAME.to_string(), Vec::new()),
        })
    }
}

pub fn run_quote(args: QuoteArgs) -> CliResult {
    let config = Config::load_or_default();
    let (rule_name, tiers) = args.source.resolve()?;
    let policy = BillingPolicy::new(args.grace.unwrap_or(config.billing.grace_seconds));
    let quote = policy.quote(args.seconds, &tiers);

    print_json(&QuoteOutput {
        rule_name,
        elapsed: format_duration(args.seconds),
        summary: billing_summary(&quote, !tiers.is_empty(), &config.ui.currency_symbol),
        quote,
    })
}

pub fn run_marks(args: MarksArgs) -> CliResult {
    let (_, tiers) = args.source.resolve()?;
    let marks: Vec<Mark> = timeline_marks(&tiers, args.max_minutes)
        .map(|(minute, cost)| Mark { minute, cost })
        .collect();
    print_json(&marks)
}
