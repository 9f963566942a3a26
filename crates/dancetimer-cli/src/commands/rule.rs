use clap::Subcommand;
use dancetimer_core::{PriceTier, PricingRule, RuleStore};

use super::{open_db, parse_tier, print_json, CliResult};

#[derive(Subcommand)]
pub enum RuleAction {
    /// List all pricing rules with their tiers
    List,
    /// Show one rule
    Show {
        /// Rule id
        id: i64,
    },
    /// Create a rule
    Add {
        /// Rule name, e.g. "4 min ¥20"
        name: String,
        /// Tier as MINUTES:PRICE; repeat for more tiers
        #[arg(long = "tier", value_parser = parse_tier, required = true)]
        tiers: Vec<PriceTier>,
        /// Make this the default rule
        #[arg(long)]
        default: bool,
    },
    /// Rename a rule and/or replace its tiers
    Edit {
        /// Rule id
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// Replacement tiers as MINUTES:PRICE
        #[arg(long = "tier", value_parser = parse_tier)]
        tiers: Vec<PriceTier>,
    },
    /// Delete a rule (history keeps its name)
    Delete {
        /// Rule id
        id: i64,
    },
    /// Make a rule the default
    SetDefault {
        /// Rule id
        id: i64,
    },
    /// Append one tier to a rule
    AddTier {
        /// Rule id
        id: i64,
        /// Tier as MINUTES:PRICE
        #[arg(value_parser = parse_tier)]
        tier: PriceTier,
    },
    /// Remove one tier
    DeleteTier {
        /// Tier id
        tier_id: i64,
    },
}

pub fn run(action: RuleAction) -> CliResult {
    let db = open_db()?;

    match action {
        RuleAction::List => {
            print_json(&db.list_rules()?)?;
        }
        RuleAction::Show { id } => {
            let rule = db
                .rule(id)?
                .ok_or_else(|| format!("no pricing rule with id {id}"))?;
            print_json(&rule)?;
        }
        RuleAction::Add {
            name,
            tiers,
            default,
        } => {
            let mut rule = PricingRule::new(name, tiers);
            rule.is_default = default;
            let id = db.insert_rule(&rule)?;
            print_json(&db.rule(id)?)?;
        }
        RuleAction::Edit { id, name, tiers } => {
            let mut rule = db
                .rule(id)?
                .ok_or_else(|| format!("no pricing rule with id {id}"))?;
            if let Some(name) = name {
                rule.name = name;
            }
            if !tiers.is_empty() {
                rule.tiers = tiers;
            }
            db.update_rule(&rule)?;
            print_json(&db.rule(id)?)?;
        }
        RuleAction::Delete { id } => {
            db.delete_rule(id)?;
            println!("rule {id} deleted");
        }
        RuleAction::SetDefault { id } => {
            db.set_as_default(id)?;
            println!("rule {id} is now the default");
        }
        RuleAction::AddTier { id, tier } => {
            let tier_id = db.add_tier(id, &tier)?;
            println!("tier {tier_id} added to rule {id}");
        }
        RuleAction::DeleteTier { tier_id } => {
            db.delete_tier(tier_id)?;
            println!("tier {tier_id} deleted");
        }
    }
    Ok(())
}
