use std::collections::BTreeMap;

use clap::Subcommand;
use dancetimer_core::Config;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "billing.grace_seconds", "trigger.mode")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset one key, or the whole config, to defaults
    Reset {
        /// Key to reset; everything when omitted
        key: Option<String>,
    },
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let entries: BTreeMap<String, String> = config.entries().into_iter().collect();
            print_json(&entries)?;
        }
        ConfigAction::Reset { key: Some(key) } => {
            let mut config = Config::load()?;
            config.reset_key(&key)?;
            config.save()?;
            println!("{key} reset to default");
        }
        ConfigAction::Reset { key: None } => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
