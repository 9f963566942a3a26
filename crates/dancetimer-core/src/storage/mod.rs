mod config;
pub mod database;
pub mod migrations;

pub use config::{
    BillingConfig, Config, FeedbackConfig, Theme, TimerConfig, TriggerConfig, UiConfig,
};
pub use database::{Database, DanceRecord, HistorySummary};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/dancetimer[-dev]/` based on DANCETIMER_ENV.
///
/// Set DANCETIMER_ENV=dev to use development data directory.
/// DANCETIMER_DATA_DIR, when set, replaces the directory entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("DANCETIMER_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("DANCETIMER_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("dancetimer-dev")
            } else {
                base_dir.join("dancetimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
