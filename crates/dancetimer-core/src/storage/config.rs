//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Trigger gesture mode and thresholds
//! - Haptic feedback on song boundaries
//! - Grace window and auto-start confirmation window
//! - Screen-off auto start
//! - Theme, currency symbol and first-launch flag
//!
//! Configuration is stored at `~/.config/dancetimer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::billing::{BillingPolicy, DEFAULT_GRACE_SECONDS};
use crate::error::{ConfigError, Result};
use crate::gesture::{
    DetectorConfig, TriggerMode, DEFAULT_HOLD_THRESHOLD_MS, DEFAULT_REPEAT_COUNT,
    DEFAULT_REPEAT_WINDOW_MS,
};
use crate::timer::{ServiceConfig, TimerSettings, DEFAULT_AUTO_CONFIRM_SECONDS};

/// Trigger gesture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub mode: TriggerMode,
    #[serde(default = "default_hold_threshold_ms")]
    pub hold_threshold_ms: u64,
    #[serde(default = "default_repeat_window_ms")]
    pub repeat_window_ms: u64,
    #[serde(default = "default_repeat_count")]
    pub repeat_count: usize,
}

/// Haptic feedback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Pulse when a new song starts.
    #[serde(default = "default_true")]
    pub haptic_on_song_boundary: bool,
}

/// Billing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
}

/// Timer service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_auto_confirm_seconds")]
    pub auto_confirm_seconds: u64,
    #[serde(default)]
    pub auto_start_on_screen_off: bool,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_backup_tick_interval_secs")]
    pub backup_tick_interval_secs: u64,
    #[serde(default = "default_wake_lock_max_minutes")]
    pub wake_lock_max_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    System,
}

/// UI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_true")]
    pub first_launch: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dancetimer/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

// Default functions
fn default_hold_threshold_ms() -> u64 {
    DEFAULT_HOLD_THRESHOLD_MS
}
fn default_repeat_window_ms() -> u64 {
    DEFAULT_REPEAT_WINDOW_MS
}
fn default_repeat_count() -> usize {
    DEFAULT_REPEAT_COUNT
}
fn default_grace_seconds() -> u64 {
    DEFAULT_GRACE_SECONDS
}
fn default_auto_confirm_seconds() -> u64 {
    DEFAULT_AUTO_CONFIRM_SECONDS
}
fn default_tick_interval_ms() -> u64 {
    1_000
}
fn default_backup_tick_interval_secs() -> u64 {
    30
}
fn default_wake_lock_max_minutes() -> u64 {
    60
}
fn default_currency_symbol() -> String {
    "¥".into()
}
fn default_true() -> bool {
    true
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            mode: TriggerMode::default(),
            hold_threshold_ms: default_hold_threshold_ms(),
            repeat_window_ms: default_repeat_window_ms(),
            repeat_count: default_repeat_count(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            haptic_on_song_boundary: true,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            grace_seconds: default_grace_seconds(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            auto_confirm_seconds: default_auto_confirm_seconds(),
            auto_start_on_screen_off: false,
            tick_interval_ms: default_tick_interval_ms(),
            backup_tick_interval_secs: default_backup_tick_interval_secs(),
            wake_lock_max_minutes: default_wake_lock_max_minutes(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            currency_symbol: default_currency_symbol(),
            first_launch: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::MissingKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("'{value}' is not true or false")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            value
                                .parse::<f64>()
                                .ok()
                                .and_then(serde_json::Number::from_f64)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
        match value {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    Self::flatten(&key, v, out);
                }
            }
            serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds a zero interval or threshold, or if the default config cannot
    /// be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let load_failed = |message: String| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message,
                };
                let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.validate().map_err(|e| load_failed(e.to_string()))?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field (wrong type, unknown enum variant).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Put one key back to its default value. Does not save.
    pub fn reset_key(&mut self, key: &str) -> Result<()> {
        let default = Self::default()
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        self.set(key, &default)
    }

    /// Every leaf key with its value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            Self::flatten("", &json, &mut out);
        }
        out.sort();
        out
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("trigger.hold_threshold_ms", self.trigger.hold_threshold_ms),
            ("trigger.repeat_window_ms", self.trigger.repeat_window_ms),
            ("trigger.repeat_count", self.trigger.repeat_count as u64),
            ("timer.tick_interval_ms", self.timer.tick_interval_ms),
            ("timer.backup_tick_interval_secs", self.timer.backup_tick_interval_secs),
            ("timer.wake_lock_max_minutes", self.timer.wake_lock_max_minutes),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            billing: BillingPolicy::new(self.billing.grace_seconds),
            auto_confirm_seconds: self.timer.auto_confirm_seconds,
            haptic_on_song_boundary: self.feedback.haptic_on_song_boundary,
            wake_lock_max_hold: Duration::from_secs(self.timer.wake_lock_max_minutes.saturating_mul(60)),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            tick_interval: Duration::from_millis(self.timer.tick_interval_ms),
            backup_tick_interval: Duration::from_secs(self.timer.backup_tick_interval_secs),
            auto_start_on_screen_off: self.timer.auto_start_on_screen_off,
            detector: DetectorConfig {
                mode: self.trigger.mode,
                hold_threshold_ms: self.trigger.hold_threshold_ms,
                repeat_window_ms: self.trigger.repeat_window_ms,
                repeat_count: self.trigger.repeat_count,
            },
            rule_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[trigger]\nmode = \"rapid_repeat\"\n").unwrap();
        assert_eq!(parsed.trigger.mode, TriggerMode::RapidRepeat);
        assert_eq!(parsed.trigger.hold_threshold_ms, 1_500);
        assert_eq!(parsed.billing.grace_seconds, 30);
        assert_eq!(parsed.ui.currency_symbol, "¥");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("trigger.mode").as_deref(), Some("sustained_hold"));
        assert_eq!(cfg.get("timer.auto_confirm_seconds").as_deref(), Some("15"));
        assert_eq!(cfg.get("ui.first_launch").as_deref(), Some("true"));
        assert!(cfg.get("ui.missing_key").is_none());
        assert!(cfg.get("ui").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("feedback.haptic_on_song_boundary", "false").unwrap();
        cfg.set("billing.grace_seconds", "45").unwrap();
        cfg.set("trigger.mode", "rapid_repeat").unwrap();
        cfg.set("ui.theme", "light").unwrap();
        assert!(!cfg.feedback.haptic_on_song_boundary);
        assert_eq!(cfg.billing.grace_seconds, 45);
        assert_eq!(cfg.trigger.mode, TriggerMode::RapidRepeat);
        assert_eq!(cfg.ui.theme, Theme::Light);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("ui.nonexistent_key", "value"),
            Err(crate::error::CoreError::Config(ConfigError::MissingKey(_)))
        ));
        assert!(cfg.set("ui.first_launch", "not_a_bool").is_err());
        assert!(cfg.set("trigger.mode", "double_tap").is_err());
        assert!(cfg.set("trigger.repeat_count", "0").is_err());
        assert!(cfg.set("trigger", "{}").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn reset_key_restores_default() {
        let mut cfg = Config::default();
        cfg.set("timer.auto_confirm_seconds", "5").unwrap();
        cfg.reset_key("timer.auto_confirm_seconds").unwrap();
        assert_eq!(cfg.timer.auto_confirm_seconds, 15);
    }

    #[test]
    fn entries_lists_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries.contains(&("billing.grace_seconds".to_string(), "30".to_string())));
        assert!(entries.contains(&("ui.currency_symbol".to_string(), "¥".to_string())));
        assert!(entries.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("timer.auto_start_on_screen_off", "true").unwrap();
        changed.save_to(&path).unwrap();
        assert!(Config::load_from(&path).unwrap().timer.auto_start_on_screen_off);
    }

    #[test]
    fn load_from_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "trigger = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(crate::error::CoreError::Config(ConfigError::LoadFailed { .. }))
        ));
    }

    #[test]
    fn load_from_rejects_zero_intervals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        for body in ["[timer]\ntick_interval_ms = 0\n", "[timer]\nbackup_tick_interval_secs = 0\n"] {
            std::fs::write(&path, body).unwrap();
            let err = Config::load_from(&path).unwrap_err();
            assert!(
                matches!(err, crate::error::CoreError::Config(ConfigError::LoadFailed { ref message, .. }) if message.contains("timer.")),
                "{err}"
            );
        }
    }

    #[test]
    fn huge_wake_lock_bound_saturates() {
        let mut cfg = Config::default();
        cfg.timer.wake_lock_max_minutes = u64::MAX;
        assert_eq!(cfg.timer_settings().wake_lock_max_hold, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn converts_into_runtime_settings() {
        let mut cfg = Config::default();
        cfg.set("billing.grace_seconds", "10").unwrap();
        cfg.set("timer.wake_lock_max_minutes", "5").unwrap();
        let settings = cfg.timer_settings();
        assert_eq!(settings.billing.grace_seconds, 10);
        assert_eq!(settings.wake_lock_max_hold, Duration::from_secs(300));

        let service = cfg.service_config();
        assert_eq!(service.tick_interval, Duration::from_secs(1));
        assert_eq!(service.backup_tick_interval, Duration::from_secs(30));
        assert_eq!(service.detector, DetectorConfig::default());
    }
}
