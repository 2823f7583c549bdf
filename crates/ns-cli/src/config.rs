//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::FixedOffset;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ns_core::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Quiet period before a boundary edit is written.
    pub debounce_ms: i64,

    /// Delay before retrying a write whose previous write is still running.
    pub busy_retry_ms: i64,

    /// Fixed UTC offset used for night anchors and time display.
    /// The system local zone is used when unset.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let scheduler = SchedulerConfig::default();
        Self {
            database_path: data_dir.join("ns.db"),
            debounce_ms: scheduler.debounce_ms,
            busy_retry_ms: scheduler.busy_retry_ms,
            utc_offset_minutes: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // NS_DATABASE_PATH, NS_DEBOUNCE_MS, ...
        figment = figment.merge(Env::prefixed("NS_"));

        figment.extract()
    }

    pub const fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce_ms: self.debounce_ms,
            busy_retry_ms: self.busy_retry_ms,
        }
    }

    /// The configured fixed zone, if any.
    pub fn fixed_offset(&self) -> anyhow::Result<Option<FixedOffset>> {
        self.utc_offset_minutes
            .map(|minutes| {
                FixedOffset::east_opt(minutes * 60)
                    .with_context(|| format!("utc_offset_minutes out of range: {minutes}"))
            })
            .transpose()
    }
}

/// Returns the platform-specific config directory for ns.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ns"))
}

/// Returns the platform-specific data directory for ns.
///
/// On Linux: `~/.local/share/ns`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ns"))
}
