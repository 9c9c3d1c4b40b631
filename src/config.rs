//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the Telegram token) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub paths: PathsConfig,
    pub selection: SelectionConfig,
    pub guard: GuardConfig,
    pub settlement: SettlementConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// How often a new cycle is attempted.
    pub poll_interval_secs: u64,
    /// Wall-clock budget for a single cycle before it is abandoned.
    pub cycle_timeout_secs: u64,
    /// Total session length.
    pub run_duration_mins: u64,
    /// Only log what would be activated.
    pub dry_run: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "STAKER-001".to_string(),
            poll_interval_secs: 10,
            cycle_timeout_secs: 120,
            run_duration_mins: 55,
            dry_run: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub fixture_file: PathBuf,
    pub stats_file: PathBuf,
    pub team_file: PathBuf,
    pub selection_file: PathBuf,
    pub result_file: PathBuf,
    pub metrics_file: PathBuf,
    /// Directory the driver drops raw settled-event payloads into.
    pub settled_inbox: PathBuf,
    /// Table model snapshot used to resolve cells in dry-run mode.
    pub table_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            fixture_file: "fixture.json".into(),
            stats_file: "stats.json".into(),
            team_file: "team.txt".into(),
            selection_file: "selbet.txt".into(),
            result_file: "result.json".into(),
            metrics_file: "metrics.csv".into(),
            settled_inbox: "settled".into(),
            table_file: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectionConfig {
    /// Minimum price for a lone candidate.
    pub single_min_price: Decimal,
    /// Minimum product of prices for a pair.
    pub pair_min_combined_price: Decimal,
    /// Absolute tolerance for probability matching. `None` = exact.
    pub probability_tolerance: Option<Decimal>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            single_min_price: dec!(1.29),
            pair_min_combined_price: dec!(1.50),
            probability_tolerance: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GuardConfig {
    pub max_consecutive_losses: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_consecutive_losses: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SettlementConfig {
    /// Offset of the operating locale from UTC (60 = West Africa Time).
    pub utc_offset_minutes: i32,
    pub channel_capacity: usize,
    /// How often the settled-event inbox is polled.
    pub inbox_poll_secs: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 60,
            channel_capacity: 32,
            inbox_poll_secs: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    fn validate(&self) -> Result<()> {
        if self.guard.max_consecutive_losses == 0 {
            anyhow::bail!("guard.max_consecutive_losses must be at least 1");
        }
        if self.settlement.channel_capacity == 0 {
            anyhow::bail!("settlement.channel_capacity must be at least 1");
        }
        if self.settlement.utc_offset_minutes.abs() >= 24 * 60 {
            anyhow::bail!(
                "settlement.utc_offset_minutes out of range: {}",
                self.settlement.utc_offset_minutes
            );
        }
        if let Some(tol) = self.selection.probability_tolerance {
            if tol.is_sign_negative() {
                anyhow::bail!("selection.probability_tolerance must not be negative");
            }
        }
        Ok(())
    }
}
