//! Configuration loading from TOML.
//!
//! Reads the bot configuration file and deserializes it into
//! strongly-typed structs, then validates the values the engine relies on.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;

use crate::types::LoanRecord;

/// Date format accepted for `bot.end_date`.
pub const END_DATE_FORMAT: &str = "%Y-%m-%d";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    #[serde(default)]
    pub status_server: StatusServerConfig,
    #[serde(default)]
    pub paper: PaperConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Clear auto-renew on startup and restore it on shutdown.
    pub auto_renew: bool,
    #[serde(default = "default_output_currency")]
    pub output_currency: String,
    /// Last day loans may run until (`YYYY-MM-DD`).
    #[serde(default)]
    pub end_date: Option<String>,
    /// Status log file. Setting it also enables extended market stats.
    #[serde(default)]
    pub json_file: Option<String>,
    #[serde(default = "default_json_log_size")]
    pub json_log_size: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StatusServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Seed data for the in-memory paper collaborators.
#[derive(Debug, Deserialize, Clone)]
pub struct PaperConfig {
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,
    #[serde(default)]
    pub loans: Vec<LoanRecord>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            sleep_secs: default_sleep_secs(),
            loans: Vec::new(),
        }
    }
}

fn default_output_currency() -> String {
    "BTC".to_string()
}

fn default_json_log_size() -> usize {
    200
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_sleep_secs() -> u64 {
    60
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bot.output_currency.trim().is_empty() {
            bail!("bot.output_currency must not be empty");
        }
        if self.bot.json_log_size == 0 {
            bail!("bot.json_log_size must be greater than zero");
        }
        if self.paper.sleep_secs == 0 {
            bail!("paper.sleep_secs must be greater than zero");
        }
        if let Some(end) = &self.bot.end_date {
            NaiveDate::parse_from_str(end, END_DATE_FORMAT)
                .with_context(|| format!("bot.end_date is not YYYY-MM-DD: {end}"))?;
        }
        Ok(())
    }

    /// Extended market stats are only worth collecting when they get persisted.
    pub fn json_output_enabled(&self) -> bool {
        self.bot.json_file.is_some()
    }
}
