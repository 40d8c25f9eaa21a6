//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API key, InfluxDB token) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`. The tariff list lives
//! in a separate JSON file and is read once at startup.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::{PollerError, Tariff};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub octopus: OctopusConfig,
    pub influx: InfluxConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    /// Fixed delay between the end of one cycle and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// How far back each cycle fetches.
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// Never fetch from before this instant, whatever the lookback says.
    #[serde(default)]
    pub hard_from_date: Option<DateTime<Utc>>,
    #[serde(default = "default_tariff_file")]
    pub tariff_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OctopusConfig {
    pub base_url: String,
    pub api_key_env: String,
    /// Per-request timeout. Unset means requests may hang indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    pub electricity: MeterConfig,
    pub gas: MeterConfig,
}

impl OctopusConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Address of one meter's consumption endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct MeterConfig {
    pub mpan: String,
    pub serial: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub bucket: String,
    pub token_env: String,
}

fn default_interval_secs() -> u64 {
    30 * 60
}

fn default_lookback_months() -> u32 {
    3
}

fn default_tariff_file() -> String {
    "tariffs.json".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text and check it.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PollerError> {
        if self.poller.interval_secs == 0 {
            return Err(PollerError::Config("poller.interval_secs must be positive".into()));
        }
        if self.octopus.base_url.trim().is_empty() {
            return Err(PollerError::Config("octopus.base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

/// Read the tariff list (a JSON array of tariff records).
pub fn load_tariffs(path: impl AsRef<Path>) -> Result<Vec<Tariff>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tariff file: {}", path.display()))?;
    let tariffs: Vec<Tariff> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse tariff file: {}", path.display()))?;
    Ok(tariffs)
}
