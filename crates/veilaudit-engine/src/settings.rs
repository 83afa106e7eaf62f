//! Runtime settings derived from [`Config`]

use anyhow::{bail, Context};
use chrono::Duration;
use serde::Serialize;
use veilaudit_core::config::Config;

/// Settings the orchestrator runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSettings {
    timeout_secs: u64,
    min_stake: u64,
    max_stake: u64,
    seed_label: String,
}

impl EngineSettings {
    /// Settings with the given timeout and the default stake bounds
    pub fn new(timeout_secs: u64) -> Self {
        let defaults = Config::default();
        Self {
            timeout_secs,
            min_stake: defaults.decryption.min_stake,
            max_stake: defaults.decryption.max_stake,
            seed_label: defaults.obfuscation.seed_label,
        }
    }

    pub fn with_stake_bounds(mut self, min_stake: u64, max_stake: u64) -> Self {
        self.min_stake = min_stake;
        self.max_stake = max_stake;
        self
    }

    pub fn with_seed_label(mut self, label: impl Into<String>) -> Self {
        self.seed_label = label.into();
        self
    }

    /// Builds settings from a loaded configuration
    ///
    /// # Errors
    ///
    /// Fails when the configuration does not validate, which includes a
    /// missing decryption timeout.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            bail!("invalid configuration: {joined}");
        }
        let timeout_secs = config
            .decryption
            .timeout_secs
            .context("decryption.timeout_secs must be set")?;
        Ok(Self {
            timeout_secs,
            min_stake: config.decryption.min_stake,
            max_stake: config.decryption.max_stake,
            seed_label: config.obfuscation.seed_label.clone(),
        })
    }

    /// Decryption timeout, or `None` if it does not fit a [`Duration`]
    pub fn timeout(&self) -> Option<Duration> {
        i64::try_from(self.timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn min_stake(&self) -> u64 {
        self.min_stake
    }

    pub fn max_stake(&self) -> u64 {
        self.max_stake
    }

    pub fn seed_label(&self) -> &str {
        &self.seed_label
    }

    pub fn stake_in_bounds(&self, stake: u64) -> bool {
        (self.min_stake..=self.max_stake).contains(&stake)
    }
}
