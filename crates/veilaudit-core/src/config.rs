//! Configuration module for Veilaudit.
//!
//! Typed sections of the YAML configuration file. [`Config::validate`]
//! collects every problem at once and [`ConfigBuilder`] assembles a
//! configuration in code.
//!
//! The decryption timeout has no default. Deployments must choose it
//! explicitly, and [`Config::validate`] reports its absence.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Veilaudit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decryption: DecryptionConfig,
    pub obfuscation: ObfuscationConfig,
    pub logging: LoggingConfig,
}

/// Decryption round-trip settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptionConfig {
    /// Seconds after a request before anyone may expire it and refund the stake.
    pub timeout_secs: Option<u64>,
    /// Smallest stake accepted with a decryption request.
    pub min_stake: u64,
    /// Largest stake accepted with a decryption request.
    pub max_stake: u64,
}

/// Value obfuscation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObfuscationConfig {
    /// Label hashed into the initial obfuscation seed.
    pub seed_label: String,
}

/// Output settings for `tracing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Config {
    /// Reads and parses the YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but any read or parse failure yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Where the CLI looks when `--config` is not given,
    /// typically `$XDG_CONFIG_HOME/veilaudit/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("veilaudit")
            .join("config.yaml")
    }

    /// The decryption timeout, if one is configured.
    pub fn decryption_timeout(&self) -> Option<Duration> {
        self.decryption
            .timeout_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(Duration::seconds)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DecryptionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            min_stake: 1,
            max_stake: 1_000_000_000,
        }
    }
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            seed_label: "veilaudit".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// One problem reported by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"decryption.timeout_secs"`.
    pub field: String,
    /// What is wrong with the value.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Accepted `logging.level` filters.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest accepted timeout: 365 days.
const MAX_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

impl Config {
    /// Checks every section and returns all problems found, empty when valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- decryption ---
        match self.decryption.timeout_secs {
            None => errors.push(ValidationError {
                field: "decryption.timeout_secs".into(),
                message: "must be set explicitly; there is no default timeout".into(),
            }),
            Some(0) => errors.push(ValidationError {
                field: "decryption.timeout_secs".into(),
                message: "must be greater than 0".into(),
            }),
            Some(secs) if secs > MAX_TIMEOUT_SECS => errors.push(ValidationError {
                field: "decryption.timeout_secs".into(),
                message: format!("must not exceed {MAX_TIMEOUT_SECS} (365 days)"),
            }),
            Some(_) => {}
        }
        if self.decryption.min_stake == 0 {
            errors.push(ValidationError {
                field: "decryption.min_stake".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.decryption.min_stake > self.decryption.max_stake {
            errors.push(ValidationError {
                field: "decryption.max_stake".into(),
                message: format!(
                    "max_stake ({}) must not be below min_stake ({})",
                    self.decryption.max_stake, self.decryption.min_stake
                ),
            });
        }

        // --- obfuscation ---
        if self.obfuscation.seed_label.trim().is_empty() {
            errors.push(ValidationError {
                field: "obfuscation.seed_label".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Overrides individual fields on top of [`Config::default`].
///
/// # Example
///
/// ```rust
/// use veilaudit_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .decryption_timeout_secs(3_600)
///     .logging_level("debug")
///     .build_validated()
///     .expect("valid configuration");
/// assert_eq!(config.decryption.timeout_secs, Some(3_600));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn decryption_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.decryption.timeout_secs = Some(seconds);
        self
    }

    pub fn decryption_min_stake(mut self, stake: u64) -> Self {
        self.config.decryption.min_stake = stake;
        self
    }

    pub fn decryption_max_stake(mut self, stake: u64) -> Self {
        self.config.decryption.max_stake = stake;
        self
    }

    pub fn obfuscation_seed_label(mut self, label: impl Into<String>) -> Self {
        self.config.obfuscation.seed_label = label.into();
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the [`Config`] or errors.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
