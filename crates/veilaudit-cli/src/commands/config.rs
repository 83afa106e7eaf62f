//! Config command - inspect and edit the Veilaudit configuration
//!
//! `veilaudit config show` prints the effective configuration,
//! `config set` updates one dotted key and `config validate` reports every
//! problem the engine would refuse to start with.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;
use veilaudit_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "decryption.timeout_secs")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("decryption.timeout_secs", "Seconds before a pending decryption may be expired"),
    ("decryption.min_stake", "Smallest accepted stake"),
    ("decryption.max_stake", "Largest accepted stake"),
    ("obfuscation.seed_label", "Label hashed into the obfuscation seed"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.json", "true|false"),
];

impl ConfigCommand {
    pub fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Set { key, value } => execute_set(config_path, key, value, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);
    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(config_path: &Path, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = Config::load_or_default(config_path);
    info!(key = %key, value = %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{key}': {e}"));
            formatter.info("");
            formatter.info("Supported keys:");
            for (name, help) in SUPPORTED_KEYS {
                formatter.info(&format!("  {name:<28} - {help}"));
            }
        }
        return Ok(());
    }

    // A timeout that is still unset is left for `validate` to report
    let errors: Vec<String> = config
        .validate()
        .iter()
        .filter(|e| e.field != "decryption.timeout_secs" || e.field == key)
        .map(ToString::to_string)
        .collect();
    if !errors.is_empty() {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": errors,
            }));
        } else {
            formatter.error(&format!("Invalid value for '{key}': {}", errors.join("; ")));
        }
        return Ok(());
    }

    save(&config, config_path)?;
    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key} = {value}"));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let report = validation_report(config_path);
    info!(config_path = %config_path.display(), valid = report.valid, "Validating configuration");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "valid": report.valid,
            "config_path": config_path.display().to_string(),
            "errors": report.errors,
        }));
    } else if report.valid {
        formatter.success("Configuration is valid");
        formatter.field("File", &config_path.display());
    } else {
        let n = report.errors.len();
        formatter.error(&format!(
            "Configuration has {n} error{}:",
            if n == 1 { "" } else { "s" }
        ));
        formatter.field("File", &config_path.display());
        formatter.info("");
        for error in &report.errors {
            formatter.info(&format!("  {error}"));
        }
    }
    Ok(())
}

#[derive(Debug)]
struct ValidationReport {
    valid: bool,
    errors: Vec<String>,
}

/// Loads `config_path` strictly and collects every problem found
fn validation_report(config_path: &Path) -> ValidationReport {
    let errors = match Config::load(config_path) {
        Ok(config) => config.validate().iter().map(ToString::to_string).collect(),
        Err(_) if !config_path.exists() => {
            vec![format!("Configuration file not found at {}", config_path.display())]
        }
        Err(e) => vec![format!("Failed to parse configuration: {e:#}")],
    };
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

fn save(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(config_path, yaml).context("Failed to write configuration file")
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "decryption.timeout_secs" => {
            config.decryption.timeout_secs = Some(
                value
                    .parse::<u64>()
                    .context("Expected a positive integer for decryption.timeout_secs")?,
            );
        }
        "decryption.min_stake" => {
            config.decryption.min_stake = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "decryption.max_stake" => {
            config.decryption.max_stake = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "obfuscation.seed_label" => {
            config.obfuscation.seed_label = value.to_string();
        }
        "logging.level" => {
            config.logging.level = value.to_string();
        }
        "logging.json" => {
            config.logging.json = value
                .parse::<bool>()
                .context("Expected true or false")?;
        }
        _ => {
            anyhow::bail!("Unknown configuration key: '{key}'");
        }
    }
    Ok(())
}
