//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BridgeConfig;
use crate::config::validation::{validate_config, ValidationIssue};

pub const ENV_BACEN_URL: &str = "DICT_BRIDGE_BACEN_URL";
pub const ENV_CERT_PATH: &str = "DICT_BRIDGE_CERT_PATH";
pub const ENV_KEY_PATH: &str = "DICT_BRIDGE_KEY_PATH";
pub const ENV_CA_PATH: &str = "DICT_BRIDGE_CA_PATH";
pub const ENV_DEV_MODE: &str = "DICT_BRIDGE_DEV_MODE";
pub const ENV_SIGNER_URL: &str = "DICT_BRIDGE_SIGNER_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BridgeConfig = toml::from_str(&content)?;
    finish(config, |name| std::env::var(name).ok())
}

/// Build a configuration from defaults and environment variables only.
pub fn from_env_only() -> Result<BridgeConfig, ConfigError> {
    finish(BridgeConfig::default(), |name| std::env::var(name).ok())
}

fn finish(
    mut config: BridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BridgeConfig, ConfigError> {
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `DICT_BRIDGE_*` overrides through `lookup`.
pub fn apply_env_overrides(
    config: &mut BridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(url) = lookup(ENV_BACEN_URL) {
        config.bacen.base_url = url;
    }
    if let Some(path) = lookup(ENV_CERT_PATH) {
        config.bacen.cert_path = Some(path);
    }
    if let Some(path) = lookup(ENV_KEY_PATH) {
        config.bacen.key_path = Some(path);
    }
    if let Some(path) = lookup(ENV_CA_PATH) {
        config.bacen.ca_path = Some(path);
    }
    if let Some(value) = lookup(ENV_DEV_MODE) {
        config.bacen.dev_mode = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
            name: ENV_DEV_MODE,
            value,
        })?;
    }
    if let Some(url) = lookup(ENV_SIGNER_URL) {
        config.signer.base_url = url;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
