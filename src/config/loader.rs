//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::lifecycle::SignalKind;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "SERVERPOOL_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    Env { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply
/// `SERVERPOOL_*` environment overrides.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ServiceConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

impl ServiceConfig {
    /// Defaults with `SERVERPOOL_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Defaults with overrides taken from `vars`, then validated.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, vars)?;
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

/// Apply overrides from `vars`; keys without [`ENV_PREFIX`] are ignored.
///
/// | Variable                                | Field                              |
/// |-----------------------------------------|------------------------------------|
/// | `SERVERPOOL_STOP_TIMEOUT_MS`            | `pool.stop_timeout_ms`             |
/// | `SERVERPOOL_SIGNALS`                    | `pool.signals` (comma separated)   |
/// | `SERVERPOOL_DIAGNOSTICS_ENABLED`        | `diagnostics.enabled`              |
/// | `SERVERPOOL_DIAGNOSTICS_ADDRESS`        | `diagnostics.bind_address`         |
/// | `SERVERPOOL_DIAGNOSTICS_TIMEOUT_SECS`   | `diagnostics.request_timeout_secs` |
/// | `SERVERPOOL_DIAGNOSTICS_MAX_BODY_BYTES` | `diagnostics.max_body_bytes`       |
/// | `SERVERPOOL_LOG_LEVEL`                  | `observability.log_level`          |
/// | `SERVERPOOL_LOG_FORMAT`                 | `observability.log_format`         |
/// | `SERVERPOOL_METRICS_ENABLED`            | `observability.metrics_enabled`    |
pub fn apply_env_overrides<I, K, V>(config: &mut ServiceConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in vars {
        let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let value = value.as_ref();
        let invalid = || ConfigError::Env {
            key: key.as_ref().to_string(),
            value: value.to_string(),
        };

        match name {
            "STOP_TIMEOUT_MS" => config.pool.stop_timeout_ms = parse(value).ok_or_else(invalid)?,
            "SIGNALS" => config.pool.signals = parse_signals(value).ok_or_else(invalid)?,
            "DIAGNOSTICS_ENABLED" => config.diagnostics.enabled = parse(value).ok_or_else(invalid)?,
            "DIAGNOSTICS_ADDRESS" => config.diagnostics.bind_address = value.to_string(),
            "DIAGNOSTICS_TIMEOUT_SECS" => {
                config.diagnostics.request_timeout_secs = parse(value).ok_or_else(invalid)?
            }
            "DIAGNOSTICS_MAX_BODY_BYTES" => {
                config.diagnostics.max_body_bytes = parse(value).ok_or_else(invalid)?
            }
            "LOG_LEVEL" => config.observability.log_level = value.to_string(),
            "LOG_FORMAT" => {
                config.observability.log_format = match value.to_ascii_lowercase().as_str() {
                    "pretty" => LogFormat::Pretty,
                    "json" => LogFormat::Json,
                    _ => return Err(invalid()),
                }
            }
            "METRICS_ENABLED" => config.observability.metrics_enabled = parse(value).ok_or_else(invalid)?,
            _ => tracing::debug!(key = key.as_ref(), "Ignoring unknown override"),
        }
    }
    Ok(())
}

fn parse<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// Comma separated signal names; an empty string means no signals.
fn parse_signals(value: &str) -> Option<Vec<SignalKind>> {
    if value.trim().is_empty() {
        return Some(Vec::new());
    }
    value.split(',').map(|s| s.parse().ok()).collect()
}
