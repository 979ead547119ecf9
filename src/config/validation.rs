//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check addresses and log levels parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::observability::logging::LogLevel;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("pool.stop_timeout_ms must be greater than zero")]
    ZeroStopTimeout,

    #[error("pool.signals lists {0} more than once")]
    DuplicateSignal(String),

    #[error("diagnostics.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("diagnostics.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("diagnostics.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.log_level {0:?} is not a known level")]
    InvalidLogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pool.stop_timeout_ms == 0 {
        errors.push(ValidationError::ZeroStopTimeout);
    }

    let mut seen = HashSet::new();
    for signal in &config.pool.signals {
        if !seen.insert(signal) {
            errors.push(ValidationError::DuplicateSignal(signal.to_string()));
        }
    }

    // Only checked when the endpoint will actually bind.
    if config.diagnostics.enabled {
        if config.diagnostics.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBindAddress(
                config.diagnostics.bind_address.clone(),
            ));
        }
        if config.diagnostics.request_timeout_secs == 0 {
            errors.push(ValidationError::ZeroRequestTimeout);
        }
        if config.diagnostics.max_body_bytes == 0 {
            errors.push(ValidationError::ZeroBodyLimit);
        }
    }

    if config.observability.log_level.parse::<LogLevel>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
