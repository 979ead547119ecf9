//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::lifecycle::SignalKind;

/// Root configuration for the `serverpool` service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Pool lifecycle settings.
    pub pool: PoolConfig,

    /// Diagnostics endpoint settings.
    pub diagnostics: DiagnosticsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Pool lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Per-item graceful stop deadline in milliseconds.
    pub stop_timeout_ms: u64,

    /// OS signals the pool subscribes to on start. Empty disables
    /// subscription entirely.
    pub signals: Vec<SignalKind>,
}

impl PoolConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: 30_000,
            signals: SignalKind::defaults(),
        }
    }
}

/// Diagnostics (liveness/readiness) endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Run the diagnostics endpoint as part of the pool.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8090".to_string(),
            request_timeout_secs: 10,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for production.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Expose Prometheus metrics on the diagnostics endpoint.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}
