//! serverpool
//!
//! Runs the diagnostics endpoint under a [`Pool`] and shuts it down
//! gracefully on SIGINT/SIGTERM or on server failure.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML + SERVERPOOL_* env)
//!        │
//!        ▼
//!   logging ── metrics recorder
//!        │
//!        ▼
//!   ┌──────────────────────────── Pool ────────────────────────────┐
//!   │  start()  ──▶ one task per item ──▶ Server::start            │
//!   │  ready()  ──▶ Signaler::set_ready (e.g. /readyz)             │
//!   │  stop()   ──▶ ready(false) ──▶ Server::stop(deadline) × N    │
//!   └──────────────────────────────────────────────────────────────┘
//!        ▲                       ▲
//!        │ Signals               │ StartErrors
//!        └──────── event loop ───┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use serverpool::config::{load_config, ServiceConfig};
use serverpool::observability::{logging, metrics};
use serverpool::{DiagnosticsServer, Item, Pool, StopOutcome};

#[derive(Parser)]
#[command(name = "serverpool")]
#[command(about = "Run servers under a pool with graceful shutdown", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults plus SERVERPOOL_*
    /// environment overrides are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::from_env()?,
    };

    logging::init(&config.observability)?;

    tracing::info!("serverpool v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        stop_timeout_ms = config.pool.stop_timeout_ms,
        signals = ?config.pool.signals,
        diagnostics = config.diagnostics.enabled,
        "Configuration loaded"
    );

    let mut items = Vec::new();
    if config.diagnostics.enabled {
        let mut server = DiagnosticsServer::new(config.diagnostics.clone());
        if config.observability.metrics_enabled {
            match metrics::init_metrics() {
                Ok(handle) => server = server.with_metrics(handle),
                Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
            }
        }
        items.push(Item::new("diagnostics", Arc::new(server)));
    }

    let pool = Pool::new(&config.pool, items);
    let (mut signals, mut errors) = pool.start()?;
    pool.ready(true);

    tokio::select! {
        signal = signals.recv() => {
            tracing::info!(signal = %signal, "Shutdown signal received");
        }
        failure = errors.recv() => match failure {
            Some(err) => tracing::error!(error = %err, "Server failed, shutting down"),
            None => tracing::info!("All servers exited"),
        },
    }

    let reports = pool.stop().await?;
    let failed = reports
        .iter()
        .filter(|report| !matches!(report.outcome, StopOutcome::Stopped))
        .count();

    tracing::info!(items = reports.len(), failed, "Shutdown complete");
    Ok(())
}
