//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pool and servers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → /metrics on the diagnostics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
