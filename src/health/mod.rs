//! Health probing subsystem.
//!
//! # Data Flow
//! ```text
//! Pool::ready(bool)
//!     → DiagnosticsServer::set_ready (diagnostics.rs)
//!     → readiness flag
//!     → GET /readyz (probes.rs): 200 while ready, 503 otherwise
//!
//! GET /healthz: 200 whenever the server answers
//! GET /metrics: Prometheus text, when a recorder handle is attached
//! ```
//!
//! # Design Decisions
//! - Readiness starts false; only the pool makes it true
//! - Pool::stop withdraws readiness before any server stops, so load
//!   balancers drain traffic first

pub mod diagnostics;
pub mod probes;

pub use diagnostics::DiagnosticsServer;
