//! Process-local server lifecycle orchestration.
//!
//! A [`Pool`] owns a fixed set of named servers, starts them concurrently,
//! broadcasts pool-wide readiness to the servers that want it and stops them
//! gracefully, each under its own deadline, when the process is told to
//! terminate or a server fails.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod pool;

pub use config::{PoolConfig, ServiceConfig};
pub use health::DiagnosticsServer;
pub use lifecycle::{Deadline, SignalKind, Signals};
pub use pool::{Item, ItemState, Pool, PoolError, Server, ServerError, Signaler, StopOutcome};
