//! Lifecycle primitives shared by the pool and the servers it manages.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Signals receiver → caller's event loop → Pool::stop
//!
//! Deadline (deadline.rs):
//!     Pool::stop → Deadline::after(stop_timeout) → Server::stop(deadline)
//!
//! Shutdown (shutdown.rs):
//!     Server::stop → Shutdown::trigger → serve loop drains and returns
//! ```
//!
//! # Design Decisions
//! - Signal subscription is explicit; nothing is installed implicitly
//! - Deadlines are absolute so they survive being passed between tasks
//! - Shutdown is graceful-only: nothing here aborts a running server

pub mod deadline;
pub mod shutdown;
pub mod signals;

pub use deadline::Deadline;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{SignalKind, Signals};
