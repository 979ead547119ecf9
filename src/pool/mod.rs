//! Server pool subsystem.
//!
//! # Data Flow
//! ```text
//! Pool::new(config, items)
//!     → Pool::start()            one task per item runs Server::start
//!         ├─ Signals             OS signals for the caller's event loop
//!         └─ StartErrors         start failures, one per failed item
//!     → Pool::ready(true)        fan-out to every Signaler
//!     → Pool::stop()             ready(false), then per-item stop races
//!                                against its own deadline
//! ```
//!
//! # Design Decisions
//! - No ordering between items, on start or on stop
//! - Start never awaits a server; stop awaits every item's race
//! - Per-item failures are logged and reported, never aggregated
//! - The signaler probe runs once per item at start and is cached

mod item;
mod manager;
mod server;

pub use item::{Item, ItemState};
pub use manager::{Pool, PoolError, StartError, StartErrors, StopOutcome, StopReport};
pub use server::{Server, ServerError, Signaler};
