//! Named servers and their lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::server::Server;

/// A named server; the unit the pool manages.
#[derive(Clone)]
pub struct Item {
    name: String,
    server: Arc<dyn Server>,
}

impl Item {
    pub fn new(name: impl Into<String>, server: Arc<dyn Server>) -> Self {
        Self {
            name: name.into(),
            server,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server(&self) -> &Arc<dyn Server> {
        &self.server
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("name", &self.name)
            .field("address", &self.server.address())
            .finish()
    }
}

/// Lifecycle of a single item as observed by the pool.
///
/// ```text
/// Unstarted → Starting → Running → Stopping → Stopped
///                 │          │         │
///                 └──────────┴─────────┴──→ Failed
/// ```
///
/// `Running` means the pool has launched `Server::start`, not that the
/// server has bound its address or is serving yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ItemState {
    Unstarted = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
    Failed = 5,
}

impl ItemState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ItemState::Unstarted,
            1 => ItemState::Starting,
            2 => ItemState::Running,
            3 => ItemState::Stopping,
            4 => ItemState::Stopped,
            _ => ItemState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Stopped | ItemState::Failed)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::Unstarted => "unstarted",
            ItemState::Starting => "starting",
            ItemState::Running => "running",
            ItemState::Stopping => "stopping",
            ItemState::Stopped => "stopped",
            ItemState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Lock-free holder for an [`ItemState`], shared between the pool and the
/// item's start task.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ItemState::Unstarted as u8))
    }

    pub(crate) fn get(&self) -> ItemState {
        ItemState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ItemState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move to `to` only if the current state is `from`.
    pub(crate) fn transition(&self, from: ItemState, to: ItemState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move to `to` unless the item already reached a terminal state.
    pub(crate) fn advance(&self, to: ItemState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                if ItemState::from_u8(cur).is_terminal() {
                    None
                } else {
                    Some(to as u8)
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_requires_expected_state() {
        let cell = StateCell::new();
        assert!(!cell.transition(ItemState::Running, ItemState::Stopping));
        assert!(cell.transition(ItemState::Unstarted, ItemState::Starting));
        assert_eq!(cell.get(), ItemState::Starting);
    }

    #[test]
    fn advance_never_leaves_terminal_state() {
        let cell = StateCell::new();
        cell.set(ItemState::Failed);
        cell.advance(ItemState::Stopping);
        assert_eq!(cell.get(), ItemState::Failed);

        let cell = StateCell::new();
        cell.advance(ItemState::Running);
        assert_eq!(cell.get(), ItemState::Running);
    }
}
