//! Capabilities a unit must provide to be managed by a [`Pool`](super::Pool).

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::Deadline;

/// Errors reported by a managed server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding, accepting or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `start` was called on a server that is already running.
    #[error("server already started")]
    AlreadyStarted,

    /// The graceful stop did not finish before its deadline.
    #[error("stop deadline exceeded")]
    DeadlineExceeded,

    /// The task driving the server panicked.
    #[error("server task panicked")]
    Panicked,

    /// Any other failure, described by the implementation.
    #[error("{0}")]
    Other(String),
}

impl ServerError {
    /// Wrap an arbitrary error message.
    pub fn other(msg: impl Into<String>) -> Self {
        ServerError::Other(msg.into())
    }
}

/// A long-running unit the pool can start and gracefully stop.
///
/// Any type providing these operations qualifies; the pool never looks at
/// what the server does.
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Run the server. Resolves when it terminates or fails.
    async fn start(&self) -> Result<(), ServerError>;

    /// Gracefully stop the server.
    ///
    /// Must return once resources are released or `deadline` has passed.
    async fn stop(&self, deadline: Deadline) -> Result<(), ServerError>;

    /// Address the server runs on.
    fn address(&self) -> String;

    /// Optional readiness capability.
    ///
    /// Servers that want pool-wide readiness notifications return
    /// `Some(self)`. Queried once per item when the pool starts.
    fn as_signaler(self: Arc<Self>) -> Option<Arc<dyn Signaler>> {
        None
    }
}

/// Receives the pool-wide readiness flag.
///
/// Has no error channel: implementations handle their own failures.
pub trait Signaler: Send + Sync + 'static {
    fn set_ready(&self, ready: bool);
}
