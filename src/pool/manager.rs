//! The server pool: concurrent start, readiness broadcast, bounded shutdown.

use futures_util::future::join_all;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{Instrument, Span};

use crate::config::PoolConfig;
use crate::lifecycle::{Deadline, SignalKind, Signals};
use crate::observability::metrics;

use super::item::{Item, ItemState, StateCell};
use super::server::{ServerError, Signaler};

/// Misuse of the pool's lifecycle, or failure to set it up.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool already started")]
    AlreadyStarted,

    #[error("pool was never started")]
    NotStarted,

    #[error("pool already stopped")]
    AlreadyStopped,

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// A server's `start` returned an error.
#[derive(Debug, Error)]
#[error("{item}: {source}")]
pub struct StartError {
    /// Name of the failed item.
    pub item: String,
    #[source]
    pub source: ServerError,
}

/// Receives [`StartError`]s, one per failed item.
///
/// Yields `None` once every start task has returned.
pub type StartErrors = mpsc::UnboundedReceiver<StartError>;

/// How a single item's graceful stop ended.
#[derive(Debug)]
pub enum StopOutcome {
    /// `stop` returned `Ok` before the deadline.
    Stopped,
    /// `stop` returned an error before the deadline.
    Failed(ServerError),
    /// The deadline passed first; the stop task may still be running.
    TimedOut,
}

impl StopOutcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, StopOutcome::Stopped)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, StopOutcome::TimedOut)
    }

    fn label(&self) -> &'static str {
        match self {
            StopOutcome::Stopped => "stopped",
            StopOutcome::Failed(_) => "failed",
            StopOutcome::TimedOut => "timed_out",
        }
    }
}

/// Per-item entry of the report returned by [`Pool::stop`].
#[derive(Debug)]
pub struct StopReport {
    pub item: String,
    pub outcome: StopOutcome,
    /// Time until the race resolved.
    pub elapsed: Duration,
}

const PHASE_IDLE: u8 = 0;
const PHASE_RUNNING: u8 = 1;
const PHASE_STOPPING: u8 = 2;
const PHASE_STOPPED: u8 = 3;

struct Entry {
    item: Item,
    state: Arc<StateCell>,
}

/// Manages a fixed set of [`Item`]s.
///
/// Items are given at construction and cannot be added or removed later.
pub struct Pool {
    entries: Vec<Entry>,
    signalers: Mutex<Vec<Arc<dyn Signaler>>>,
    phase: AtomicU8,
    stop_timeout: Duration,
    signals: Vec<SignalKind>,
    span: Span,
}

impl Pool {
    /// Create a pool over `items`, in the given order.
    pub fn new(config: &PoolConfig, items: Vec<Item>) -> Self {
        let entries = items
            .into_iter()
            .map(|item| Entry {
                item,
                state: Arc::new(StateCell::new()),
            })
            .collect();

        Self {
            entries,
            signalers: Mutex::new(Vec::new()),
            phase: AtomicU8::new(PHASE_IDLE),
            stop_timeout: config.stop_timeout(),
            signals: config.signals.clone(),
            span: tracing::info_span!("pool"),
        }
    }

    /// Log pool events inside `span` instead of the default `pool` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Start every item concurrently.
    ///
    /// Returns immediately with the subscribed OS signals and a channel of
    /// start failures. A failing item never affects its siblings; deciding
    /// whether to [`stop`](Self::stop) is up to the caller.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(Signals, StartErrors), PoolError> {
        self.phase
            .compare_exchange(PHASE_IDLE, PHASE_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PoolError::AlreadyStarted)?;

        let signals = if self.signals.is_empty() {
            Signals::none()
        } else {
            match Signals::subscribe(&self.signals) {
                Ok(signals) => signals,
                Err(e) => {
                    self.phase.store(PHASE_IDLE, Ordering::Release);
                    return Err(PoolError::Signal(e));
                }
            }
        };

        let (err_tx, err_rx) = mpsc::unbounded_channel();

        for entry in &self.entries {
            let name = entry.item.name().to_string();
            let server = Arc::clone(entry.item.server());
            let state = Arc::clone(&entry.state);
            let err_tx = err_tx.clone();

            state.set(ItemState::Starting);

            if let Some(signaler) = Arc::clone(&server).as_signaler() {
                self.signalers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(signaler);
            }

            tokio::spawn(
                async move {
                    tracing::info!(item = %name, address = %server.address(), "Starting");
                    state.transition(ItemState::Starting, ItemState::Running);
                    metrics::record_item_started(&name);

                    let result = AssertUnwindSafe(server.start())
                        .catch_unwind()
                        .await
                        .unwrap_or(Err(ServerError::Panicked));

                    match result {
                        Ok(()) => {
                            state.transition(ItemState::Running, ItemState::Stopped);
                            tracing::info!(item = %name, "Server exited");
                        }
                        Err(source) => {
                            state.transition(ItemState::Running, ItemState::Failed);
                            tracing::error!(item = %name, error = %source, "Server failed");
                            metrics::record_start_failure(&name);
                            let _ = err_tx.send(StartError { item: name, source });
                        }
                    }
                }
                .instrument(self.span.clone()),
            );
        }

        tracing::info!(parent: &self.span, items = self.entries.len(), "Pool started");
        Ok((signals, err_rx))
    }

    /// Broadcast `ready` to every registered signaler, in registration order.
    pub fn ready(&self, ready: bool) {
        let signalers = self
            .signalers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for signaler in &signalers {
            signaler.set_ready(ready);
        }

        metrics::set_ready(ready);
        tracing::debug!(parent: &self.span, ready, signalers = signalers.len(), "Readiness broadcast");
    }

    /// Gracefully stop every item.
    ///
    /// Readiness is withdrawn first. Each item then gets its own deadline
    /// and the items stop concurrently; a failure or timeout of one item
    /// never holds up the others. Returns one report per item, in item
    /// order, once every item either stopped or ran out of time.
    pub async fn stop(&self) -> Result<Vec<StopReport>, PoolError> {
        self.phase
            .compare_exchange(PHASE_RUNNING, PHASE_STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|phase| match phase {
                PHASE_IDLE => PoolError::NotStarted,
                _ => PoolError::AlreadyStopped,
            })?;

        self.ready(false);

        let reports = join_all(self.entries.iter().map(|entry| self.stop_item(entry))).await;

        self.phase.store(PHASE_STOPPED, Ordering::Release);
        tracing::info!(parent: &self.span, "Pool stopped");
        Ok(reports)
    }

    async fn stop_item(&self, entry: &Entry) -> StopReport {
        let name = entry.item.name().to_string();
        let server = Arc::clone(entry.item.server());
        let started = Instant::now();
        let deadline = Deadline::after(self.stop_timeout);

        let previous = entry.state.get();
        entry.state.advance(ItemState::Stopping);
        tracing::info!(
            parent: &self.span,
            item = %name,
            address = %server.address(),
            state = %previous,
            "Stopping"
        );

        let (tx, rx) = oneshot::channel();
        tokio::spawn(
            async move {
                let _ = tx.send(server.stop(deadline).await);
            }
            .instrument(self.span.clone()),
        );

        let outcome = tokio::select! {
            biased;
            res = rx => match res {
                Ok(Ok(())) => StopOutcome::Stopped,
                Ok(Err(e)) => StopOutcome::Failed(e),
                // Sender dropped without sending: the stop task panicked.
                Err(_) => StopOutcome::Failed(ServerError::Panicked),
            },
            _ = deadline.expired() => StopOutcome::TimedOut,
        };

        let elapsed = started.elapsed();
        match &outcome {
            StopOutcome::Stopped => {
                entry.state.advance(ItemState::Stopped);
                tracing::info!(parent: &self.span, item = %name, elapsed_ms = elapsed.as_millis() as u64, "Stopped");
            }
            StopOutcome::Failed(e) => {
                entry.state.set(ItemState::Failed);
                tracing::error!(parent: &self.span, item = %name, error = %e, "Stop failed");
            }
            StopOutcome::TimedOut => {
                entry.state.set(ItemState::Failed);
                tracing::error!(
                    parent: &self.span,
                    item = %name,
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "Stop timed out"
                );
            }
        }
        metrics::record_stop(&name, outcome.label(), elapsed);

        StopReport {
            item: name,
            outcome,
            elapsed,
        }
    }

    /// Current state of the first item named `name`.
    pub fn state(&self, name: &str) -> Option<ItemState> {
        self.entries
            .iter()
            .find(|entry| entry.item.name() == name)
            .map(|entry| entry.state.get())
    }

    /// Items in the order they were given.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().map(|entry| &entry.item)
    }

    /// Per-item stop deadline.
    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("items", &self.entries.iter().map(|e| &e.item).collect::<Vec<_>>())
            .field("stop_timeout", &self.stop_timeout)
            .field("signals", &self.signals)
            .finish()
    }
}
