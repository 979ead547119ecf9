//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for an explicitly configured set of signals
//! - Forward deliveries to the caller's event loop through [`Signals`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Subscription is opt-in per signal; an empty set never fires
//! - Listener tasks live exactly as long as the [`Signals`] value

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Signals a pool can subscribe to on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
}

impl SignalKind {
    /// The set subscribed to when nothing else is configured.
    pub fn defaults() -> Vec<SignalKind> {
        vec![SignalKind::Interrupt, SignalKind::Terminate]
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Hangup => "SIGHUP",
            SignalKind::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

impl FromStr for SignalKind {
    type Err = UnknownSignal;

    /// Accepts the config names (`terminate`) and the POSIX names
    /// (`SIGTERM`, `TERM`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("sig").unwrap_or(&name);
        match name {
            "interrupt" | "int" => Ok(SignalKind::Interrupt),
            "terminate" | "term" => Ok(SignalKind::Terminate),
            "hangup" | "hup" => Ok(SignalKind::Hangup),
            "quit" => Ok(SignalKind::Quit),
            _ => Err(UnknownSignal(s.to_string())),
        }
    }
}

/// A signal name that does not map to a [`SignalKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal {0:?}")]
pub struct UnknownSignal(pub String);

/// Receiver for subscribed OS signals.
///
/// Dropping it unregisters interest by aborting the listener tasks.
#[derive(Debug)]
pub struct Signals {
    rx: mpsc::Receiver<SignalKind>,
    listeners: Vec<JoinHandle<()>>,
}

impl Signals {
    /// Install handlers for `kinds` and return the receiving end.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(kinds: &[SignalKind]) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(kinds.len().max(1));
        let mut listeners = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            match listen(kind, tx.clone()) {
                Ok(handle) => listeners.push(handle),
                Err(e) => {
                    for handle in &listeners {
                        handle.abort();
                    }
                    return Err(e);
                }
            }
        }

        tracing::debug!(signals = ?kinds, "Signal handlers installed");
        Ok(Self { rx, listeners })
    }

    /// A receiver that never fires.
    pub fn none() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self {
            rx,
            listeners: Vec::new(),
        }
    }

    /// Wait for the next subscribed signal.
    ///
    /// Pends forever when nothing is subscribed, so it can sit in a
    /// `tokio::select!` next to other branches.
    pub async fn recv(&mut self) -> SignalKind {
        match self.rx.recv().await {
            Some(kind) => kind,
            None => std::future::pending().await,
        }
    }

    /// Number of installed signal listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether every installed listener is still running.
    pub fn is_listening(&self) -> bool {
        self.listeners.iter().all(|handle| !handle.is_finished())
    }
}

impl Drop for Signals {
    fn drop(&mut self) {
        for handle in &self.listeners {
            handle.abort();
        }
    }
}

#[cfg(unix)]
fn listen(kind: SignalKind, tx: mpsc::Sender<SignalKind>) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind as UnixSignal};

    let unix_signal = match kind {
        SignalKind::Interrupt => UnixSignal::interrupt(),
        SignalKind::Terminate => UnixSignal::terminate(),
        SignalKind::Hangup => UnixSignal::hangup(),
        SignalKind::Quit => UnixSignal::quit(),
    };
    let mut stream = signal(unix_signal)?;

    Ok(tokio::spawn(async move {
        while stream.recv().await.is_some() {
            tracing::info!(signal = %kind, "Signal received");
            if tx.send(kind).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
fn listen(kind: SignalKind, tx: mpsc::Sender<SignalKind>) -> io::Result<JoinHandle<()>> {
    match kind {
        SignalKind::Interrupt => Ok(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(signal = %kind, "Signal received");
                if tx.send(kind).await.is_err() {
                    break;
                }
            }
        })),
        other => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{other} is not supported on this platform"),
        )),
    }
}
