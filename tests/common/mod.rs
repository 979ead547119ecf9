//! Shared mock servers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serverpool::lifecycle::{Deadline, Shutdown};
use serverpool::{ItemState, Pool, PoolConfig, Server, ServerError, Signaler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What a mock does when started.
#[derive(Debug, Clone, Copy)]
pub enum StartMode {
    /// Run until `stop` is called.
    UntilStopped,
    /// Return an error right away.
    Fail(&'static str),
    /// Panic right away.
    Panic,
    /// Never return, even when stopped.
    Forever,
}

/// Something a mock observed, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Ready { server: String, ready: bool },
    StopCalled { server: String },
}

/// Ordered, timestamped record shared by several mocks.
#[derive(Debug, Default)]
pub struct EventLog(Mutex<Vec<(Instant, Event)>>);

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push((Instant::now(), event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, Event)> {
        self.0.lock().unwrap().clone()
    }
}

/// A configurable server that records every call made to it.
pub struct MockServer {
    name: String,
    start_mode: StartMode,
    stop_delay: Duration,
    stop_error: Option<&'static str>,
    stop_panics: bool,
    signaler: bool,
    log: Arc<EventLog>,
    shutdown: Shutdown,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    /// Stops that ran to completion, deadline or not.
    pub stops_finished: AtomicUsize,
}

impl MockServer {
    pub fn new(name: &str, log: &Arc<EventLog>) -> Self {
        Self {
            name: name.to_string(),
            start_mode: StartMode::UntilStopped,
            stop_delay: Duration::ZERO,
            stop_error: None,
            stop_panics: false,
            signaler: false,
            log: Arc::clone(log),
            shutdown: Shutdown::new(),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            stops_finished: AtomicUsize::new(0),
        }
    }

    pub fn start_mode(mut self, mode: StartMode) -> Self {
        self.start_mode = mode;
        self
    }

    /// Time `stop` takes, regardless of its deadline.
    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    pub fn stop_error(mut self, msg: &'static str) -> Self {
        self.stop_error = Some(msg);
        self
    }

    /// Panic inside `stop` after the delay.
    pub fn stop_panics(mut self) -> Self {
        self.stop_panics = true;
        self
    }

    /// Also act as a readiness [`Signaler`].
    pub fn signaler(mut self) -> Self {
        self.signaler = true;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Server for MockServer {
    async fn start(&self) -> Result<(), ServerError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        match self.start_mode {
            StartMode::UntilStopped => {
                self.shutdown.subscribe().recv().await;
                Ok(())
            }
            StartMode::Fail(msg) => Err(ServerError::other(msg)),
            StartMode::Panic => panic!("{} exploded", self.name),
            StartMode::Forever => std::future::pending().await,
        }
    }

    async fn stop(&self, _deadline: Deadline) -> Result<(), ServerError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(Event::StopCalled {
            server: self.name.clone(),
        });
        tokio::time::sleep(self.stop_delay).await;
        if self.stop_panics {
            panic!("{} failed to stop", self.name);
        }
        self.shutdown.trigger();
        self.stops_finished.fetch_add(1, Ordering::SeqCst);
        match self.stop_error {
            Some(msg) => Err(ServerError::other(msg)),
            None => Ok(()),
        }
    }

    fn address(&self) -> String {
        format!("mock://{}", self.name)
    }

    fn as_signaler(self: Arc<Self>) -> Option<Arc<dyn Signaler>> {
        if self.signaler {
            Some(self)
        } else {
            None
        }
    }
}

impl Signaler for MockServer {
    fn set_ready(&self, ready: bool) {
        self.log.push(Event::Ready {
            server: self.name.clone(),
            ready,
        });
    }
}

/// Pool settings that never touch process signals.
pub fn test_config(stop_timeout: Duration) -> PoolConfig {
    PoolConfig {
        stop_timeout_ms: stop_timeout.as_millis() as u64,
        signals: Vec::new(),
    }
}

/// Poll until `name` reaches `state`, failing after a second.
pub async fn wait_for_state(pool: &Pool, name: &str, state: ItemState) {
    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        if pool.state(name) == Some(state) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "{name} stuck in {:?}, expected {state:?}",
            pool.state(name)
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
