//! Diagnostics server: liveness, readiness and metrics probes.
//!
//! Implements both [`Server`] and [`Signaler`], so the pool starts it like
//! any other item and flips its readiness flag on `ready`/`stop`.

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;

use crate::config::DiagnosticsConfig;
use crate::health::probes::{build_router, ProbeState};
use crate::lifecycle::{Deadline, Shutdown};
use crate::pool::{Server, ServerError, Signaler};

/// HTTP endpoint exposing `/healthz`, `/readyz` and optionally `/metrics`.
pub struct DiagnosticsServer {
    config: DiagnosticsConfig,
    ready: Arc<AtomicBool>,
    metrics: Option<PrometheusHandle>,
    started: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
    /// Asks the serve loop to drain.
    shutdown: Shutdown,
    /// Triggered once `start` has returned, whatever the reason.
    finished: Shutdown,
}

impl DiagnosticsServer {
    /// Create a server that is not ready until told otherwise.
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self {
            config,
            ready: Arc::new(AtomicBool::new(false)),
            metrics: None,
            started: AtomicBool::new(false),
            local_addr: OnceLock::new(),
            shutdown: Shutdown::new(),
            finished: Shutdown::new(),
        }
    }

    /// Serve Prometheus metrics rendered from `handle` on `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Current readiness flag.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// The probe router backed by this server's readiness flag.
    pub fn router(&self) -> axum::Router {
        build_router(
            &self.config,
            ProbeState {
                ready: Arc::clone(&self.ready),
                metrics: self.metrics.clone(),
            },
        )
    }

    async fn serve(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);

        tracing::info!(address = %addr, "Diagnostics server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(self.shutdown.subscribe().recv())
            .await?;

        tracing::info!(address = %addr, "Diagnostics server stopped");
        Ok(())
    }
}

#[async_trait]
impl Server for DiagnosticsServer {
    async fn start(&self) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyStarted);
        }
        let result = self.serve().await;
        self.finished.trigger();
        result
    }

    async fn stop(&self, deadline: Deadline) -> Result<(), ServerError> {
        self.shutdown.trigger();
        if !self.started.load(Ordering::Acquire) {
            return Ok(());
        }

        tokio::time::timeout_at(deadline.instant(), self.finished.subscribe().recv())
            .await
            .map_err(|_| ServerError::DeadlineExceeded)
    }

    fn address(&self) -> String {
        match self.local_addr() {
            Some(addr) => addr.to_string(),
            None => self.config.bind_address.clone(),
        }
    }

    fn as_signaler(self: Arc<Self>) -> Option<Arc<dyn Signaler>> {
        Some(self)
    }
}

impl Signaler for DiagnosticsServer {
    fn set_ready(&self, ready: bool) {
        let previous = self.ready.swap(ready, Ordering::AcqRel);
        if previous != ready {
            tracing::info!(ready, "Diagnostics readiness changed");
        }
    }
}
