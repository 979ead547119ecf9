//! Probe handlers and router for the diagnostics endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::DiagnosticsConfig;

/// State shared by the probe handlers.
#[derive(Clone)]
pub struct ProbeState {
    pub ready: Arc<AtomicBool>,
    pub metrics: Option<PrometheusHandle>,
}

/// Build the probe router with its middleware layers.
///
/// `/metrics` is only routed when a Prometheus handle is present.
#[allow(deprecated)]
pub fn build_router(config: &DiagnosticsConfig, state: ProbeState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics));
    }

    router
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

/// Liveness: answering at all means alive.
async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness: follows the pool's last broadcast.
async fn readyz(State(state): State<ProbeState>) -> Response {
    if state.ready.load(Ordering::Acquire) {
        StatusCode::OK.into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
    }
}

async fn metrics(State(state): State<ProbeState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
