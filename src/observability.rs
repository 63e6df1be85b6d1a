//! Observability for scenelock.
//!
//! Structured logging through `tracing` and Prometheus metrics through the
//! `metrics` facade. The recording functions are cheap no-ops until a
//! recorder is installed, so the lock manager calls them unconditionally.

use crate::config::ObservabilityConfig;
use crate::error::{Result, SceneLockError};
use axum::routing::get;
use axum::Router;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| SceneLockError::InvalidConfig {
            field: "observability.log_level".to_string(),
            reason: e.to_string(),
        })?;

    let format = if config.json_logs {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()
        .map_err(|e| SceneLockError::Internal(format!("Logging already initialized: {}", e)))?;

    info!(level = %config.log_level, json = config.json_logs, "Logging initialized");
    Ok(())
}

/// Install the Prometheus recorder and serve it on `addr` until the task is
/// aborted.
pub async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        SceneLockError::Internal(format!("Failed to install metrics recorder: {}", e))
    })?;
    register_metrics();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Metrics server listening");

    axum::serve(listener, metrics_router(handle))
        .await
        .map_err(|e| SceneLockError::Network(e.to_string()))
}

/// `/metrics` in the Prometheus text format, plus `/health`.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(move || async move { handle.render() }))
        .route("/health", get(|| async { "OK" }))
}

fn register_metrics() {
    describe_counter!("scenelock_lock_granted_total", "Lock grants issued, by mode");
    describe_counter!("scenelock_lock_denied_total", "Lock requests denied, by mode");
    describe_counter!("scenelock_lock_released_total", "Lock grants released, by mode");
    describe_gauge!("scenelock_locked_roots", "Roots holding at least one grant");
    describe_counter!("scenelock_rpc_requests_total", "RPC requests handled, by request");
    describe_counter!("scenelock_rpc_errors_total", "Failed RPC requests, by error kind");

    for mode in ["read", "write", "tree"] {
        counter!("scenelock_lock_granted_total", "mode" => mode).absolute(0);
        counter!("scenelock_lock_denied_total", "mode" => mode).absolute(0);
    }
    gauge!("scenelock_locked_roots").set(0.0);
}

/// Record a granted lock.
pub fn record_lock_granted(mode: &'static str) {
    counter!("scenelock_lock_granted_total", "mode" => mode).increment(1);
}

/// Record a denied lock request.
pub fn record_lock_denied(mode: &'static str) {
    counter!("scenelock_lock_denied_total", "mode" => mode).increment(1);
}

/// Record released grants.
pub fn record_lock_released(mode: &'static str, count: u64) {
    counter!("scenelock_lock_released_total", "mode" => mode).increment(count);
}

pub fn update_locked_roots(roots: usize) {
    gauge!("scenelock_locked_roots").set(roots as f64);
}

/// Record an RPC request.
pub fn record_rpc_request(request: &str, error_kind: Option<&'static str>) {
    counter!("scenelock_rpc_requests_total", "request" => request.to_string()).increment(1);

    if let Some(kind) = error_kind {
        counter!("scenelock_rpc_errors_total", "kind" => kind).increment(1);
    }
}
