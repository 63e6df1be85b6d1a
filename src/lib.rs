//! scenelock - hierarchical read/write locking for collaborative scene and
//! project editing.
//!
//! Several clients edit the same scene or project at once. Before touching an
//! object a client takes a read or write lock on it; a tree lock claims the
//! object's whole subtree. Locks are cooperative and advisory: they serialize
//! intent between clients, nothing else.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RPC: POST /rpc (JSON envelope) | GET /health               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session: owner + EditorState | preconditions               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scoped acquisition: all-or-nothing | retry | RAII release  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LockManager: root resolution | lock records per root       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use scenelock::config::SceneLockConfig;
//!
//! #[tokio::main]
//! async fn main() -> scenelock::Result<()> {
//!     let config = SceneLockConfig::development();
//!     scenelock::run(config).await
//! }
//! ```
//!
//! Using the lock manager directly:
//!
//! ```rust
//! use scenelock::lock::LockManager;
//!
//! let manager = LockManager::for_scene("scene1");
//! assert!(manager.read_lock("obj1", "ui-1").unwrap());
//! assert!(!manager.write_lock("obj1", "ui-2", false).unwrap());
//! manager.read_unlock("obj1", "ui-1").unwrap();
//! assert_eq!(manager.locked_root_count(), 0);
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod lock;
pub mod resilience;
pub mod rpc;
pub mod session;
pub mod types;

pub mod cli;
pub mod observability;

// Re-exports
pub use error::{Result, SceneLockError};
pub use types::*;

use config::SceneLockConfig;
use rpc::RpcHandler;
use session::EditorState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Run the scenelock server with the given configuration.
pub async fn run(config: SceneLockConfig) -> Result<()> {
    observability::init(&config.observability)?;
    config.validate()?;

    info!(
        bind_addr = %config.server.bind_addr,
        max_attempts = config.lock.retry.max_attempts,
        delay_ms = config.lock.retry.delay.as_millis() as u64,
        "Starting scenelock"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        info!("Starting metrics server on {}", config.observability.metrics_addr);
        let metrics_addr = config.observability.metrics_addr;

        Some(tokio::spawn(async move {
            if let Err(e) = observability::run_metrics_server(metrics_addr).await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let state = Arc::new(EditorState::new(
        config.lock.retry,
        config.lock.server_owner.clone(),
    ));
    let app = rpc::router(RpcHandler::new(state));

    let listener = TcpListener::bind(config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "RPC server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SceneLockError::Network(e.to_string()))?;

    if let Some(handle) = metrics_handle {
        if !handle.is_finished() {
            warn!(service = "metrics", "Force aborting service");
            handle.abort();
        }
    }

    info!("scenelock shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down scenelock gracefully...");
}
