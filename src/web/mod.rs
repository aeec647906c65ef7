//! Web server for the diagnostics report.
//!
//! Serves the HTML report at `/`, a refresh endpoint and a JSON status API.
//! Every request is answered from a fresh status collection.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::{RefreshMode, ServeMode, WebConfig};
pub use router::create_app;

use crate::error::{Result, SystemError};
use crate::report::ReportGenerator;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared state behind every handler.
pub struct AppState {
    pub generator: ReportGenerator,
    pub config: WebConfig,
}

/// Start the web server and serve until SIGINT or SIGTERM.
///
/// Failing to bind the port is returned as an error. On a signal the server
/// stops at once without draining open connections.
pub async fn start_web_server(config: WebConfig, generator: ReportGenerator) -> Result<()> {
    // Parse the bind address
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SystemError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        SystemError::web_server_error(format!("Failed to bind to {}: {}", addr, e))
    })?;

    info!("Starting diagnostics web server on http://{}", addr);
    info!("Report available at http://{}/", addr);
    if config.enable_api {
        info!("API endpoint: http://{}/api/status", addr);
    }

    let app = create_app(Arc::new(AppState { generator, config }));

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.map_err(|e| SystemError::web_server_error(format!("Server error: {}", e)))?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping web server");
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
