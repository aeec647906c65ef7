//! Web server configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where `GET /` takes its document from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServeMode {
    /// Render a fresh report for every request
    Live,
    /// Serve the newest report file from the report directory
    Archive,
}

/// What `GET /refresh` does before redirecting to `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshMode {
    /// Redirect only
    Redirect,
    /// Write a new report file, then redirect
    Regenerate,
}

/// Configuration for the web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Whether `/api/status` is served
    pub enable_api: bool,
    pub serve_mode: ServeMode,
    pub refresh_mode: RefreshMode,
    /// Directory report files are written to and served from
    pub report_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            enable_api: true,
            serve_mode: ServeMode::Live,
            refresh_mode: RefreshMode::Redirect,
            report_dir: PathBuf::from(crate::DEFAULT_REPORT_DIR),
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the host for the web server.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port for the web server.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Enable or disable the JSON status endpoint.
    pub fn with_api(mut self, enable_api: bool) -> Self {
        self.enable_api = enable_api;
        self
    }

    pub fn with_serve_mode(mut self, mode: ServeMode) -> Self {
        self.serve_mode = mode;
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Set the report directory.
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
