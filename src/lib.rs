//! # Pi Diagnostics - Raspberry Pi hardware and network reports
//!
//! A Rust crate that inspects a Raspberry Pi by running the usual system
//! utilities (`vcgencmd`, `ip`, `lsusb`, `dmesg`, ...) and turns their output
//! into reports.
//!
//! ## Features
//!
//! - **Hardware detection**: model, memory, WiFi, Ethernet, AI accelerator and cooling
//! - **HTML report**: a self-contained diagnostics page with status colouring
//! - **Web server**: the report on `/`, a refresh endpoint and a JSON status API
//! - **Pi-hole report**: the Pi-hole configuration as Markdown
//! - **Prometheus exporter**: CPU temperature and accelerator presence gauges
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_diagnostics::{start_web_server, LocalHost, ReportGenerator, Thresholds, WebConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = ReportGenerator::detect(Arc::new(LocalHost::new()), Thresholds::default()).await;
//!
//!     // Serve the report on port 8080
//!     start_web_server(WebConfig::default(), generator).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod exporter;
pub mod pihole;
pub mod probe;
pub mod report;
pub mod web;

// Re-export public API
pub use error::{Result, SystemError};
pub use exporter::{run_exporter, Exporter, ExporterConfig};
pub use pihole::{PiholeConfig, PiholeReporter};
pub use probe::{
    is_privileged, CommandOutput, HardwareProfile, Host, LocalHost, ProbeConfig, ScriptedHost,
    StatusSnapshot,
};
pub use report::{
    latest_report, Boundary, Report, ReportFormat, ReportGenerator, StatusClass, Thresholds,
};
pub use web::{start_web_server, RefreshMode, ServeMode, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// The default metrics exporter port
pub const DEFAULT_EXPORTER_PORT: u16 = 9102;

/// Directory HTML reports are written to by default
pub const DEFAULT_REPORT_DIR: &str = "/tmp";

/// Seconds between exporter polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Seconds to wait after a failed exporter poll
pub const DEFAULT_BACKOFF_SECS: u64 = 60;
