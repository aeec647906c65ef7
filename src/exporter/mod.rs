//! Prometheus exporter for CPU temperature and accelerator presence.
//!
//! Polls the host on a fixed interval and serves the gauges as text
//! exposition format on `/metrics`. A gauge is only registered once it has a
//! value, so a metric that was never read is absent rather than zero.

use crate::error::{Result, SystemError};
use crate::probe::field::mentions_any;
use crate::probe::Host;
use crate::report::status_class::parse_celsius;
use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{opts, Encoder, Gauge, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Kernel module name fragments that indicate an accelerator.
pub const ACCELERATOR_MODULE_KEYWORDS: &[&str] = &["hailo", "coral", "tpu", "npu", "ai"];

/// `/dev` entry fragments that indicate an accelerator.
pub const ACCELERATOR_DEVICE_KEYWORDS: &[&str] = &["apex", "dri"];

/// Exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Listen address of the metrics endpoint
    pub listen: String,
    /// Delay between successful polls
    pub interval: Duration,
    /// Delay after a failed poll
    pub backoff: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", crate::DEFAULT_EXPORTER_PORT),
            interval: Duration::from_secs(crate::DEFAULT_POLL_INTERVAL_SECS),
            backoff: Duration::from_secs(crate::DEFAULT_BACKOFF_SECS),
        }
    }
}

impl ExporterConfig {
    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// A gauge that joins the registry on its first set.
struct LazyGauge {
    gauge: Gauge,
    registered: AtomicBool,
}

impl LazyGauge {
    fn new(name: &str, help: &str) -> Result<Self> {
        Ok(Self {
            gauge: Gauge::with_opts(opts!(name, help))?,
            registered: AtomicBool::new(false),
        })
    }

    fn set(&self, registry: &Registry, value: f64) -> Result<()> {
        self.gauge.set(value);
        if self
            .registered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if let Err(err) = registry.register(Box::new(self.gauge.clone())) {
                self.registered.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        }
        Ok(())
    }
}

/// Polls the host and holds the gauges.
pub struct Exporter {
    host: Arc<dyn Host>,
    registry: Registry,
    ai_hat_temperature: LazyGauge,
    cpu_temperature: LazyGauge,
    ai_hat_detected: LazyGauge,
}

impl Exporter {
    pub fn new(host: Arc<dyn Host>) -> Result<Self> {
        Ok(Self {
            host,
            registry: Registry::new(),
            ai_hat_temperature: LazyGauge::new("ai_hat_temperature_celsius", "AI HAT temperature")?,
            cpu_temperature: LazyGauge::new("cpu_temperature_celsius", "CPU temperature")?,
            ai_hat_detected: LazyGauge::new("ai_hat_detected", "AI HAT detection status")?,
        })
    }

    /// Read the host once and update the gauges.
    ///
    /// A missing temperature keeps the previous value. Fails when `lsmod`
    /// cannot be run, leaving `ai_hat_detected` untouched.
    pub async fn poll(&self) -> Result<()> {
        let output = self.host.run("vcgencmd", &["measure_temp"]).await;
        match output.success().then(|| parse_celsius(output.text())).flatten() {
            // The CPU reading stands in for the accelerator, which has no sensor of its own.
            Some(celsius) => {
                self.cpu_temperature.set(&self.registry, celsius)?;
                self.ai_hat_temperature.set(&self.registry, celsius)?;
                debug!("Temperature: {}°C", celsius);
            }
            None => debug!("No temperature reading, keeping previous value"),
        }

        let detected = self.detect_accelerator().await?;
        self.ai_hat_detected
            .set(&self.registry, if detected { 1.0 } else { 0.0 })?;
        Ok(())
    }

    async fn detect_accelerator(&self) -> Result<bool> {
        let lsmod = self.host.run("lsmod", &[]).await;
        if !lsmod.success() {
            return Err(SystemError::command_error("lsmod could not be run"));
        }
        if mentions_any(&lsmod.stdout, ACCELERATOR_MODULE_KEYWORDS) {
            debug!("Accelerator kernel module loaded");
            return Ok(true);
        }

        let devices = self.host.list_dir("/dev").await;
        Ok(devices.iter().any(|entry| {
            ACCELERATOR_DEVICE_KEYWORDS
                .iter()
                .any(|keyword| entry.contains(keyword))
        }))
    }

    /// Registered gauges in text exposition format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok(buf)
    }
}

/// Router serving `GET /metrics`.
pub fn metrics_router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(exporter)
}

async fn metrics_handler(State(exporter): State<Arc<Exporter>>) -> Response {
    match exporter.encode() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Serve `/metrics` and poll until an interrupt signal.
pub async fn run_exporter(config: ExporterConfig, host: Arc<dyn Host>) -> Result<()> {
    let exporter = Arc::new(Exporter::new(host)?);

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .map_err(|e| {
            SystemError::web_server_error(format!("Failed to bind to {}: {}", config.listen, e))
        })?;
    info!("Metrics available at http://{}/metrics", config.listen);

    let app = metrics_router(exporter.clone());
    let poller = async {
        loop {
            let wait = match exporter.poll().await {
                Ok(()) => config.interval,
                Err(e) => {
                    error!("Error collecting metrics: {}", e);
                    config.backoff
                }
            };
            tokio::time::sleep(wait).await;
        }
    };

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.map_err(|e| SystemError::web_server_error(format!("Server error: {}", e)))?;
        }
        _ = poller => {}
        _ = crate::web::shutdown_signal() => {
            info!("Shutting down exporter");
        }
    }

    Ok(())
}
