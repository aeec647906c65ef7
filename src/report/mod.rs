//! Diagnostics reports.
//!
//! A [`Report`] is rendered once from a [`HardwareProfile`], a freshly
//! collected [`StatusSnapshot`] and the render time, and is never modified
//! afterwards. [`ReportGenerator`] ties the pieces together for the CLI and
//! the web server.

pub mod html;
pub mod recommendations;
pub mod status_class;

// Re-export commonly used items
pub use html::render_html;
pub use recommendations::{recommendations, Recommendation};
pub use status_class::{Boundary, StatusClass, Thresholds};

use crate::error::Result;
use crate::probe::{HardwareProfile, Host, StatusSnapshot};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// File name prefix of HTML reports written to disk.
pub const REPORT_FILE_PREFIX: &str = "rpi_diagnostics_";

/// Document format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Html,
    Markdown,
}

impl ReportFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Markdown => "md",
        }
    }

    /// MIME type for HTTP responses.
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

/// A rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub format: ReportFormat,
    pub body: String,
    pub generated_at: DateTime<Local>,
}

impl Report {
    /// Timestamped file name, e.g. `rpi_diagnostics_20250101_120000.html`.
    pub fn file_name(&self) -> String {
        format!(
            "{}{}.{}",
            REPORT_FILE_PREFIX,
            self.generated_at.format("%Y%m%d_%H%M%S"),
            self.format.extension()
        )
    }

    /// Write the report into `dir`, creating it if needed.
    pub async fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, &self.body).await?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Produces reports for one machine.
///
/// The hardware profile is detected once, at construction; the status is
/// collected again for every report.
#[derive(Clone)]
pub struct ReportGenerator {
    host: Arc<dyn Host>,
    profile: HardwareProfile,
    thresholds: Thresholds,
}

impl ReportGenerator {
    /// Detect the hardware of `host` and build a generator for it.
    pub async fn detect(host: Arc<dyn Host>, thresholds: Thresholds) -> Self {
        let profile = HardwareProfile::detect(host.as_ref()).await;
        Self::with_profile(host, profile, thresholds)
    }

    /// Build a generator from an already known profile.
    pub fn with_profile(host: Arc<dyn Host>, profile: HardwareProfile, thresholds: Thresholds) -> Self {
        Self {
            host,
            profile,
            thresholds,
        }
    }

    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Collect a fresh status snapshot.
    pub async fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::collect(self.host.as_ref(), &self.profile).await
    }

    /// Render an already collected snapshot.
    pub fn render(&self, snapshot: &StatusSnapshot, generated_at: DateTime<Local>) -> Report {
        Report {
            format: ReportFormat::Html,
            body: render_html(&self.profile, snapshot, &self.thresholds, generated_at),
            generated_at,
        }
    }

    /// Collect a snapshot and render it now.
    pub async fn generate(&self) -> Report {
        let snapshot = self.snapshot().await;
        self.render(&snapshot, Local::now())
    }

    /// Generate a report and write it into `dir`.
    pub async fn write_report(&self, dir: &Path) -> Result<PathBuf> {
        self.generate().await.write_to_dir(dir).await
    }
}

/// Most recently modified HTML report in `dir`, if any.
pub async fn latest_report(dir: &Path) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(REPORT_FILE_PREFIX) || !name.ends_with(".html") {
            continue;
        }
        let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
            continue;
        };
        if newest.as_ref().map_or(true, |(time, _)| modified >= *time) {
            newest = Some((modified, entry.path()));
        }
    }

    debug!(?newest, "latest report lookup");
    newest.map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ScriptedHost;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, hour, 15, 9).unwrap()
    }

    #[test]
    fn test_file_name() {
        let report = Report {
            format: ReportFormat::Html,
            body: String::new(),
            generated_at: at(9),
        };
        assert_eq!(report.file_name(), "rpi_diagnostics_20250314_091509.html");
    }

    #[tokio::test]
    async fn test_write_and_find_latest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_report(dir.path()).await.is_none());

        let generator = ReportGenerator::with_profile(
            Arc::new(ScriptedHost::new()),
            HardwareProfile::default(),
            Thresholds::default(),
        );
        let snapshot = generator.snapshot().await;
        let first = generator.render(&snapshot, at(9)).write_to_dir(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let latest = latest_report(dir.path()).await.unwrap();
        assert_eq!(latest, first);
        let body = std::fs::read_to_string(&latest).unwrap();
        assert!(body.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_generate_blocking() {
        let generator = ReportGenerator::with_profile(
            Arc::new(ScriptedHost::new()),
            HardwareProfile::default(),
            Thresholds::default(),
        );
        let report = tokio_test::block_on(generator.generate());
        assert_eq!(report.format, ReportFormat::Html);
        assert!(report.body.trim_end().ends_with("</html>"));
    }
}
