//! HTTP handlers for the report pages and the status API.

use crate::probe::status::{NetworkStatus, PowerStatus, SystemStatus};
use crate::probe::HardwareProfile;
use crate::report::latest_report;
use crate::web::config::{RefreshMode, ServeMode};
use crate::web::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Response headers that keep browsers from caching a report.
const NO_CACHE_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStatus {
    pub hardware: HardwareProfile,
    pub system: SystemStatus,
    pub network: NetworkStatus,
    pub power: PowerStatus,
    /// RFC 3339 collection time
    pub timestamp: String,
}

/// Serve the diagnostics report.
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let body = match state.config.serve_mode {
        ServeMode::Live => state.generator.generate().await.body,
        ServeMode::Archive => match archived_report(&state).await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to load archived report: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load report").into_response();
            }
        },
    };

    (NO_CACHE_HEADERS, Html(body)).into_response()
}

async fn archived_report(state: &AppState) -> crate::Result<String> {
    let dir = &state.config.report_dir;
    let path = match latest_report(dir).await {
        Some(path) => path,
        None => {
            debug!("No report in {}, generating one", dir.display());
            state.generator.write_report(dir).await?
        }
    };
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Redirect back to `/`, regenerating the archived report first if configured.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    if state.config.refresh_mode == RefreshMode::Regenerate {
        if let Err(e) = state.generator.write_report(&state.config.report_dir).await {
            error!("Failed to regenerate report: {}", e);
        }
    }
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// Current status as JSON.
pub async fn api_status(State(state): State<Arc<AppState>>) -> Json<ApiStatus> {
    let snapshot = state.generator.snapshot().await;
    Json(ApiStatus {
        hardware: state.generator.profile().clone(),
        system: snapshot.system,
        network: snapshot.network,
        power: snapshot.power,
        timestamp: chrono::Local::now().to_rfc3339(),
    })
}

/// Fallback for every unknown path.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
