//! Web application router and middleware setup.

use crate::web::handlers;
use crate::web::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Create the axum application with all routes and middleware.
///
/// No request logging layer is installed.
pub fn create_app(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route("/index.html", get(handlers::index))
        .route("/refresh", get(handlers::refresh));

    if state.config.enable_api {
        app = app.route("/api/status", get(handlers::api_status));
    }

    let enable_cors = state.config.enable_cors;
    let mut app = app.fallback(handlers::not_found).with_state(state);

    if enable_cors {
        app = app.layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        );
    }

    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{HardwareProfile, ScriptedHost};
    use crate::report::{Boundary, ReportGenerator, Thresholds};
    use crate::web::config::{RefreshMode, ServeMode, WebConfig};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn state(config: WebConfig) -> Arc<AppState> {
        let host = ScriptedHost::new()
            .with_command("vcgencmd measure_temp", "temp=72.5'C")
            .with_command("vcgencmd get_throttled", "throttled=0x0");
        let profile = HardwareProfile {
            model: "Raspberry Pi 5 Model B Rev 1.0".to_string(),
            ..HardwareProfile::default()
        };
        let generator = ReportGenerator::with_profile(Arc::new(host), profile, Thresholds::default());
        Arc::new(AppState { generator, config })
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_disables_caching() {
        let response = get(create_app(state(WebConfig::default())), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Raspberry Pi 5 Model B Rev 1.0"));
        assert!(body.trim_end().ends_with("</html>"));
    }

    #[tokio::test]
    async fn test_refresh_redirects() {
        let response = get(create_app(state(WebConfig::default())), "/refresh").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_refresh_regenerates_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = WebConfig::default()
            .with_serve_mode(ServeMode::Archive)
            .with_refresh_mode(RefreshMode::Regenerate)
            .with_report_dir(dir.path());
        let app = create_app(state(config));

        let response = get(app.clone(), "/refresh").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(crate::report::latest_report(dir.path()).await.is_some());

        let response = get(app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_archive_writes_first_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = WebConfig::default()
            .with_serve_mode(ServeMode::Archive)
            .with_report_dir(dir.path().join("reports"));
        let response = get(create_app(state(config)), "/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(crate::report::latest_report(&dir.path().join("reports"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_api_status() {
        let response = get(create_app(state(WebConfig::default())), "/api/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["hardware"]["model"], "Raspberry Pi 5 Model B Rev 1.0");
        assert_eq!(json["system"]["temperature"], "72.5'C");
        assert_eq!(json["power"]["throttled"], "throttled=0x0");
        assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_api_can_be_disabled() {
        let config = WebConfig::default().with_api(false);
        let response = get(create_app(state(config)), "/api/status").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = get(create_app(state(WebConfig::default())), "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// The generator's boundary decides how the page classifies a reading
    #[tokio::test]
    async fn test_index_uses_generator_boundary() {
        let cooled = |boundary: Boundary| {
            let host = ScriptedHost::new().with_command("vcgencmd measure_temp", "temp=70.5'C");
            let profile = HardwareProfile {
                has_cooling: true,
                ..HardwareProfile::default()
            };
            let thresholds = Thresholds::default().with_boundary(boundary);
            let generator = ReportGenerator::with_profile(Arc::new(host), profile, thresholds);
            assert_eq!(generator.thresholds().boundary, boundary);
            create_app(Arc::new(AppState {
                generator,
                config: WebConfig::default(),
            }))
        };

        let body = to_bytes(get(cooled(Boundary::WholeDegrees), "/").await.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"<div class="hw-card success">
                    <h3>🌪️ Cooling</h3>"#));

        let body = to_bytes(get(cooled(Boundary::Exact), "/").await.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"<div class="hw-card warning">
                    <h3>🌪️ Cooling</h3>"#));
    }
}
