//! # concierge-api — Case Lifecycle Request Guard
//!
//! Axum service that owns case records and puts the lifecycle validator
//! in front of every status write.
//!
//! ## API Surface
//!
//! | Path                                   | Purpose                          |
//! |----------------------------------------|----------------------------------|
//! | `/v1/cases`, `/v1/cases/{id}`          | Create, list, read               |
//! | `/v1/cases/{id}/status`                | Validated case status change     |
//! | `/v1/cases/{id}/stage/status`          | Validated stage status change    |
//! | `/v1/cases/{id}/actions/{action}`      | Workflow actions                 |
//! | `/v1/cases/{id}/permissions`           | Permission predicates            |
//! | `/health/*`                            | Liveness and readiness probes    |
//! | `/metrics`                             | Prometheus scrape (when enabled) |
//! | `/openapi.json`                        | Generated OpenAPI document       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::cases::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(256 * 1024));

    if metrics_on {
        api = api.layer(from_fn(middleware::metrics::metrics_middleware));
    }

    let api = api.layer(TraceLayer::new_for_http()).with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        probes = probes.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    Router::new().merge(probes.with_state(state)).merge(api)
}

/// GET /metrics — Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(expected) = &state.config.metrics_token {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return AppError::Unauthorized("metrics token required".to_string()).into_response();
        }
    }

    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// How long readiness waits for the case store lock.
const STORE_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Readiness probe — 503 while the case store lock cannot be taken.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if !state.cases.is_available(STORE_PROBE_TIMEOUT) {
        tracing::warn!("case store lock unavailable");
        return (StatusCode::SERVICE_UNAVAILABLE, "case store locked");
    }
    (StatusCode::OK, "ready")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_probes_respond() {
        let (status, body) = get(app(AppState::new()), "/health/liveness").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        let (status, body) = get(app(AppState::new()), "/health/readiness").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ready");
    }

    #[tokio::test]
    async fn readiness_fails_while_store_is_locked() {
        let state = AppState::new();
        let guard = state.cases.records.write();
        let (status, body) = get(app(state.clone()), "/health/readiness").await;
        drop(guard);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "case store locked");

        let (status, _) = get(app(state), "/health/readiness").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_is_served() {
        let (status, body) = get(app(AppState::new()), "/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/v1/cases"));
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_unavailable() {
        let (status, _) = get(app(AppState::new()), "/metrics").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_route_absent_when_disabled() {
        let config = AppConfig {
            metrics_enabled: false,
            ..AppConfig::default()
        };
        let (status, _) = get(app(AppState::with_config(config, None)), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_token_is_enforced() {
        let config = AppConfig {
            metrics_token: Some("scrape".to_string()),
            ..AppConfig::default()
        };
        let (status, _) = get(app(AppState::with_config(config, None)), "/metrics").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
