use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use permit_wizard::workflows::registration::{wizard_router, BusinessRegistry, WizardSessions};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes<R>(sessions: Arc<WizardSessions<R>>) -> axum::Router
where
    R: BusinessRegistry + 'static,
{
    wizard_router(sessions)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use permit_wizard::config::WizardConfig;
    use permit_wizard::workflows::registration::InMemoryBusinessRegistry;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let sessions = Arc::new(WizardSessions::new(
            Arc::new(InMemoryBusinessRegistry::default()),
            WizardConfig::default(),
        ));
        with_service_routes(sessions).layer(Extension(state))
    }

    async fn get(app: axum::Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("valid request"))
            .await
            .expect("router response")
            .status()
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        assert_eq!(get(app(false), "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(get(app(true), "/ready").await, StatusCode::OK);
        assert_eq!(get(app(true), "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn wizard_sessions_are_served_alongside_probes() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/wizard/sessions")
                    .body(Body::empty())
                    .expect("valid request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
