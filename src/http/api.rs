//! Axum handlers for the classification routes.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`]. Service
//! failures become a 500 with `{ "error": code, "detail": message }`.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::AppState;
use crate::service::{Classification, HealthReport, ServiceError};

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ClassifyRequest {
    text: String,
}

// ── Errors ────────────────────────────────────────────────────────────────────

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.code(), "detail": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /classify
pub(super) async fn classify(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<Classification>, ServiceError> {
    debug!(text_len = req.text.len(), "classify request");

    state
        .ctx
        .classify(&req.text)
        .await
        .inspect_err(|e| warn!(code = e.code(), "classify failed: {e}"))
        .map(Json)
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.ctx.health())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::engine::ClassifierEngine;
    use crate::engine::providers::scripted::{Scripted, ScriptedEngine};
    use crate::engine::providers::uniform::UniformEngine;
    use crate::http::router;
    use crate::labels::LabelSet;
    use crate::service::ClassifierContext;

    fn app(labels: &[&str], engine: ClassifierEngine) -> axum::Router {
        let ctx = ClassifierContext::new(LabelSet::new(labels.iter().copied()), engine);
        router(Arc::new(ctx))
    }

    fn classify_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/classify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn classify_returns_best_label() {
        let engine = ScriptedEngine::scores(&["a", "b", "c"], &[0.2, 0.9, 0.9]);
        let app = app(&["a", "b", "c"], ClassifierEngine::Scripted(engine));

        let (status, body) = send(&app, classify_request(r#"{"text":"hello"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["predicted_label"], "b");
        assert!((body["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn classify_without_labels_is_500() {
        let app = app(&[], ClassifierEngine::Uniform(UniformEngine));

        let (status, body) = send(&app, classify_request(r#"{"text":"hello"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "service_not_ready");
        assert_eq!(body["detail"], "Candidate labels not loaded. Check configuration.");
    }

    #[tokio::test]
    async fn engine_failure_is_500_and_service_recovers() {
        let engine = ScriptedEngine::new([
            Scripted::Fail("tokenizer exploded".into()),
            Scripted::Scores { labels: vec!["x".into(), "y".into()], scores: vec![0.4, 0.6] },
        ]);
        let app = app(&["x", "y"], ClassifierEngine::Scripted(engine));

        let (status, body) = send(&app, classify_request(r#"{"text":"one"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "classification_error");
        assert!(body["detail"].as_str().unwrap().contains("tokenizer exploded"));

        let (status, body) = send(&app, classify_request(r#"{"text":"two"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_label"], "y");
    }

    #[tokio::test]
    async fn malformed_engine_output_is_500() {
        let engine = ScriptedEngine::scores(&["x", "y"], &[0.4]);
        let app = app(&["x", "y"], ClassifierEngine::Scripted(engine));

        let (status, body) = send(&app, classify_request(r#"{"text":"t"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Classification error:"));
    }

    #[tokio::test]
    async fn text_larger_than_axum_default_limit_is_classified() {
        let app = app(&["a", "b"], ClassifierEngine::Uniform(UniformEngine));
        let text = "x".repeat(3 * 1024 * 1024);
        let body = serde_json::json!({ "text": text }).to_string();

        let (status, body) = send(&app, classify_request(&body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_label"], "a");
        assert_eq!(body["text"].as_str().map(str::len), Some(3 * 1024 * 1024));
    }

    #[tokio::test]
    async fn missing_text_field_is_client_error() {
        let app = app(&["a"], ClassifierEngine::Uniform(UniformEngine));

        let (status, _) = send(&app, classify_request(r#"{"message":"hello"}"#)).await;
        assert!(status.is_client_error(), "got {status}");
    }

    #[tokio::test]
    async fn health_reports_labels() {
        let app = app(&["a", "b"], ClassifierEngine::Uniform(UniformEngine));
        let req = || Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&app, req()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["config_loaded"], true);
        assert_eq!(body["num_labels"], 2);

        let (_, again) = send(&app, req()).await;
        assert_eq!(again, body);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = app(&["a"], ClassifierEngine::Uniform(UniformEngine));
        let req = Request::builder().uri("/predict").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
