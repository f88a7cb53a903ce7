//! HTTP API tests
//!
//! Requests go through the full router (CORS layer included) with
//! `tower::ServiceExt::oneshot`. Nothing here launches a browser.

use std::sync::Arc;

use a11yscan::config::AppConfig;
use a11yscan::enrich::{InlineImage, NarrativeEnricher, TextModel};
use a11yscan::handlers::{router, AppState};
use a11yscan::pipeline::Analyzer;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, Arc<AppState>) {
    let config = AppConfig {
        enrichment_enabled: false,
        ..AppConfig::default()
    };
    let state = Arc::new(AppState::new(Analyzer::new(config).unwrap()));
    (router(state.clone()), state)
}

/// Answers every prompt with the same text
struct FixedModel(&'static str);

#[async_trait::async_trait]
impl TextModel for FixedModel {
    async fn generate(&self, _prompt: &str, _image: Option<&InlineImage>) -> a11yscan::Result<String> {
        Ok(self.0.to_string())
    }
}

fn app_with_model(reply: &'static str) -> Router {
    let config = AppConfig {
        enrichment_enabled: false,
        ..AppConfig::default()
    };
    let analyzer = Analyzer::new(config)
        .unwrap()
        .with_enricher(NarrativeEnricher::new(Arc::new(FixedModel(reply))));
    router(Arc::new(AppState::new(analyzer)))
}

fn fix_request() -> Value {
    json!({
        "issue": {
            "title": "Images missing alt text",
            "description": "The logo has no alt attribute",
            "wcagCriteria": "1.1.1 Non-text Content (Level A)"
        },
        "currentCode": "<img src=\"/logo.png\">"
    })
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = app.oneshot(empty_request(Method::GET, "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_status_reports_configuration() {
    let (app, _) = app();
    let response = app.oneshot(empty_request(Method::GET, "/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "a11yscan");
    assert_eq!(body["enrichment_enabled"], false);
    assert_eq!(body["analyses_completed"], 0);
    assert_eq!(body["monitors"], 0);
}

#[tokio::test]
async fn test_analyze_without_url() {
    let (app, state) = app();
    let response = app
        .oneshot(json_request(Method::POST, "/api/analyze", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "MISSING_URL");
    assert!(!body["message"].as_str().unwrap_or_default().is_empty());
    assert_eq!(state.analyses_in_flight(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_unsupported_scheme() {
    let (app, _) = app();
    let response = app
        .oneshot(json_request(Method::POST, "/api/analyze", json!({ "url": "ftp://files.example/" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "INVALID_URL");
}

#[tokio::test]
async fn test_monitor_lifecycle() {
    let (app, _) = app();

    let created = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/monitors", json!({ "url": "shop.example" })))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let monitor = body_json(created).await;
    let id = monitor["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("monitor_"));
    assert_eq!(monitor["url"], "https://shop.example/");
    assert_eq!(monitor["schedule"], "daily");
    assert_eq!(monitor["status"], "active");

    let listed = app
        .clone()
        .oneshot(empty_request(Method::GET, "/api/monitors"))
        .await
        .unwrap();
    assert_eq!(body_json(listed).await.as_array().map(Vec::len), Some(1));

    let fetched = app
        .clone()
        .oneshot(empty_request(Method::GET, &format!("/api/monitors/{}", id)))
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(body_json(fetched).await["history"], json!([]));

    let deleted = app
        .clone()
        .oneshot(empty_request(Method::DELETE, &format!("/api/monitors/{}", id)))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .oneshot(empty_request(Method::GET, &format!("/api/monitors/{}", id)))
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(gone).await["error"], "MONITOR_NOT_FOUND");
}

#[tokio::test]
async fn test_check_unknown_monitor() {
    let (app, _) = app();
    let response = app
        .oneshot(empty_request(Method::POST, "/api/monitors/monitor_missing/check"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_from_localhost() {
    let (app, _) = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/analyze")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn test_generate_code_returns_solutions() {
    let app = app_with_model(
        r#"{"primarySolution":{"code":"<img src=\"/logo.png\" alt=\"Acme\">","explanation":"Added alt"},"bestPractices":["Keep alt short"]}"#,
    );
    let response = app
        .oneshot(json_request(Method::POST, "/api/generate-code", fix_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["issue"], "Images missing alt text");
    assert_eq!(body["framework"], "html");
    assert_eq!(body["solutions"]["primarySolution"]["explanation"], "Added alt");
    assert_eq!(body["solutions"]["bestPractices"], json!(["Keep alt short"]));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_generate_code_requires_current_code() {
    let app = app_with_model("{}");
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/generate-code",
            json!({ "issue": { "title": "Empty links" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "MISSING_FIELD");
}

#[tokio::test]
async fn test_generate_code_without_model() {
    let (app, _) = app();
    let response = app
        .oneshot(json_request(Method::POST, "/api/generate-code", fix_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_generate_code_unusable_reply() {
    let app = app_with_model("I cannot help with that.");
    let response = app
        .oneshot(json_request(Method::POST, "/api/generate-code", fix_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "ENRICHMENT_FAILED");
}
