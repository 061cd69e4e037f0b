//! API Integration Tests
//!
//! Drives the router in-process with the built-in lexicon model, or with a
//! stub model where a specific model output is needed.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use kinq_api::{create_router, create_router_for_testing, state::AppState};
use kinq_core::{
    config::AppConfig, Intent, IntentScores, KinqError, ModelOutput, QueryModel, Result,
};
use kinq_extractor::QueryInterpreter;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Model that always fails with a fixed message
struct BrokenModel;

#[async_trait]
impl QueryModel for BrokenModel {
    fn name(&self) -> &str {
        "broken"
    }

    async fn infer(&self, _query: &str, _context: Option<&Value>) -> Result<ModelOutput> {
        Err(KinqError::Inference("model weights not loaded".to_string()))
    }
}

/// Model with a fixed, close-scored parse
struct CloseCallModel;

#[async_trait]
impl QueryModel for CloseCallModel {
    fn name(&self) -> &str {
        "close-call"
    }

    async fn infer(&self, _query: &str, _context: Option<&Value>) -> Result<ModelOutput> {
        Ok(ModelOutput {
            spans: Vec::new(),
            scores: IntentScores::new()
                .with(Intent::GetParent, 0.5)
                .with(Intent::GetSibling, 0.4),
        })
    }
}

/// Model that takes longer than any test timeout
struct SlowModel;

#[async_trait]
impl QueryModel for SlowModel {
    fn name(&self) -> &str {
        "slow"
    }

    async fn infer(&self, _query: &str, _context: Option<&Value>) -> Result<ModelOutput> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(ModelOutput::default())
    }
}

fn router_with_model(model: Arc<dyn QueryModel>) -> Router {
    let state = AppState::new(AppConfig::default(), QueryInterpreter::new(model));
    create_router(Arc::new(state))
}

// =============================================================================
// Liveness Tests
// =============================================================================

#[tokio::test]
async fn test_home() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json, json!({ "msg": "kinq inference server running" }));
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model"], "lexicon");
    assert!(json["version"].is_string());
    assert_eq!(json["total_requests"], 0);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/predict"].is_object());
}

// =============================================================================
// Predict Tests
// =============================================================================

#[tokio::test]
async fn test_predict_parent_query() {
    let app = create_router_for_testing();

    let request = create_json_request(
        "POST",
        "/predict",
        Some(json!({ "message": "Who is the father of Rohith?" })),
    );

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json,
        json!({
            "status": "OK",
            "response": {
                "intent": "get_parent",
                "entity": "Rohith",
                "relation": "father",
                "ambiguous": false
            }
        })
    );
}

#[tokio::test]
async fn test_predict_relation_doe_merge() {
    let app = create_router_for_testing();

    let request = create_json_request(
        "POST",
        "/predict",
        Some(json!({ "message": "Who is the father doe" })),
    );

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["response"]["intent"], "get_parent");
    assert_eq!(json["response"]["entity"], "father doe");
    assert!(json["response"]["relation"].is_null());
}

#[tokio::test]
async fn test_predict_empty_message_is_unknown() {
    let app = create_router_for_testing();

    let request = create_json_request("POST", "/predict", Some(json!({ "message": "" })));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json["response"],
        json!({
            "intent": "unknown",
            "entity": null,
            "relation": null,
            "ambiguous": false
        })
    );
}

#[tokio::test]
async fn test_predict_accepts_context() {
    let app = create_router_for_testing();

    let request = create_json_request(
        "POST",
        "/predict",
        Some(json!({
            "message": "When was Rohith born?",
            "context": { "previous_entity": "Rohith" }
        })),
    );

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["response"]["intent"], "get_dob");
    assert_eq!(json["response"]["entity"], "Rohith");
}

#[tokio::test]
async fn test_predict_flags_close_scores() {
    let app = router_with_model(Arc::new(CloseCallModel));

    let request = create_json_request("POST", "/predict", Some(json!({ "message": "?" })));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["response"]["intent"], "get_parent");
    assert_eq!(json["response"]["ambiguous"], true);
}

// =============================================================================
// Predict Error Tests
// =============================================================================

#[tokio::test]
async fn test_predict_missing_message() {
    let app = create_router_for_testing();

    let request = create_json_request("POST", "/predict", Some(json!({ "text": "hi" })));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json, json!({ "error": "send a 'message' field" }));
}

#[tokio::test]
async fn test_predict_non_string_message() {
    let app = create_router_for_testing();

    let request = create_json_request("POST", "/predict", Some(json!({ "message": 42 })));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_empty_body() {
    let app = create_router_for_testing();

    let request = create_json_request("POST", "/predict", None);

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "send a 'message' field");
}

#[tokio::test]
async fn test_predict_not_json() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("Content-Type", "text/plain")
                .body(Body::from("Who is the father of Rohith?"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_model_failure() {
    let app = router_with_model(Arc::new(BrokenModel));

    let request = create_json_request(
        "POST",
        "/predict",
        Some(json!({ "message": "Who is the father of Rohith?" })),
    );

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(
        json,
        json!({ "status": "ERROR", "error": "model weights not loaded" })
    );
}

#[tokio::test]
async fn test_predict_timeout_is_server_error() {
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 1;
    let state = Arc::new(AppState::new(
        config,
        QueryInterpreter::new(Arc::new(SlowModel)),
    ));
    let app = create_router(state.clone());

    let request = create_json_request(
        "POST",
        "/predict",
        Some(json!({ "message": "Who is the father of Rohith?" })),
    );

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["error"], "Inference timed out after 1s");
    assert_eq!(state.get_error_count(), 1);
}

#[tokio::test]
async fn test_predict_wrong_method() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/predict")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// State Tests
// =============================================================================

#[tokio::test]
async fn test_requests_are_counted() {
    let state = Arc::new(AppState::new(
        AppConfig::default(),
        QueryInterpreter::new(Arc::new(BrokenModel)),
    ));
    let app = create_router(state.clone());

    let failing = create_json_request("POST", "/predict", Some(json!({ "message": "hi" })));
    let bad = create_json_request("POST", "/predict", Some(json!({})));

    app.clone().oneshot(failing).await.unwrap();
    app.oneshot(bad).await.unwrap();

    assert_eq!(state.get_request_count(), 2);
    assert_eq!(state.get_error_count(), 2);
}
