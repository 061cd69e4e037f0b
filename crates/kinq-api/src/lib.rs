//! kinq API - HTTP inference server
//!
//! Exposes the query interpreter over HTTP:
//!
//! - `POST /predict` interprets `{ "message": ... }`
//! - `GET /` static liveness message
//! - `GET /health` version, model backend and request counters
//! - `GET /api-docs/openapi.json` OpenAPI document
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use kinq_core::config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "kinq inference API", description = "Family-tree query understanding"),
    paths(
        handlers::predict::predict_handler,
        handlers::health::home,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::predict::PredictRequest,
        handlers::predict::PredictResponse,
        handlers::health::HomeResponse,
        handlers::health::HealthResponse,
        error::ClientError,
        error::ServerError,
    )),
    tags(
        (name = "predict", description = "Query interpretation"),
        (name = "health", description = "Liveness and status")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router around shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = state.config.server.clone();

    let router = Router::new()
        .route("/", get(handlers::health::home))
        .route("/health", get(handlers::health::health_check))
        .route("/predict", post(handlers::predict::predict_handler))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors_layer(&server) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for browser callers. An empty origin list allows any origin.
fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    if !server.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if server.cors_origins.is_empty() {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Router backed by the built-in lexicon model and default config
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    use kinq_core::config::AppConfig;
    use kinq_extractor::{LexiconModel, QueryInterpreter};

    let interpreter = QueryInterpreter::new(Arc::new(LexiconModel::new()));
    create_router(Arc::new(AppState::new(AppConfig::default(), interpreter)))
}
