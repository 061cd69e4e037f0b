//! Liveness and status handlers
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Static liveness message served at `/`
pub const RUNNING_MESSAGE: &str = "kinq inference server running";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HomeResponse {
    pub msg: String,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Server is running", body = HomeResponse)
    )
)]
pub async fn home() -> impl IntoResponse {
    Json(HomeResponse {
        msg: RUNNING_MESSAGE.to_string(),
    })
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Name of the loaded model backend
    pub model: String,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub failed_requests: u64,
}

/// Status of the server and its loaded model
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.interpreter.model_name().to_string(),
        uptime_seconds: state.uptime_secs(),
        total_requests: state.get_request_count(),
        failed_requests: state.get_error_count(),
    })
}
