//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned when the request carries no usable `message`
pub const MISSING_MESSAGE: &str = "send a 'message' field";

/// Client error body (400)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientError {
    pub error: String,
}

/// Processing failure body (500)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServerError {
    /// Always `"ERROR"`
    pub status: String,
    /// Underlying failure message, unmodified
    pub error: String,
}

impl ServerError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "ERROR".to_string(),
            error: error.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Body absent, not JSON, or `message` missing / not a string
    MissingMessage,
    /// The model (or anything behind it) failed
    Inference(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingMessage => (
                StatusCode::BAD_REQUEST,
                Json(ClientError {
                    error: MISSING_MESSAGE.to_string(),
                }),
            )
                .into_response(),
            AppError::Inference(msg) | AppError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ServerError::new(msg))).into_response()
            }
        }
    }
}

impl From<kinq_core::KinqError> for AppError {
    fn from(err: kinq_core::KinqError) -> Self {
        use kinq_core::KinqError;

        match err {
            KinqError::Inference(msg) => AppError::Inference(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
