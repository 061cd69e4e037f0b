//! Query prediction handler
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use kinq_core::QueryResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

/// Predict request
#[derive(Debug, Deserialize, ToSchema)]
pub struct PredictRequest {
    /// Natural-language query about the family tree
    pub message: Option<String>,
    /// Conversation context, forwarded to the model
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub context: Option<serde_json::Value>,
}

/// Predict response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PredictResponse {
    /// Always `"OK"`
    pub status: String,
    /// `{ intent, entity, relation, ambiguous }`
    #[schema(value_type = Object)]
    pub response: QueryResult,
}

/// Interpret a family-tree query
///
/// A body that is not JSON, or whose `message` is absent or not a string,
/// is rejected with 400. An empty message is still interpreted. Inference
/// that outlives `server.request_timeout_secs` fails with 500.
#[utoipa::path(
    post,
    path = "/predict",
    tag = "predict",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Query interpreted", body = PredictResponse),
        (status = 400, description = "No usable message", body = crate::error::ClientError),
        (status = 500, description = "Model failure", body = crate::error::ServerError)
    )
)]
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<PredictRequest>>,
) -> Result<Json<PredictResponse>, AppError> {
    state.increment_requests();

    let Some(Json(PredictRequest {
        message: Some(message),
        context,
    })) = payload
    else {
        state.increment_errors();
        tracing::debug!("Rejected predict request without a message");
        return Err(AppError::MissingMessage);
    };

    tracing::debug!("Predict: {}", message);

    let timeout_secs = state.config.server.request_timeout_secs;
    let inference = state.interpreter.interpret(&message, context.as_ref());

    match tokio::time::timeout(Duration::from_secs(timeout_secs), inference).await {
        Ok(Ok(result)) => Ok(Json(PredictResponse {
            status: "OK".to_string(),
            response: result,
        })),
        Ok(Err(e)) => {
            state.increment_errors();
            Err(e.into())
        }
        Err(_) => {
            state.increment_errors();
            Err(AppError::Inference(format!(
                "Inference timed out after {timeout_secs}s"
            )))
        }
    }
}
