//! Remote query model client
//!
//! Talks to an external model server that hosts the trained joint
//! intent + entity model. The server is expected to accept
//! `{"text": ..., "context": ...}` and answer with the raw parse:
//!
//! ```json
//! {
//!   "ents": [{"start_token_index": 3, "end_token_index": 4, "start_char": 11,
//!             "end_char": 17, "label": "RELATION", "text": "father"}],
//!   "cats": {"get_parent": 0.91, "unknown": 0.02}
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use kinq_core::{
    Intent, IntentScores, KinqError, ModelConfig, ModelOutput, QueryModel, RawSpan, Result,
};

/// HTTP client for a remote model server
pub struct RemoteModel {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    ents: Vec<RawSpan>,
    #[serde(default)]
    cats: BTreeMap<String, f32>,
}

impl RemoteModel {
    /// Create a client for the given inference endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KinqError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.remote_url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn into_output(response: ParseResponse) -> Result<ModelOutput> {
        for span in &response.ents {
            span.validate()
                .map_err(|e| KinqError::Inference(format!("Invalid span from model: {e}")))?;
        }

        let mut scores = IntentScores::new();
        for (label, score) in response.cats {
            match label.parse::<Intent>() {
                Ok(intent) => scores.insert(intent, score),
                Err(_) => tracing::warn!("Ignoring unrecognized intent label '{}'", label),
            }
        }

        Ok(ModelOutput {
            spans: response.ents,
            scores,
        })
    }
}

#[async_trait]
impl QueryModel for RemoteModel {
    fn name(&self) -> &str {
        "remote"
    }

    async fn infer(
        &self,
        query: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<ModelOutput> {
        let request = ParseRequest {
            text: query,
            context,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| KinqError::Inference(format!("Model request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KinqError::Inference(format!(
                "Model server error ({status}): {error_text}"
            )));
        }

        let parsed: ParseResponse = response
            .json()
            .await
            .map_err(|e| KinqError::Inference(format!("Failed to parse model response: {e}")))?;

        Self::into_output(parsed)
    }
}
