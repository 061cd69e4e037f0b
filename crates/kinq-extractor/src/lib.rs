//! kinq Extractor - Query interpretation pipeline
//!
//! Runs a query model and turns its raw output into a `QueryResult`:
//!
//! ```text
//! query -> QueryModel -> normalize_spans -> ResultAssembler -> QueryResult
//! ```
//!
//! Also provides the built-in model backends, the labeled training samples
//! and an evaluation harness over them.

use std::sync::Arc;

use kinq_core::{AppConfig, ModelBackend, QueryModel, QueryResult, Result};

pub mod assembler;
pub mod evaluate;
pub mod lexicon;
pub mod normalizer;
pub mod remote;
pub mod samples;
pub mod tokens;

pub use assembler::{rank_intents, IntentRanking, ResultAssembler};
pub use evaluate::{evaluate, EntityMetrics, EvaluationReport, SampleMismatch};
pub use lexicon::LexiconModel;
pub use normalizer::normalize_spans;
pub use remote::RemoteModel;
pub use samples::{
    align_phrase, build_examples, default_samples, AlignmentReport, LabeledSample,
    TrainingEntity, TrainingExample, UnalignedPhrase,
};

/// Shared model handle plus the deterministic post-processing steps.
///
/// Cheap to clone; the model is loaded once and shared read-only.
#[derive(Clone)]
pub struct QueryInterpreter {
    model: Arc<dyn QueryModel>,
    assembler: ResultAssembler,
}

impl QueryInterpreter {
    /// Create an interpreter with the default ambiguity margin
    pub fn new(model: Arc<dyn QueryModel>) -> Self {
        Self {
            model,
            assembler: ResultAssembler::default(),
        }
    }

    /// Set the top-2 score gap below which results are flagged ambiguous
    pub fn with_ambiguity_margin(mut self, margin: f32) -> Self {
        self.assembler = ResultAssembler::new(margin);
        self
    }

    /// Build the configured model backend
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model: Arc<dyn QueryModel> = match config.model.backend {
            ModelBackend::Lexicon => Arc::new(LexiconModel::new()),
            ModelBackend::Remote => Arc::new(RemoteModel::from_config(&config.model)?),
        };

        Ok(Self::new(model).with_ambiguity_margin(config.interpreter.ambiguity_margin))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Interpret one query. Fails only when the model itself fails.
    pub async fn interpret(
        &self,
        query: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<QueryResult> {
        let output = self.model.infer(query, context).await?;

        tracing::debug!(
            "Model output: scores={:?} spans={:?}",
            output.scores,
            output
                .spans
                .iter()
                .map(|s| (s.text.as_str(), s.label.as_str()))
                .collect::<Vec<_>>()
        );

        let spans = normalize_spans(output.spans);
        let result = self.assembler.assemble(&output.scores, &spans);

        tracing::info!(
            intent = %result.intent,
            ambiguous = result.ambiguous,
            "Query interpreted"
        );

        Ok(result)
    }
}
