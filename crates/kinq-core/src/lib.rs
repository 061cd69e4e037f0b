//! kinq Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout kinq:
//! - Intent and entity label vocabularies
//! - Raw and normalized entity spans produced by a query model
//! - Intent score mappings and the final query result record
//! - The `QueryModel` trait implemented by inference backends
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, InterpreterConfig, LoggingConfig, ModelBackend, ModelConfig,
    ServerConfig,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for kinq operations
#[derive(Error, Debug)]
pub enum KinqError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, KinqError>;

// ============================================================================
// Intents
// ============================================================================

/// Closed set of query purposes understood by the family map assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GetParent,
    GetChildren,
    GetSibling,
    GetDetails,
    GetDob,
    CountBrothers,
    CountSisters,
    GetBio,
    GetRelation,
    GetGroupMembers,
    GetCollaborators,
    GetCollaboratorRole,
    GetCollaboratorStatus,
    GetCollaborationInfo,
    Unknown,
}

impl Intent {
    /// Every intent label, in training label order
    pub const ALL: [Intent; 15] = [
        Self::GetParent,
        Self::GetChildren,
        Self::GetSibling,
        Self::GetDetails,
        Self::GetDob,
        Self::CountBrothers,
        Self::CountSisters,
        Self::GetBio,
        Self::GetRelation,
        Self::GetGroupMembers,
        Self::GetCollaborators,
        Self::GetCollaboratorRole,
        Self::GetCollaboratorStatus,
        Self::GetCollaborationInfo,
        Self::Unknown,
    ];

    /// Get the wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetParent => "get_parent",
            Self::GetChildren => "get_children",
            Self::GetSibling => "get_sibling",
            Self::GetDetails => "get_details",
            Self::GetDob => "get_dob",
            Self::CountBrothers => "count_brothers",
            Self::CountSisters => "count_sisters",
            Self::GetBio => "get_bio",
            Self::GetRelation => "get_relation",
            Self::GetGroupMembers => "get_group_members",
            Self::GetCollaborators => "get_collaborators",
            Self::GetCollaboratorRole => "get_collaborator_role",
            Self::GetCollaboratorStatus => "get_collaborator_status",
            Self::GetCollaborationInfo => "get_collaboration_info",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = KinqError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| KinqError::Validation(format!("unknown intent label: {s}")))
    }
}

// ============================================================================
// Entity Spans
// ============================================================================

/// Entity labels emitted by the query model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    /// A person's name
    FamilyMember,
    /// A kinship or role term such as "father" or "role"
    Relation,
}

impl EntityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FamilyMember => "FAMILY_MEMBER",
            Self::Relation => "RELATION",
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity span as produced by the model for one query.
///
/// Token indices and character offsets are half-open ranges over the
/// tokenized query and the raw query text respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpan {
    pub start_token_index: usize,
    pub end_token_index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub label: EntityLabel,
    pub text: String,
}

impl RawSpan {
    /// Create a span, rejecting empty or inverted token ranges
    pub fn new(
        start_token_index: usize,
        end_token_index: usize,
        start_char: usize,
        end_char: usize,
        label: EntityLabel,
        text: impl Into<String>,
    ) -> Result<Self> {
        let span = Self {
            start_token_index,
            end_token_index,
            start_char,
            end_char,
            label,
            text: text.into(),
        };
        span.validate()?;
        Ok(span)
    }

    /// Check the token range invariant
    pub fn validate(&self) -> Result<()> {
        if self.start_token_index >= self.end_token_index {
            return Err(KinqError::Validation(format!(
                "span '{}' has empty token range {}..{}",
                self.text, self.start_token_index, self.end_token_index
            )));
        }
        Ok(())
    }
}

/// Span after merge correction; the label may have been promoted to
/// `FamilyMember`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSpan {
    pub start_token_index: usize,
    pub end_token_index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub label: EntityLabel,
    pub text: String,
}

impl From<RawSpan> for NormalizedSpan {
    fn from(span: RawSpan) -> Self {
        Self {
            start_token_index: span.start_token_index,
            end_token_index: span.end_token_index,
            start_char: span.start_char,
            end_char: span.end_char,
            label: span.label,
            text: span.text,
        }
    }
}

// ============================================================================
// Intent Scores
// ============================================================================

/// Confidence per intent label for one query. Scores need not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentScores(BTreeMap<Intent, f32>);

impl IntentScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the score for an intent, replacing any previous value
    pub fn insert(&mut self, intent: Intent, score: f32) {
        self.0.insert(intent, score);
    }

    pub fn with(mut self, intent: Intent, score: f32) -> Self {
        self.insert(intent, score);
        self
    }

    pub fn get(&self, intent: Intent) -> Option<f32> {
        self.0.get(&intent).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Intent, f32)> + '_ {
        self.0.iter().map(|(intent, score)| (*intent, *score))
    }
}

impl FromIterator<(Intent, f32)> for IntentScores {
    fn from_iter<T: IntoIterator<Item = (Intent, f32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Model Boundary
// ============================================================================

/// Raw output of a query model for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Entity spans in document order
    pub spans: Vec<RawSpan>,
    /// Score for each intent label
    pub scores: IntentScores,
}

/// Trait for joint intent classification + entity recognition models.
///
/// Implementations are loaded once at startup and shared across requests,
/// so they must be callable concurrently.
#[async_trait]
pub trait QueryModel: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Run the model on a query. `context` is reserved for conversation
    /// state and may be ignored.
    async fn infer(&self, query: &str, context: Option<&serde_json::Value>)
        -> Result<ModelOutput>;
}

// ============================================================================
// Query Result
// ============================================================================

/// Structured interpretation of a single query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub intent: Intent,
    pub entity: Option<String>,
    pub relation: Option<String>,
    pub ambiguous: bool,
}

impl QueryResult {
    /// Result for a query nothing could be extracted from
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            entity: None,
            relation: None,
            ambiguous: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(ModelOutput);

    #[async_trait]
    impl QueryModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn infer(
            &self,
            _query: &str,
            _context: Option<&serde_json::Value>,
        ) -> Result<ModelOutput> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_intent_labels_roundtrip() {
        for intent in Intent::ALL {
            assert_eq!(intent.as_str().parse::<Intent>().unwrap(), intent);
        }
        assert!("get_weather".parse::<Intent>().is_err());
    }

    #[test]
    fn test_intent_serializes_as_label() {
        let json = serde_json::to_string(&Intent::GetCollaboratorRole).unwrap();
        assert_eq!(json, "\"get_collaborator_role\"");
    }

    #[test]
    fn test_entity_label_wire_format() {
        let json = serde_json::to_string(&EntityLabel::FamilyMember).unwrap();
        assert_eq!(json, "\"FAMILY_MEMBER\"");
        let label: EntityLabel = serde_json::from_str("\"RELATION\"").unwrap();
        assert_eq!(label, EntityLabel::Relation);
    }

    #[test]
    fn test_raw_span_rejects_empty_range() {
        assert!(RawSpan::new(3, 3, 10, 10, EntityLabel::Relation, "").is_err());
        assert!(RawSpan::new(4, 3, 10, 16, EntityLabel::Relation, "father").is_err());
        assert!(RawSpan::new(3, 4, 11, 17, EntityLabel::Relation, "father").is_ok());
    }

    #[test]
    fn test_query_result_serializes_nulls() {
        let json = serde_json::to_value(QueryResult::unknown()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "intent": "unknown",
                "entity": null,
                "relation": null,
                "ambiguous": false
            })
        );
    }

    #[test]
    fn test_intent_scores_serialize_as_map() {
        let scores = IntentScores::new()
            .with(Intent::GetParent, 0.9)
            .with(Intent::Unknown, 0.05);
        let json = serde_json::to_value(&scores).unwrap();
        assert!(json["get_parent"].is_number());
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get(Intent::GetBio), None);
    }

    #[test]
    fn test_query_model_trait_object() {
        let output = ModelOutput {
            spans: vec![],
            scores: IntentScores::new().with(Intent::Unknown, 1.0),
        };
        let model: Box<dyn QueryModel> = Box::new(FixedModel(output.clone()));

        let result = tokio_test::block_on(model.infer("hello", None)).unwrap();
        assert_eq!(result, output);
        assert_eq!(model.name(), "fixed");
    }
}
