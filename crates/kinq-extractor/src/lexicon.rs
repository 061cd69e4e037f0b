//! Rule-based query model
//!
//! A deterministic stand-in for the trained model, usable offline and in
//! tests:
//! - Intent scores: weighted regex cues per intent, summed and capped at 1.0
//! - RELATION spans: dictionary of kinship and role terms
//! - FAMILY_MEMBER spans: runs of adjacent words outside the known vocabulary

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;

use crate::tokens::{tokenize, Token};
use kinq_core::{EntityLabel, Intent, IntentScores, ModelOutput, QueryModel, RawSpan, Result};

/// Rule-based joint intent + entity model
pub struct LexiconModel {
    /// Intent cues (regex -> intent, weight)
    patterns: Vec<(Regex, Intent, f32)>,
    /// Kinship and role terms, lowercase
    relation_terms: HashSet<String>,
    /// Words that are never part of a name, lowercase
    vocabulary: HashSet<String>,
}

impl LexiconModel {
    /// Create a model with the default family map rules
    pub fn new() -> Self {
        let mut model = Self {
            patterns: Vec::new(),
            relation_terms: HashSet::new(),
            vocabulary: HashSet::new(),
        };

        model.init_intent_patterns();
        model.init_relation_terms();
        model.init_vocabulary();
        model
    }

    fn init_intent_patterns(&mut self) {
        // Kinship lookups
        self.add_pattern(
            r"\b(father|mother|dad|mom|parents?|grandfather|grandmother)\b",
            Intent::GetParent,
            0.9,
        );
        self.add_pattern(
            r"\b(sons?|daughters?|child|children|kids?)\b",
            Intent::GetChildren,
            0.9,
        );
        self.add_pattern(r"\b(brother|sister|siblings?)\b", Intent::GetSibling, 0.8);
        self.add_pattern(r"\bhow many brothers\b", Intent::CountBrothers, 0.9);
        self.add_pattern(r"\bhow many sisters\b", Intent::CountSisters, 0.9);
        self.add_pattern(
            r"\b(cousin|uncle|aunt|nephew|niece|related|relation)\b",
            Intent::GetRelation,
            0.8,
        );

        // Member profile
        self.add_pattern(
            r"\b(birthdate|birthday|dob|date of birth|born)\b",
            Intent::GetDob,
            0.9,
        );
        self.add_pattern(r"\b(bio|biography)\b", Intent::GetBio, 0.9);
        self.add_pattern(r"^\W*(who is|tell me about)\b", Intent::GetDetails, 0.5);
        self.add_pattern(r"\b(information|info|details)\b", Intent::GetDetails, 0.4);

        // Groups and collaboration
        self.add_pattern(r"\bfamily group\b", Intent::GetGroupMembers, 0.6);
        self.add_pattern(r"\bmembers\b", Intent::GetGroupMembers, 0.4);
        self.add_pattern(r"\bcollaborators\b", Intent::GetCollaborators, 0.9);
        self.add_pattern(r"\brole\b", Intent::GetCollaboratorRole, 0.9);
        self.add_pattern(r"\b(active|status)\b", Intent::GetCollaboratorStatus, 0.8);
        self.add_pattern(r"\bcollaboration\b", Intent::GetCollaborationInfo, 0.9);
    }

    fn init_relation_terms(&mut self) {
        for term in [
            "father", "mother", "dad", "mom", "parent", "parents", "grandfather",
            "grandmother", "son", "sons", "daughter", "daughters", "child", "children",
            "grandson", "granddaughter", "brother", "brothers", "sister", "sisters",
            "sibling", "siblings", "cousin", "uncle", "aunt", "nephew", "niece", "husband",
            "wife", "spouse", "role",
        ] {
            self.relation_terms.insert(term.to_string());
        }
    }

    fn init_vocabulary(&mut self) {
        for word in [
            // Function words
            "a", "an", "the", "of", "to", "in", "on", "at", "for", "from", "with", "and",
            "or", "is", "are", "was", "were", "be", "do", "does", "did", "have", "has",
            "i", "me", "my", "mine", "we", "our", "you", "your", "he", "his", "him", "she",
            "her", "they", "their", "them", "it", "its", "this", "that", "there", "still",
            // Question words
            "who", "whom", "whose", "what", "when", "where", "why", "how", "which", "many",
            "much", "tell", "about", "describe", "show", "list", "give", "meant", "asking",
            // Intent cues
            "birthdate", "birthday", "dob", "date", "birth", "born", "bio", "biography",
            "information", "info", "details", "family", "group", "members", "member",
            "collaborator", "collaborators", "collaboration", "contributor", "active",
            "status", "related", "relation", "connection", "side", "useful", "project",
            "sharing", "model", "map", "current", "albums", "album", "meaning", "life",
        ] {
            self.vocabulary.insert(word.to_string());
        }
    }

    /// Add a case-insensitive intent cue
    fn add_pattern(&mut self, pattern: &str, intent: Intent, weight: f32) {
        if let Ok(regex) = Regex::new(&format!("(?i){pattern}")) {
            self.patterns.push((regex, intent, weight));
        }
    }

    /// Score every known intent for a query
    pub fn score_intents(&self, text: &str) -> IntentScores {
        let mut scores: IntentScores = Intent::ALL.iter().map(|intent| (*intent, 0.0)).collect();

        for (regex, intent, weight) in &self.patterns {
            if regex.is_match(text) {
                let current = scores.get(*intent).unwrap_or(0.0);
                scores.insert(*intent, (current + weight).min(1.0));
            }
        }

        let matched = scores
            .iter()
            .any(|(intent, score)| intent != Intent::Unknown && score > 0.0);
        scores.insert(Intent::Unknown, if matched { 0.0 } else { 1.0 });

        scores
    }

    /// Extract RELATION and FAMILY_MEMBER spans in document order
    pub fn extract_spans(&self, text: &str) -> Vec<RawSpan> {
        let tokens = tokenize(text);
        let mut spans = Vec::new();
        // Start token index of the name run being built
        let mut name_start: Option<usize> = None;

        for (i, token) in tokens.iter().enumerate() {
            let lower = token.text.to_lowercase();
            let is_name = token.is_word() && !self.is_known_word(&lower);

            if !is_name {
                if let Some(start) = name_start.take() {
                    spans.push(self.name_span(text, &tokens, start, i));
                }
            } else if name_start.is_none() {
                name_start = Some(i);
            }

            if self.relation_terms.contains(&lower) {
                spans.push(RawSpan {
                    start_token_index: i,
                    end_token_index: i + 1,
                    start_char: token.start_char,
                    end_char: token.end_char,
                    label: EntityLabel::Relation,
                    text: token.text.clone(),
                });
            }
        }

        if let Some(start) = name_start {
            spans.push(self.name_span(text, &tokens, start, tokens.len()));
        }

        spans
    }

    /// Run both extractors
    pub fn parse(&self, text: &str) -> ModelOutput {
        ModelOutput {
            spans: self.extract_spans(text),
            scores: self.score_intents(text),
        }
    }

    fn is_known_word(&self, lower: &str) -> bool {
        self.vocabulary.contains(lower)
            || self.relation_terms.contains(lower)
            || lower.chars().all(|c| c.is_ascii_digit())
    }

    fn name_span(&self, text: &str, tokens: &[Token], start: usize, end: usize) -> RawSpan {
        let start_char = tokens[start].start_char;
        let end_char = tokens[end - 1].end_char;
        RawSpan {
            start_token_index: start,
            end_token_index: end,
            start_char,
            end_char,
            label: EntityLabel::FamilyMember,
            text: text
                .chars()
                .skip(start_char)
                .take(end_char - start_char)
                .collect(),
        }
    }
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn infer(
        &self,
        query: &str,
        _context: Option<&serde_json::Value>,
    ) -> Result<ModelOutput> {
        Ok(self.parse(query))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[RawSpan], label: EntityLabel) -> Vec<&str> {
        spans
            .iter()
            .filter(|s| s.label == label)
            .map(|s| s.text.as_str())
            .collect()
    }

    #[test]
    fn test_parent_query_spans() {
        let model = LexiconModel::new();
        let spans = model.extract_spans("Who is the father of Rohith?");

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].label, EntityLabel::Relation);
        assert_eq!(spans[0].text, "father");
        assert_eq!((spans[0].start_token_index, spans[0].end_token_index), (3, 4));
        assert_eq!(spans[1].label, EntityLabel::FamilyMember);
        assert_eq!(spans[1].text, "Rohith");
        assert_eq!((spans[1].start_char, spans[1].end_char), (21, 27));
    }

    #[test]
    fn test_multi_word_name_is_one_span() {
        let model = LexiconModel::new();
        let spans = model.extract_spans("Tell me about John doe's father");

        assert_eq!(texts(&spans, EntityLabel::FamilyMember), vec!["John doe"]);
        assert_eq!(texts(&spans, EntityLabel::Relation), vec!["father"]);
    }

    #[test]
    fn test_every_intent_is_scored() {
        let model = LexiconModel::new();
        let scores = model.score_intents("Who is the father of Rohith?");

        assert_eq!(scores.len(), Intent::ALL.len());
        assert_eq!(scores.get(Intent::GetParent), Some(0.9));
        assert_eq!(scores.get(Intent::GetDetails), Some(0.5));
        assert_eq!(scores.get(Intent::Unknown), Some(0.0));
    }

    #[test]
    fn test_no_cue_scores_unknown() {
        let model = LexiconModel::new();
        let output = model.parse("How many albums do I have?");

        assert_eq!(output.scores.get(Intent::Unknown), Some(1.0));
        assert!(output.spans.is_empty());
    }

    #[test]
    fn test_count_sisters_outscores_sibling() {
        let model = LexiconModel::new();
        let scores = model.score_intents("How many sisters does John doe have?");

        assert_eq!(scores.get(Intent::CountSisters), Some(0.9));
        assert_eq!(scores.get(Intent::GetSibling), Some(0.0));
    }

    #[test]
    fn test_cue_weights_are_capped() {
        let model = LexiconModel::new();
        let scores = model.score_intents("Who are the members of my family group?");

        assert_eq!(scores.get(Intent::GetGroupMembers), Some(1.0));
    }

    #[test]
    fn test_role_is_relation_term() {
        let model = LexiconModel::new();
        let output = model.parse("What is Sneha's role?");

        assert_eq!(texts(&output.spans, EntityLabel::FamilyMember), vec!["Sneha"]);
        assert_eq!(texts(&output.spans, EntityLabel::Relation), vec!["role"]);
        assert_eq!(output.scores.get(Intent::GetCollaboratorRole), Some(0.9));
    }

    #[tokio::test]
    async fn test_query_model_impl() {
        let model = LexiconModel::new();
        let output = model.infer("Describe Arjun's role?", None).await.unwrap();

        assert_eq!(model.name(), "lexicon");
        assert_eq!(texts(&output.spans, EntityLabel::FamilyMember), vec!["Arjun"]);
    }
}
