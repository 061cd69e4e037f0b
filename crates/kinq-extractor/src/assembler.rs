//! Result assembly
//!
//! Turns intent scores and normalized spans into the final `QueryResult`:
//! picks the winning intent, flags near-ties as ambiguous, and splits spans
//! into a family member name and a relation phrase.

use kinq_core::config::DEFAULT_AMBIGUITY_MARGIN;
use kinq_core::{EntityLabel, Intent, IntentScores, NormalizedSpan, QueryResult};

/// Winning intent with the scores used for the ambiguity check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentRanking {
    pub intent: Intent,
    pub confidence: f32,
    pub second_confidence: f32,
}

impl IntentRanking {
    /// Ranking used when the model produced no scores
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            second_confidence: 0.0,
        }
    }

    /// True when the top two scores are closer than `margin`. Never true
    /// for an `unknown` winner.
    pub fn is_ambiguous(&self, margin: f32) -> bool {
        (self.confidence - self.second_confidence).abs() < margin && self.intent != Intent::Unknown
    }
}

/// Rank intents by score, highest first.
///
/// Equal scores are ordered by intent label, ascending.
pub fn rank_intents(scores: &IntentScores) -> IntentRanking {
    let mut ranked: Vec<(Intent, f32)> = scores.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    match ranked.as_slice() {
        [] => IntentRanking::unknown(),
        [(intent, confidence)] => IntentRanking {
            intent: *intent,
            confidence: *confidence,
            second_confidence: 0.0,
        },
        [(intent, confidence), (_, second), ..] => IntentRanking {
            intent: *intent,
            confidence: *confidence,
            second_confidence: *second,
        },
    }
}

/// Assembles query results with a configurable ambiguity margin
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler {
    ambiguity_margin: f32,
}

impl ResultAssembler {
    pub fn new(ambiguity_margin: f32) -> Self {
        Self { ambiguity_margin }
    }

    pub fn ambiguity_margin(&self) -> f32 {
        self.ambiguity_margin
    }

    /// Build the final result. Total over its input: empty scores and spans
    /// yield `QueryResult::unknown()`.
    pub fn assemble(&self, scores: &IntentScores, spans: &[NormalizedSpan]) -> QueryResult {
        let ranking = rank_intents(scores);

        let mut names: Vec<&str> = Vec::new();
        let mut relation = None;
        for span in spans {
            match span.label {
                EntityLabel::FamilyMember => names.push(&span.text),
                // Later relation phrases overwrite earlier ones
                EntityLabel::Relation => relation = Some(span.text.clone()),
            }
        }

        let entity = if names.is_empty() {
            None
        } else {
            Some(names.join(" "))
        };

        QueryResult {
            intent: ranking.intent,
            entity,
            relation,
            ambiguous: ranking.is_ambiguous(self.ambiguity_margin),
        }
    }
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_AMBIGUITY_MARGIN)
    }
}
