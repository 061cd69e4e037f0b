//! Quality Metrics module
//!
//! Runs the full interpretation pipeline over labeled samples and measures
//! intent accuracy plus precision, recall and F1 over the extracted
//! `(label, text)` pairs of each result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::samples::LabeledSample;
use crate::QueryInterpreter;
use kinq_core::{EntityLabel, QueryResult, Result};

// ============================================================================
// Entity Metrics
// ============================================================================

/// Metrics for entity extraction evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// True positives (correctly identified entities)
    pub true_positives: usize,
    /// False positives (incorrectly identified as entities)
    pub false_positives: usize,
    /// False negatives (missed entities)
    pub false_negatives: usize,
}

impl EntityMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f32 {
        if self.true_positives + self.false_positives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_positives) as f32
        }
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f32 {
        if self.true_positives + self.false_negatives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_negatives) as f32
        }
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Add the comparison of one predicted result against its gold result
    pub fn add(&mut self, predicted: &QueryResult, gold: &QueryResult) {
        let predicted = entity_set(predicted);
        let gold = entity_set(gold);

        self.true_positives += predicted.intersection(&gold).count();
        self.false_positives += predicted.difference(&gold).count();
        self.false_negatives += gold.difference(&predicted).count();
    }
}

fn entity_set(result: &QueryResult) -> HashSet<(EntityLabel, String)> {
    let mut set = HashSet::new();
    if let Some(entity) = &result.entity {
        set.insert((EntityLabel::FamilyMember, entity.to_lowercase()));
    }
    if let Some(relation) = &result.relation {
        set.insert((EntityLabel::Relation, relation.to_lowercase()));
    }
    set
}

// ============================================================================
// Evaluation
// ============================================================================

/// A sample the pipeline got wrong
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMismatch {
    pub text: String,
    pub expected: QueryResult,
    pub actual: QueryResult,
}

/// Pipeline quality over a sample set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub intent_correct: usize,
    pub ambiguous: usize,
    pub entities: EntityMetrics,
    pub mismatches: Vec<SampleMismatch>,
}

impl EvaluationReport {
    pub fn intent_accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.intent_correct as f32 / self.total as f32
        }
    }
}

/// Interpret every sample and compare against its expected result.
///
/// Entity comparison is case-insensitive; the ambiguity flag is counted but
/// not scored.
pub async fn evaluate(
    interpreter: &QueryInterpreter,
    samples: &[LabeledSample],
) -> Result<EvaluationReport> {
    let mut report = EvaluationReport::default();

    for sample in samples {
        let actual = interpreter.interpret(&sample.text, None).await?;
        let expected = sample.expected_result();

        report.total += 1;
        if actual.ambiguous {
            report.ambiguous += 1;
        }
        if actual.intent == expected.intent {
            report.intent_correct += 1;
        }
        report.entities.add(&actual, &expected);

        if actual.intent != expected.intent || entity_set(&actual) != entity_set(&expected) {
            report.mismatches.push(SampleMismatch {
                text: sample.text.clone(),
                expected,
                actual,
            });
        }
    }

    tracing::info!(
        "Evaluated {} samples: intent accuracy {:.3}, entity F1 {:.3}",
        report.total,
        report.intent_accuracy(),
        report.entities.f1_score()
    );

    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
