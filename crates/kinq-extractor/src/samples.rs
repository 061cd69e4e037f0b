//! Hand-labeled training samples
//!
//! Each sample pairs a query with its labeled entity phrases and gold
//! intent. `build_examples` locates every phrase in the tokenized query and
//! produces character-offset training examples with one-hot intent targets,
//! ready to be handed to the external trainer as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tokens::{tokenize, Token};
use kinq_core::{EntityLabel, Intent, QueryResult};

/// A labeled query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub text: String,
    /// Entity phrases as they appear in the text (case may differ)
    pub entities: Vec<(EntityLabel, String)>,
    pub intent: Intent,
}

impl LabeledSample {
    pub fn new(text: &str, entities: &[(EntityLabel, &str)], intent: Intent) -> Self {
        Self {
            text: text.to_string(),
            entities: entities
                .iter()
                .map(|(label, phrase)| (*label, phrase.to_string()))
                .collect(),
            intent,
        }
    }

    /// The result a perfect model would produce for this sample
    pub fn expected_result(&self) -> QueryResult {
        let names: Vec<&str> = self
            .entities
            .iter()
            .filter(|(label, _)| *label == EntityLabel::FamilyMember)
            .map(|(_, phrase)| phrase.as_str())
            .collect();
        let relation = self
            .entities
            .iter()
            .filter(|(label, _)| *label == EntityLabel::Relation)
            .map(|(_, phrase)| phrase.clone())
            .last();

        QueryResult {
            intent: self.intent,
            entity: (!names.is_empty()).then(|| names.join(" ")),
            relation,
            ambiguous: false,
        }
    }
}

/// Entity annotation in character offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEntity {
    pub start_char: usize,
    pub end_char: usize,
    pub label: EntityLabel,
}

/// A sample converted to trainer input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub entities: Vec<TrainingEntity>,
    /// One score per intent label: 1.0 for the gold intent, 0.0 otherwise
    pub cats: BTreeMap<Intent, f32>,
}

/// A labeled phrase that could not be placed in its sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnalignedPhrase {
    pub text: String,
    pub phrase: String,
    pub label: EntityLabel,
}

/// Output of `build_examples`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub examples: Vec<TrainingExample>,
    pub unaligned: Vec<UnalignedPhrase>,
}

/// Find the first token window matching `phrase`, case-insensitively.
///
/// Returns the half-open token range.
pub fn align_phrase(tokens: &[Token], phrase: &str) -> Option<(usize, usize)> {
    let phrase_lower = phrase.to_lowercase();
    let phrase_tokens: Vec<&str> = phrase_lower.split_whitespace().collect();
    let n = phrase_tokens.len();
    if n == 0 || n > tokens.len() {
        return None;
    }

    (0..=tokens.len() - n)
        .find(|&i| {
            phrase_tokens
                .iter()
                .enumerate()
                .all(|(j, expected)| tokens[i + j].text.to_lowercase() == *expected)
        })
        .map(|i| (i, i + n))
}

/// Convert samples to training examples.
///
/// Phrases that can't be found, or that overlap an earlier phrase of the
/// same sample, are left out of the example and reported.
pub fn build_examples(samples: &[LabeledSample]) -> AlignmentReport {
    let mut report = AlignmentReport::default();

    for sample in samples {
        let tokens = tokenize(&sample.text);
        let mut taken: Vec<(usize, usize)> = Vec::new();
        let mut entities = Vec::new();

        for (label, phrase) in &sample.entities {
            let aligned = align_phrase(&tokens, phrase)
                .filter(|(start, end)| taken.iter().all(|(s, e)| end <= s || start >= e));

            match aligned {
                Some((start, end)) => {
                    taken.push((start, end));
                    entities.push(TrainingEntity {
                        start_char: tokens[start].start_char,
                        end_char: tokens[end - 1].end_char,
                        label: *label,
                    });
                }
                None => {
                    tracing::warn!(
                        "Could not find token span for '{}' in '{}'",
                        phrase,
                        sample.text
                    );
                    report.unaligned.push(UnalignedPhrase {
                        text: sample.text.clone(),
                        phrase: phrase.clone(),
                        label: *label,
                    });
                }
            }
        }

        entities.sort_by_key(|e| e.start_char);
        let cats = Intent::ALL
            .iter()
            .map(|intent| (*intent, if *intent == sample.intent { 1.0 } else { 0.0 }))
            .collect();

        report.examples.push(TrainingExample {
            text: sample.text.clone(),
            entities,
            cats,
        });
    }

    report
}

/// The hand-labeled sample set the production model is trained on
pub fn default_samples() -> Vec<LabeledSample> {
    use EntityLabel::{FamilyMember as F, Relation as R};
    use Intent::*;

    vec![
        LabeledSample::new("Who is the father of Rohith?", &[(R, "father"), (F, "Rohith")], GetParent),
        LabeledSample::new("Who is the father of John doe?", &[(R, "father"), (F, "John doe")], GetParent),
        LabeledSample::new("Who is the mother of Rohith?", &[(R, "mother"), (F, "Rohith")], GetParent),
        LabeledSample::new("Who is the mother of john doe?", &[(R, "mother"), (F, "john doe")], GetParent),
        LabeledSample::new("Who is the sister of Ramesh?", &[(R, "sister"), (F, "Ramesh")], GetSibling),
        LabeledSample::new("Who is the brother of Ramesh?", &[(R, "brother"), (F, "Ramesh")], GetSibling),
        LabeledSample::new("Tell me about John doe's father", &[(F, "John doe"), (R, "father")], GetParent),
        LabeledSample::new("John doe's son", &[(F, "John doe"), (R, "son")], GetChildren),
        LabeledSample::new("What is John doe's birthdate?", &[(F, "John doe")], GetDob),
        LabeledSample::new("How many sisters does John doe have?", &[(F, "John doe"), (R, "sisters")], CountSisters),
        LabeledSample::new("Tell me about the bio of Jane doe", &[(F, "Jane doe")], GetBio),
        LabeledSample::new("What is the bio of Jane doe", &[(F, "Jane doe")], GetBio),
        LabeledSample::new("Tell me about Jane doe", &[(F, "Jane doe")], GetDetails),
        LabeledSample::new("who is Jane doe", &[(F, "Jane doe")], GetDetails),
        LabeledSample::new(" Jane doe's information", &[(F, "Jane doe")], GetDetails),
        LabeledSample::new("Who is the son of Jane doe?", &[(R, "son"), (F, "Jane doe")], GetChildren),
        LabeledSample::new("Who is the son of peter doe?", &[(R, "son"), (F, "peter doe")], GetChildren),
        LabeledSample::new("Who is the daughter of John doe?", &[(R, "daughter"), (F, "John doe")], GetChildren),
        LabeledSample::new("Who is the brother of Jane doe?", &[(R, "brother"), (F, "Jane doe")], GetSibling),
        LabeledSample::new("Who is the cousin of Jane doe?", &[(R, "cousin"), (F, "Jane doe")], GetRelation),
        LabeledSample::new("Who is the son of Sundar?", &[(R, "son"), (F, "Sundar")], GetChildren),
        LabeledSample::new("Who are the children of Shankar?", &[(R, "children"), (F, "Shankar")], GetChildren),
        LabeledSample::new("Rohith's father", &[(F, "Rohith"), (R, "father")], GetParent),
        LabeledSample::new("Who are Rohith's children?", &[(F, "Rohith"), (R, "children")], GetChildren),
        LabeledSample::new("Who are jayamma's children?", &[(F, "jayamma"), (R, "children")], GetChildren),
        LabeledSample::new("What is Rohith's relation to John?", &[(F, "Rohith"), (R, "John")], GetRelation),
        LabeledSample::new("Who are the members of my family group?", &[], GetGroupMembers),
        LabeledSample::new("Who is Aarav's grandfather?", &[(F, "Aarav"), (R, "grandfather")], GetParent),
        LabeledSample::new("Does Priya have a sister?", &[(F, "Priya"), (R, "sister")], GetSibling),
        LabeledSample::new("Does Priya have a brother?", &[(F, "Priya"), (R, "brother")], GetSibling),
        LabeledSample::new("Tell me about Sneha's uncle", &[(F, "Sneha"), (R, "uncle")], GetRelation),
        LabeledSample::new("Who is the grandmother of Kavya?", &[(R, "grandmother"), (F, "Kavya")], GetParent),
        LabeledSample::new("Is Ramesh related to his aunt?", &[(F, "Ramesh"), (R, "aunt")], GetRelation),
        LabeledSample::new("Who are my collaborators?", &[], GetCollaborators),
        LabeledSample::new("Who are the active collaborators on my map?", &[], GetCollaborators),
        LabeledSample::new("What is Sneha's role?", &[(F, "Sneha")], GetCollaboratorRole),
        LabeledSample::new("What is the role of Rohith in the current sharing model?", &[(F, "Rohith")], GetCollaboratorRole),
        LabeledSample::new("What is Rohith's role?", &[(F, "Rohith")], GetCollaboratorRole),
        LabeledSample::new("Describe Arjun's role?", &[(F, "Arjun")], GetCollaboratorRole),
        LabeledSample::new("Describe sukesh's role?", &[(F, "sukesh")], GetCollaboratorRole),
        LabeledSample::new("Is Arjun still active?", &[(F, "Arjun")], GetCollaboratorStatus),
        LabeledSample::new("Why is collaboration useful?", &[], GetCollaborationInfo),
        // Follow-up turns that refer back to an earlier person
        LabeledSample::new("I meant her role as a contributor", &[(F, "Sneha")], GetCollaboratorRole),
        LabeledSample::new("I meant Rohith from the project", &[(F, "Rohith")], GetCollaboratorRole),
        LabeledSample::new("I meant his role as a contributor", &[(F, "Rohith")], GetCollaboratorRole),
        LabeledSample::new("Tell me about her family connection", &[(F, "Sneha")], GetDetails),
        LabeledSample::new("I was asking about her status", &[(F, "Sneha")], GetCollaboratorStatus),
        LabeledSample::new("I meant Sneha's collaborator role", &[(F, "Sneha")], GetCollaboratorRole),
        LabeledSample::new("Sneha the family member", &[(F, "Sneha")], GetDetails),
        LabeledSample::new("Her contributor role", &[(F, "Sneha")], GetCollaboratorRole),
        LabeledSample::new("Family side", &[(F, "Sneha")], GetDetails),
        LabeledSample::new("How many albums do I have?", &[], Unknown),
        LabeledSample::new("What is the meaning of life?", &[], Unknown),
        LabeledSample::new("What is the bio of Peter doe", &[(F, "Peter doe")], GetBio),
        LabeledSample::new("Who is the father of Peter doe?", &[(R, "father"), (F, "Peter doe")], GetParent),
        LabeledSample::new("What is Jane Doe's bio?", &[(F, "Jane Doe")], GetBio),
        LabeledSample::new("who is Peter doe", &[(F, "Peter doe")], GetDetails),
        LabeledSample::new("Tell me about Peter doe", &[(F, "Peter doe")], GetDetails),
        LabeledSample::new("What is the DOB of Peter Doe?", &[(F, "Peter Doe")], GetDob),
        LabeledSample::new("When was Sundar murthy born?", &[(F, "Sundar murthy")], GetDob),
        LabeledSample::new("who is John Doe", &[(F, "John Doe")], GetDetails),
        LabeledSample::new("Tell me about John Doe", &[(F, "John Doe")], GetDetails),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_phrase_case_insensitive() {
        let tokens = tokenize("Who is the mother of john doe?");

        assert_eq!(align_phrase(&tokens, "John Doe"), Some((5, 7)));
        assert_eq!(align_phrase(&tokens, "mother"), Some((3, 4)));
        assert_eq!(align_phrase(&tokens, "Sneha"), None);
        assert_eq!(align_phrase(&tokens, "   "), None);
    }

    #[test]
    fn test_align_phrase_before_possessive() {
        let tokens = tokenize("What is Jane Doe's bio?");
        assert_eq!(align_phrase(&tokens, "Jane Doe"), Some((2, 4)));
    }

    #[test]
    fn test_build_example_offsets_and_cats() {
        let samples = vec![LabeledSample::new(
            "Who is the father of John doe?",
            &[(EntityLabel::Relation, "father"), (EntityLabel::FamilyMember, "John doe")],
            Intent::GetParent,
        )];

        let report = build_examples(&samples);

        assert!(report.unaligned.is_empty());
        let example = &report.examples[0];
        assert_eq!(
            example.entities,
            vec![
                TrainingEntity {
                    start_char: 11,
                    end_char: 17,
                    label: EntityLabel::Relation
                },
                TrainingEntity {
                    start_char: 21,
                    end_char: 29,
                    label: EntityLabel::FamilyMember
                },
            ]
        );
        assert_eq!(example.cats.len(), Intent::ALL.len());
        assert_eq!(example.cats[&Intent::GetParent], 1.0);
        assert_eq!(example.cats[&Intent::Unknown], 0.0);
    }

    #[test]
    fn test_pronoun_samples_are_reported() {
        let samples = vec![LabeledSample::new(
            "I meant her role as a contributor",
            &[(EntityLabel::FamilyMember, "Sneha")],
            Intent::GetCollaboratorRole,
        )];

        let report = build_examples(&samples);

        assert_eq!(report.examples.len(), 1);
        assert!(report.examples[0].entities.is_empty());
        assert_eq!(report.unaligned.len(), 1);
        assert_eq!(report.unaligned[0].phrase, "Sneha");
    }

    #[test]
    fn test_overlapping_phrase_is_reported() {
        let samples = vec![LabeledSample::new(
            "Rohith's father",
            &[(EntityLabel::FamilyMember, "Rohith"), (EntityLabel::Relation, "Rohith")],
            Intent::GetParent,
        )];

        let report = build_examples(&samples);

        assert_eq!(report.examples[0].entities.len(), 1);
        assert_eq!(report.unaligned[0].label, EntityLabel::Relation);
    }

    #[test]
    fn test_default_samples_alignment() {
        let samples = default_samples();
        let report = build_examples(&samples);

        assert_eq!(report.examples.len(), samples.len());
        // Follow-up turns label a person the text only refers to by pronoun
        assert_eq!(report.unaligned.len(), 6);
        assert!(report.unaligned.iter().all(|u| u.label == EntityLabel::FamilyMember));
    }

    #[test]
    fn test_expected_result() {
        let sample = LabeledSample::new(
            "Tell me about Sneha's uncle",
            &[(EntityLabel::FamilyMember, "Sneha"), (EntityLabel::Relation, "uncle")],
            Intent::GetRelation,
        );

        let expected = sample.expected_result();

        assert_eq!(expected.intent, Intent::GetRelation);
        assert_eq!(expected.entity.as_deref(), Some("Sneha"));
        assert_eq!(expected.relation.as_deref(), Some("uncle"));
    }
}
