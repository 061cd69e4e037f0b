//! Entity span normalization
//!
//! The trained model tends to split a two-token personal name into a
//! RELATION-labeled given name followed by an unattached "doe" token.
//! This pass stitches such pairs back together into one FAMILY_MEMBER span.
//!
//! The rule is deliberately narrow: it fires on the literal surname "doe"
//! only and does not check whether the two spans actually belong to the same
//! person, so a relation word followed by an unrelated "doe" is merged too.

use kinq_core::{EntityLabel, NormalizedSpan, RawSpan};

/// Surname the model fails to attach to the preceding given name
const DETACHED_SURNAME: &str = "doe";

/// Merge `RELATION` + `"doe"` span pairs, left to right, in a single pass.
///
/// Output is in the same order as the input and never longer.
pub fn normalize_spans(spans: Vec<RawSpan>) -> Vec<NormalizedSpan> {
    let mut normalized = Vec::with_capacity(spans.len());
    let mut iter = spans.into_iter().peekable();

    while let Some(current) = iter.next() {
        let merge = current.label == EntityLabel::Relation
            && iter
                .peek()
                .is_some_and(|next| next.text.to_lowercase() == DETACHED_SURNAME);

        if merge {
            if let Some(next) = iter.next() {
                tracing::debug!(
                    "Merging '{}' + '{}' into a family member span",
                    current.text,
                    next.text
                );
                normalized.push(NormalizedSpan {
                    start_token_index: current.start_token_index,
                    end_token_index: next.end_token_index,
                    start_char: current.start_char,
                    end_char: next.end_char,
                    label: EntityLabel::FamilyMember,
                    text: format!("{} {}", current.text, next.text),
                });
                continue;
            }
        }

        normalized.push(current.into());
    }

    normalized
}
