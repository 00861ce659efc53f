//! Apply reformulated questions back onto a dataset.

use std::collections::HashMap;

use crate::eval::{ErrorCase, QuestionRecord};

/// `question -> sq` for every case carrying a non-empty reformulation.
///
/// A later case wins when the same question was corrected twice.
pub fn reformulation_map(cases: &[ErrorCase]) -> HashMap<String, String> {
    cases
        .iter()
        .filter_map(|c| c.reformulated().map(|sq| (c.question.clone(), sq.to_string())))
        .collect()
}

/// Replace the questions of `records` found in `map`.
///
/// Returns the patched records and how many were replaced.
pub fn patch_dataset(
    records: Vec<QuestionRecord>,
    map: &HashMap<String, String>,
) -> (Vec<QuestionRecord>, usize) {
    let mut replaced = 0;
    let patched = records
        .into_iter()
        .map(|mut record| {
            if let Some(sq) = map.get(&record.question) {
                record.question = sq.clone();
                replaced += 1;
            }
            record
        })
        .collect();
    (patched, replaced)
}

/// Dataset built from a correction file alone. A case carrying `sq` uses it
/// verbatim, even when it is empty; only a missing `sq` keeps the question.
pub fn corrections_to_dataset(cases: &[ErrorCase]) -> Vec<QuestionRecord> {
    cases
        .iter()
        .map(|c| QuestionRecord {
            question: c.sq.as_deref().unwrap_or(&c.question).to_string(),
            answer: c.answer.clone(),
        })
        .collect()
}
