//! Records flowing through the error-scoring pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{QacurateError, Result};
use crate::search::RankedDocs;

/// One dataset line: a question and every acceptable answer string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub answer: Vec<String>,
}

/// A question paired with the ranker's top-k `(doc_id, score)` candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub question: String,
    pub answer: Vec<String>,
    pub candidates: Vec<(String, f64)>,
}

impl RankedResult {
    pub fn new(record: QuestionRecord, ranked: RankedDocs) -> Self {
        Self {
            question: record.question,
            answer: record.answer,
            candidates: ranked.into_pairs(),
        }
    }
}

/// Zip dataset records with ranker output, one ranking per record.
pub fn pair_rankings(
    records: Vec<QuestionRecord>,
    rankings: Vec<RankedDocs>,
) -> Result<Vec<RankedResult>> {
    if records.len() != rankings.len() {
        return Err(QacurateError::InvalidInput(format!(
            "{} questions but {} rankings",
            records.len(),
            rankings.len()
        )));
    }
    Ok(records
        .into_iter()
        .zip(rankings)
        .map(|(record, ranked)| RankedResult::new(record, ranked))
        .collect())
}

/// A question none of whose candidates contained the answer.
///
/// Written by the scorer with `question`, `answer` and `candidates` only.
/// The curation tools add `sq` (the reformulated question) and `dirty`
/// (explored marker). SQuAD-derived files may also carry `title` and
/// `context`; any other field is kept in `extra` so rewriting a file never
/// drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCase {
    pub question: String,
    pub answer: Vec<String>,
    #[serde(default)]
    pub candidates: Vec<(String, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirty: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ErrorCase {
    pub fn new(question: String, answer: Vec<String>, candidates: Vec<(String, f64)>) -> Self {
        Self {
            question,
            answer,
            candidates,
            title: None,
            context: None,
            sq: None,
            dirty: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Already looked at in a correction session.
    pub fn is_explored(&self) -> bool {
        self.dirty.is_some()
    }

    /// Carries a rewritten question.
    pub fn is_reformulated(&self) -> bool {
        self.sq.is_some()
    }

    /// The rewritten question when one was recorded and is non-empty.
    pub fn reformulated(&self) -> Option<&str> {
        self.sq.as_deref().filter(|q| !q.is_empty())
    }
}

/// Per-question scoring outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Some candidate contains a gold answer.
    Hit,
    /// No candidate contains a gold answer; an error record was emitted.
    Miss,
    /// A candidate could not be fetched; the question was not scored.
    Failed(String),
}

impl Outcome {
    pub fn is_miss(&self) -> bool {
        matches!(self, Outcome::Miss)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Outcome tagged with the input index it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub index: usize,
    pub outcome: Outcome,
}
