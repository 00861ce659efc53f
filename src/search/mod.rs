//! Candidate retrieval: top-k document ids per question.

pub mod bm25;

pub use bm25::{sanitize_fts5_query, Bm25Ranker};

/// Top-k document ids with their scores, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedDocs {
    pub doc_ids: Vec<String>,
    pub doc_scores: Vec<f64>,
}

impl RankedDocs {
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// `(doc_id, score)` pairs in rank order.
    pub fn into_pairs(self) -> Vec<(String, f64)> {
        self.doc_ids.into_iter().zip(self.doc_scores).collect()
    }
}
