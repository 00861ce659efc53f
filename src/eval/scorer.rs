//! Per-question scoring against the ranked candidates.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::matcher::{MatchMode, PreparedAnswers};
use super::types::{Outcome, RankedResult};
use crate::error::Result;
use crate::store::DocumentStore;
use crate::text::{normalize, Tokenizer};

/// Everything one scoring worker owns: its own store handle, its own
/// tokenizer, and an LRU of normalized document text.
///
/// Built once when the worker starts and reused for every task it pulls.
pub struct WorkerContext {
    store: Box<dyn DocumentStore>,
    tokenizer: Box<dyn Tokenizer>,
    cache: LruCache<String, Arc<str>>,
}

impl WorkerContext {
    pub fn new(
        store: Box<dyn DocumentStore>,
        tokenizer: Box<dyn Tokenizer>,
        cache_capacity: usize,
    ) -> Self {
        let cap = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            tokenizer,
            cache: LruCache::new(cap),
        }
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Raw document text, bypassing the cache.
    pub fn doc_text(&self, doc_id: &str) -> Result<String> {
        self.store.get_doc_text(doc_id)
    }

    /// Fetch and normalize a document, consulting the cache first.
    pub fn normalized_text(&mut self, doc_id: &str) -> Result<Arc<str>> {
        if let Some(text) = self.cache.get(doc_id) {
            return Ok(Arc::clone(text));
        }
        let text: Arc<str> = normalize(&self.store.get_doc_text(doc_id)?).into();
        self.cache.put(doc_id.to_string(), Arc::clone(&text));
        Ok(text)
    }

    /// Whether document `doc_id` contains any of `answers` under `mode`.
    pub fn has_answer(&mut self, answers: &[String], doc_id: &str, mode: MatchMode) -> Result<bool> {
        let prepared = PreparedAnswers::new(answers, mode, self.tokenizer());
        let text = self.normalized_text(doc_id)?;
        Ok(prepared.matches_normalized(&text, self.tokenizer()))
    }
}

/// Result of scoring one question.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskScore {
    pub outcome: Outcome,
    /// `(doc_id, score)` of every candidate examined, in rank order.
    pub candidates: Vec<(String, f64)>,
}

/// Walk the candidates in rank order until one contains an answer.
///
/// The first matching document ends the scan, so lower-ranked candidates are
/// never fetched. A candidate missing from the store turns the whole question
/// into [`Outcome::Failed`]. Zero candidates is a miss.
pub fn score_task(ctx: &mut WorkerContext, task: &RankedResult, mode: MatchMode) -> TaskScore {
    let answers = PreparedAnswers::new(&task.answer, mode, ctx.tokenizer());
    let mut examined = Vec::with_capacity(task.candidates.len());

    for (doc_id, score) in &task.candidates {
        let text = match ctx.normalized_text(doc_id) {
            Ok(text) => text,
            Err(e) => {
                return TaskScore {
                    outcome: Outcome::Failed(e.to_string()),
                    candidates: examined,
                }
            }
        };
        examined.push((doc_id.clone(), *score));
        if answers.matches_normalized(&text, ctx.tokenizer()) {
            return TaskScore {
                outcome: Outcome::Hit,
                candidates: examined,
            };
        }
    }

    TaskScore {
        outcome: Outcome::Miss,
        candidates: examined,
    }
}
