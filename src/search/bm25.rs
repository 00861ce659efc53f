use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::RankedDocs;
use crate::db::Db;
use crate::error::{QacurateError, Result};

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP_WORDS.get_or_init(|| {
        [
            "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
            "by", "from", "as", "is", "are", "was", "were", "be", "been", "being", "have",
            "has", "had", "do", "does", "did", "will", "would", "should", "could", "what",
            "which", "who", "where", "when", "why", "how", "this", "that", "these", "those",
        ]
        .into_iter()
        .collect()
    })
}

/// Turn a natural-language question into an FTS5 MATCH expression
///
/// Splits on anything that is not alphanumeric, drops stop words and
/// single-character terms, quotes every remaining term and ORs them together.
/// Quoting means no user text is ever parsed as FTS5 syntax. Returns an empty
/// string when nothing searchable is left.
pub fn sanitize_fts5_query(query: &str) -> String {
    let mut seen = HashSet::new();
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|term| !stop_words().contains(term.as_str()))
        .filter(|term| seen.insert(term.clone()))
        .map(|term| format!("\"{}\"", term))
        .collect();

    terms.join(" OR ")
}

/// Run one BM25 query on an open connection.
///
/// Scores are `-bm25()` so that higher means more relevant.
fn query_closest(conn: &Connection, query: &str, k: usize) -> Result<RankedDocs> {
    let sanitized = sanitize_fts5_query(query);
    if sanitized.is_empty() || k == 0 {
        return Ok(RankedDocs::default());
    }

    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, -bm25(documents_fts) AS score
        FROM documents_fts
        WHERE documents_fts MATCH ?1
        ORDER BY bm25(documents_fts)
        LIMIT ?2
        "#,
    )?;

    let mut rows = stmt.query(params![sanitized, k as i64])?;
    let mut ranked = RankedDocs::default();
    while let Some(row) = rows.next()? {
        ranked.doc_ids.push(row.get::<_, String>(0)?);
        ranked.doc_scores.push(row.get::<_, f64>(1)?);
    }

    Ok(ranked)
}

/// BM25 ranker over the `documents_fts` index
#[derive(Debug, Clone)]
pub struct Bm25Ranker {
    db: Db,
}

impl Bm25Ranker {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Rank a single query on a fresh read-only connection.
    pub fn closest_docs(&self, query: &str, k: usize) -> Result<RankedDocs> {
        let conn = self.db.open_read_only()?;
        query_closest(&conn, query, k)
    }

    /// Rank every query, splitting the list across `num_workers` blocking
    /// tasks that each hold their own connection.
    ///
    /// Output is in input order: `result[i]` ranks `queries[i]`.
    pub async fn batch_closest_docs(
        &self,
        queries: Vec<String>,
        k: usize,
        num_workers: usize,
    ) -> Result<Vec<RankedDocs>> {
        let start = std::time::Instant::now();
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let workers = num_workers.max(1).min(queries.len());
        let chunk_size = (queries.len() + workers - 1) / workers;

        let mut handles = Vec::with_capacity(workers);
        for chunk in queries.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let db = self.db.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let conn = db.open_read_only()?;
                chunk
                    .iter()
                    .map(|q| query_closest(&conn, q, k))
                    .collect::<Result<Vec<_>>>()
            }));
        }

        let mut ranked = Vec::with_capacity(queries.len());
        for handle in handles {
            let part = handle
                .await
                .map_err(|e| QacurateError::Batch(format!("ranker task join: {}", e)))??;
            ranked.extend(part);
        }

        log::debug!(
            "Ranked {} queries (k={}, workers={}) in {:?}",
            ranked.len(),
            k,
            workers,
            start.elapsed()
        );
        Ok(ranked)
    }
}
