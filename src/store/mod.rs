//! Read-only document lookup by id, plus the ingest-side writer and loaders.

pub mod loader;
pub mod writer;

pub use loader::{discover_text_documents, load_jsonl_documents};
pub use writer::{count_documents, insert_documents};

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Db;
use crate::error::{QacurateError, Result};

/// A retrievable document: string id and raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

/// Lookup of raw document text by id.
///
/// Unknown ids fail with [`QacurateError::DocumentNotFound`].
pub trait DocumentStore: Send {
    fn get_doc_text(&self, doc_id: &str) -> Result<String>;
}

/// SQLite-backed store over the `documents` table. One per worker; the
/// connection is opened read-only.
pub struct SqliteDocStore {
    conn: Connection,
}

impl SqliteDocStore {
    pub fn open(db: &Db) -> Result<Self> {
        let conn = db.open_read_only()?;
        Ok(Self { conn })
    }
}

impl DocumentStore for SqliteDocStore {
    fn get_doc_text(&self, doc_id: &str) -> Result<String> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT text FROM documents WHERE id = ?1")?;
        stmt.query_row([doc_id], |row| row.get::<_, String>(0))
            .optional()?
            .ok_or_else(|| QacurateError::DocumentNotFound(doc_id.to_string()))
    }
}

/// In-memory store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocStore {
    docs: Arc<HashMap<String, String>>,
}

impl MemoryDocStore {
    pub fn new<I, K, V>(docs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            docs: Arc::new(docs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl DocumentStore for MemoryDocStore {
    fn get_doc_text(&self, doc_id: &str) -> Result<String> {
        self.docs
            .get(doc_id)
            .cloned()
            .ok_or_else(|| QacurateError::DocumentNotFound(doc_id.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::setup_test_db;
    use super::*;

    #[tokio::test]
    async fn test_sqlite_store_lookup() {
        let (db, _temp_dir) = setup_test_db(&[("Paris", "Paris is the capital of France.")]).await;
        let store = SqliteDocStore::open(&db).unwrap();
        assert_eq!(store.get_doc_text("Paris").unwrap(), "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_sqlite_store_unknown_id() {
        let (db, _temp_dir) = setup_test_db(&[("Paris", "text")]).await;
        let store = SqliteDocStore::open(&db).unwrap();
        let err = store.get_doc_text("Lyon").unwrap_err();
        assert!(matches!(err, QacurateError::DocumentNotFound(ref id) if id == "Lyon"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryDocStore::new([("a", "alpha"), ("b", "beta")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_doc_text("b").unwrap(), "beta");
        assert!(matches!(
            store.get_doc_text("c"),
            Err(QacurateError::DocumentNotFound(_))
        ));
    }
}
