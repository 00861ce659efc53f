use rusqlite::params;
use crate::db::Db;
use crate::error::{Result, QacurateError};
use super::Document;

const BATCH_SIZE: usize = 500;

/// Insert or replace documents in batches
///
/// Each batch runs in its own transaction. Existing ids are overwritten;
/// the FTS5 triggers keep `documents_fts` in sync.
pub async fn insert_documents(db: &Db, docs: Vec<Document>) -> Result<usize> {
    if docs.is_empty() {
        return Ok(0);
    }

    db.with_connection(move |conn| {
        let mut count = 0;

        for batch in docs.chunks(BATCH_SIZE) {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO documents (id, text) VALUES (?1, ?2)
                    ON CONFLICT(id) DO UPDATE SET text = excluded.text
                    "#,
                )?;
                for doc in batch {
                    stmt.execute(params![doc.id, doc.text])?;
                }
            }
            tx.commit()?;
            count += batch.len();
            log::debug!("Inserted {} documents", count);
        }

        Ok::<usize, QacurateError>(count)
    }).await
}

/// Number of rows in the document table
pub async fn count_documents(db: &Db) -> Result<usize> {
    db.with_connection(|conn| {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(n as usize)
    }).await
}
