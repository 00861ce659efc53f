use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, QacurateError};

const PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -65536; \
     PRAGMA mmap_size = 268435456;";

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new read-write database connection with optimized pragmas
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(QacurateError::Database)?;

        // WAL lets scoring workers read while the ingest writer commits
        conn.execute_batch(PRAGMAS)?;

        Ok(conn)
    }

    /// Open a query-only connection; fails if the database file does not exist.
    ///
    /// Scoring workers and the ranker only ever read, so they never create an
    /// empty database by accident.
    pub fn open_read_only(&self) -> Result<Connection> {
        if !self.path.is_file() {
            return Err(QacurateError::Config(format!(
                "document database not found: {}",
                self.path.display()
            )));
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA query_only = ON; PRAGMA temp_store = MEMORY; PRAGMA cache_size = -16384;")?;
        Ok(conn)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        task::spawn_blocking(move || {
            let mut conn = db.open_connection()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| QacurateError::Batch(format!("database task join: {}", e)))?
    }
}

pub mod migrate;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_db_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);

        let result = db.with_connection(|conn| {
            conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY)", [])
                .map_err(QacurateError::Database)?;
            Ok(())
        }).await;

        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_pragmas_set() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));

        db.with_connection(|conn| {
            let journal_mode: String = conn.query_row(
                "PRAGMA journal_mode",
                [],
                |row| row.get(0)
            )?;
            assert_eq!(journal_mode.to_uppercase(), "WAL");
            Ok::<(), QacurateError>(())
        }).await.unwrap();
    }

    #[test]
    fn test_read_only_requires_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("missing.db"));
        assert!(db.open_read_only().is_err());
        assert!(!temp_dir.path().join("missing.db").exists());
    }
}
