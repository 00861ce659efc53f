use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use crate::error::{Result, QacurateError};

/// One `NNN_name.sql` file.
struct Migration {
    version: u32,
    name: String,
    sql: String,
}

impl Migration {
    fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| QacurateError::Config(format!("Invalid migration filename: {}", path.display())))?
            .to_string();
        let version = name
            .split_once('_')
            .map_or(name.as_str(), |(v, _)| v)
            .parse::<u32>()
            .map_err(|_| QacurateError::Config(format!("Invalid migration version: {}", name)))?;
        let sql = fs::read_to_string(path)?;
        Ok(Self { version, name, sql })
    }
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    Ok(())
}

/// Names of applied migrations, oldest first.
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Every `.sql` file in `migrations_dir`, ordered by version.
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = fs::read_dir(migrations_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "sql"))
        .map(|p| Migration::from_path(&p))
        .collect::<Result<Vec<_>>>()?;
    migrations.sort_by_key(|m| m.version);
    Ok(migrations)
}

/// Run all pending migrations
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;
    let migrations = load_migrations(migrations_dir)?;

    for migration in migrations {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);

        let tx = conn.transaction()?;

        // execute_batch handles the semicolons inside trigger bodies
        tx.execute_batch(&migration.sql)
            .map_err(|e| {
                QacurateError::Config(format!("Failed to execute migration {}: {}", migration.name, e))
            })?;

        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;

        tx.commit()?;

        log::info!("Migration {} applied successfully", migration.name);
    }

    log::debug!("All migrations completed");
    Ok(())
}
