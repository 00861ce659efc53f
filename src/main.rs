use anyhow::Result;
use clap::{Parser, Subcommand};
use qacurate::db::{migrate, Db};
use qacurate::error::QacurateError;
use qacurate::store::count_documents;
use qacurate::Config;

#[derive(Parser, Debug)]
#[command(name = "qacurate")]
#[command(about = "Retriever error analysis and QA dataset curation")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and check the document database (default)
    Verify,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;

    match args.command.unwrap_or(Command::Verify) {
        Command::Verify => run_schema_verification(&config).await?,
        Command::Config => print_config(&config),
    }

    Ok(())
}

fn print_config(config: &Config) {
    println!("[store]");
    println!("db_path = {}", config.db_path().display());
    println!("migrations_dir = {}", config.migrations_dir().display());
    println!("[scoring]");
    println!("match_mode = {}", config.scoring.match_mode);
    println!("tokenizer = {}", config.scoring.tokenizer);
    println!("n_docs = {}", config.scoring.n_docs);
    println!("num_workers = {}", config.num_workers());
    println!("doc_cache_capacity = {}", config.scoring.doc_cache_capacity);
    println!("channel_capacity = {}", config.scoring.channel_capacity);
    println!("[output]");
    println!("out_dir = {}", config.output.out_dir.display());
}

async fn run_schema_verification(config: &Config) -> Result<()> {
    log::info!("Starting qacurate v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    let docs = count_documents(&db).await?;
    println!("Documents: {}", docs);
    if docs == 0 {
        log::warn!("Document store is empty. Load documents with the `ingest` binary.");
    }

    Ok(())
}

/// Check that every object the scorer and ranker rely on exists.
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = ["documents", "documents_fts", "schema_migrations"];
        let missing: Vec<&str> = expected_tables
            .iter()
            .copied()
            .filter(|t| !tables.iter().any(|name| name == t))
            .collect();
        for table in &missing {
            log::error!("Missing table: {}", table);
        }
        if !missing.is_empty() {
            return Err(QacurateError::Config("Not all required tables exist".to_string()));
        }
        log::debug!("✓ Tables exist");

        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='trigger' ORDER BY name")?;
        let triggers: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_triggers = ["documents_fts_insert", "documents_fts_delete", "documents_fts_update"];
        for trigger in &expected_triggers {
            if !triggers.iter().any(|t| t == trigger) {
                log::error!("Missing trigger: {}", trigger);
                return Err(QacurateError::Config(format!("Missing trigger: {}", trigger)));
            }
        }
        log::debug!("✓ FTS triggers exist");

        let applied = migrate::get_applied_migrations(conn)?;
        if applied.len() < 2 {
            return Err(QacurateError::Config(format!(
                "Expected at least 2 migrations, found {}",
                applied.len()
            )));
        }
        log::debug!("✓ {} migrations applied", applied.len());

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(QacurateError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
