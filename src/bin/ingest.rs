use anyhow::{Context, Result};
use clap::Parser;
use qacurate::db::{migrate, Db};
use qacurate::store::{count_documents, discover_text_documents, insert_documents, load_jsonl_documents};
use qacurate::Config;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Load documents into the qacurate document store")]
struct Args {
    /// JSONL file of {"id", "text"} records, or a directory of .txt/.md files
    source: PathBuf,

    /// Document database (overrides store.db_path)
    #[arg(long)]
    doc_db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let config = Config::load()?;
    let db_path = args.doc_db.unwrap_or_else(|| config.db_path().to_path_buf());
    log::info!("Database path: {}", db_path.display());

    let db = Db::new(&db_path);
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    log::info!("Database initialized");

    let start = Instant::now();
    let docs = if args.source.is_dir() {
        log::info!("Discovering text files in {}", args.source.display());
        discover_text_documents(&args.source)
    } else {
        log::info!("Reading documents from {}", args.source.display());
        load_jsonl_documents(&args.source)
    }
    .with_context(|| format!("Failed to load documents from {}", args.source.display()))?;

    if docs.is_empty() {
        log::warn!("No documents found in {}", args.source.display());
        return Ok(());
    }

    let loaded = docs.len();
    let written = insert_documents(&db, docs).await?;
    let total = count_documents(&db).await?;

    log::info!(
        "Ingestion complete: {} loaded, {} written, {} in store ({:.2}s)",
        loaded,
        written,
        total,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
