use anyhow::{Context, Result};
use clap::Parser;
use qacurate::curate::Explorer;
use qacurate::db::Db;
use qacurate::eval::{ErrorCase, MatchMode, WorkerContext};
use qacurate::jsonl;
use qacurate::search::Bm25Ranker;
use qacurate::store::SqliteDocStore;
use qacurate::text::{build_tokenizer, TokenizerKind};
use qacurate::Config;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "explore")]
#[command(about = "Browse the cases of an error file")]
struct Args {
    /// Error file written by eval-err (.errs) or a correction file (.corr)
    error_file: PathBuf,

    /// Document database (overrides store.db_path)
    #[arg(long)]
    doc_db: Option<PathBuf>,

    /// Answer matching mode for `check`
    #[arg(long = "match", value_enum)]
    match_mode: Option<MatchMode>,

    /// Tokenizer for string matching in `check`
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerKind>,

    /// Documents listed by `search`
    #[arg(long)]
    n_docs: Option<usize>,

    /// Disable answer highlighting
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;

    log::info!("Loading error cases from {}...", args.error_file.display());
    let cases: Vec<ErrorCase> = jsonl::read_jsonl(&args.error_file)
        .with_context(|| format!("Failed to read {}", args.error_file.display()))?;
    log::info!("{} cases loaded.", cases.len());

    let stdout = std::io::stdout();
    let color = !args.no_color && stdout.is_terminal();
    let mut explorer = Explorer::new(cases, color);

    let db = Db::new(args.doc_db.as_deref().unwrap_or(config.db_path()));
    match SqliteDocStore::open(&db) {
        Ok(store) => {
            let tokenizer = build_tokenizer(args.tokenizer.unwrap_or(config.scoring.tokenizer))?;
            let docs = WorkerContext::new(
                Box::new(store),
                tokenizer,
                config.scoring.doc_cache_capacity,
            );
            let mode = args.match_mode.unwrap_or(config.scoring.match_mode);
            let n_docs = args.n_docs.unwrap_or(config.scoring.n_docs);
            explorer = explorer
                .with_documents(docs, mode)
                .with_ranker(Bm25Ranker::new(db), n_docs);
        }
        Err(e) => log::warn!("Document contents unavailable: {}", e),
    }
    explorer.run(std::io::stdin().lock(), &mut stdout.lock())?;

    Ok(())
}
