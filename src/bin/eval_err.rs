use anyhow::{Context, Result};
use clap::Parser;
use qacurate::db::Db;
use qacurate::eval::{
    error_file_path, pair_rankings, score_to_file, BatchOptions, ContextFactory, EvalSummary,
    MatchMode, QuestionRecord, WorkerContext,
};
use qacurate::jsonl;
use qacurate::search::Bm25Ranker;
use qacurate::store::SqliteDocStore;
use qacurate::text::{build_tokenizer, TokenizerKind};
use qacurate::{Config, QacurateError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "eval-err")]
#[command(about = "Record questions whose top-k retrieved documents miss every answer")]
struct Args {
    /// Dataset: JSONL of {"question", "answer": [...]}
    dataset: PathBuf,

    /// Retriever model file; its stem names the output file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Document database (overrides store.db_path)
    #[arg(long)]
    doc_db: Option<PathBuf>,

    /// Candidates retrieved per question
    #[arg(long)]
    n_docs: Option<usize>,

    /// Scoring workers (default: available parallelism)
    #[arg(long)]
    num_workers: Option<usize>,

    /// Answer matching mode
    #[arg(long = "match", value_enum)]
    match_mode: Option<MatchMode>,

    /// Tokenizer for string matching
    #[arg(long, value_enum)]
    tokenizer: Option<TokenizerKind>,

    /// Directory for the .errs file
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn build_factory(db: Db, tokenizer: TokenizerKind, cache_capacity: usize) -> ContextFactory {
    Arc::new(move |worker| {
        let store = SqliteDocStore::open(&db)
            .map_err(|e| QacurateError::WorkerInit(format!("document store: {}", e)))?;
        let tokenizer = build_tokenizer(tokenizer)?;
        log::debug!("worker {} ready", worker);
        Ok(WorkerContext::new(Box::new(store), tokenizer, cache_capacity))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let start = Instant::now();

    let mut config = Config::load()?;
    if let Some(path) = args.doc_db {
        config.store.db_path = path;
    }
    if let Some(n) = args.n_docs {
        config.scoring.n_docs = n;
    }
    if let Some(n) = args.num_workers {
        config.scoring.num_workers = Some(n);
    }
    if let Some(mode) = args.match_mode {
        config.scoring.match_mode = mode;
    }
    if let Some(tokenizer) = args.tokenizer {
        config.scoring.tokenizer = tokenizer;
    }
    if let Some(dir) = args.out_dir {
        config.output.out_dir = dir;
    }
    config.validate()?;

    let k = config.scoring.n_docs;
    let num_workers = config.num_workers();
    let db = Db::new(config.db_path());

    let records: Vec<QuestionRecord> = jsonl::read_jsonl(&args.dataset)
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;
    log::info!("Loaded {} questions from {}", records.len(), args.dataset.display());

    log::info!("Ranking with BM25 over {} (k={})", config.db_path().display(), k);
    let queries: Vec<String> = records.iter().map(|r| r.question.clone()).collect();
    let ranker = Bm25Ranker::new(db.clone());
    let rankings = ranker.batch_closest_docs(queries, k, num_workers).await?;
    let tasks = pair_rankings(records, rankings)?;

    std::fs::create_dir_all(&config.output.out_dir)
        .with_context(|| format!("Failed to create {}", config.output.out_dir.display()))?;
    let outfile = error_file_path(&config.output.out_dir, &args.dataset, args.model.as_deref());
    log::info!("Writing error cases to {}", outfile.display());

    let options = BatchOptions {
        num_workers,
        mode: config.scoring.match_mode,
        channel_capacity: config.scoring.channel_capacity,
    };
    let factory = build_factory(db, config.scoring.tokenizer, config.scoring.doc_cache_capacity);

    let mut next_report = 0;
    let report = score_to_file(tasks, &options, factory, &outfile, |done, total| {
        if done >= next_report || done == total {
            log::info!("{}/{} questions scored", done, total);
            next_report = done + (total / 10).max(1);
        }
    })
    .await?;

    let summary = EvalSummary::new(
        &args.dataset,
        &outfile,
        k,
        &report,
        start.elapsed().as_secs_f64(),
    );
    print!("{}", summary);

    Ok(())
}
