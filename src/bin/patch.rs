use anyhow::{Context, Result};
use clap::Parser;
use qacurate::curate::{patch_dataset, reformulation_map};
use qacurate::eval::{ErrorCase, QuestionRecord};
use qacurate::jsonl;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patch")]
#[command(about = "Replace dataset questions with their reformulations")]
struct Args {
    /// Dataset to patch
    dataset: PathBuf,

    /// Correction file with `sq` annotations
    corr_file: PathBuf,

    /// Patched dataset
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let records: Vec<QuestionRecord> = jsonl::read_jsonl(&args.dataset)
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;
    log::info!("Loaded {} questions from {}", records.len(), args.dataset.display());

    let cases: Vec<ErrorCase> = jsonl::read_jsonl(&args.corr_file)
        .with_context(|| format!("Failed to read {}", args.corr_file.display()))?;
    let map = reformulation_map(&cases);
    log::info!("{} reformulation pairs from {}", map.len(), args.corr_file.display());

    let (patched, replaced) = patch_dataset(records, &map);
    jsonl::write_jsonl(&args.output, &patched)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    log::info!("Replaced {} questions, saved to {}", replaced, args.output.display());
    Ok(())
}
