use anyhow::{Context, Result};
use clap::Parser;
use qacurate::curate::corrections_to_dataset;
use qacurate::eval::ErrorCase;
use qacurate::jsonl;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "corr2dataset")]
#[command(about = "Turn a correction file into a question/answer dataset")]
struct Args {
    /// Correction file
    corr_file: PathBuf,

    /// Dataset to write
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let cases: Vec<ErrorCase> = jsonl::read_jsonl(&args.corr_file)
        .with_context(|| format!("Failed to read {}", args.corr_file.display()))?;
    let dataset = corrections_to_dataset(&cases);
    let reformulated = cases.iter().filter(|c| c.sq.is_some()).count();
    let empty = cases.iter().filter(|c| c.sq.as_deref() == Some("")).count();
    if empty > 0 {
        log::warn!("{} cases carry an empty sq and are written with an empty question", empty);
    }

    jsonl::write_jsonl(&args.output, &dataset)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    log::info!(
        "Wrote {} questions ({} reformulated) to {}",
        dataset.len(),
        reformulated,
        args.output.display()
    );
    Ok(())
}
