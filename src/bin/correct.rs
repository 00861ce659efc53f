use anyhow::{Context, Result};
use clap::Parser;
use qacurate::curate::{
    begin_session, correct_cases, default_correction_path, finish_session,
    prepare_correction_file,
};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "correct")]
#[command(about = "Walk unexplored error cases and record reformulated questions")]
struct Args {
    /// Error file written by eval-err
    error_file: PathBuf,

    /// Correction file (default: <error file>.corr)
    #[arg(long)]
    corr_file: Option<PathBuf>,

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
    let corr_file = args
        .corr_file
        .unwrap_or_else(|| default_correction_path(&args.error_file));

    prepare_correction_file(&args.error_file, &corr_file)
        .with_context(|| format!("Failed to prepare {}", corr_file.display()))?;

    let mut state = begin_session(&corr_file)?;

    let stdout = std::io::stdout();
    let color = !args.no_color && stdout.is_terminal();
    let session = correct_cases(
        &mut state.remaining,
        std::io::stdin().lock(),
        &mut stdout.lock(),
        color,
    );

    // Save whatever was reached even if the session itself failed.
    finish_session(&corr_file, &state.remaining)
        .with_context(|| format!("Failed to save {}", corr_file.display()))?;
    session?;

    Ok(())
}
