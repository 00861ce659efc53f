//! Human-readable end-of-run statistics and output naming.

use std::fmt;
use std::path::{Path, PathBuf};

use super::coordinator::BatchReport;

/// Final statistics of an error-scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSummary {
    pub filename: String,
    pub outfile: String,
    pub total: usize,
    pub k: usize,
    pub misses: usize,
    pub failures: usize,
    pub elapsed_secs: f64,
}

impl EvalSummary {
    pub fn new(dataset: &Path, outfile: &Path, k: usize, report: &BatchReport, elapsed_secs: f64) -> Self {
        Self {
            filename: file_name(dataset),
            outfile: outfile.display().to_string(),
            total: report.total(),
            k,
            misses: report.misses,
            failures: report.failures,
            elapsed_secs,
        }
    }

    pub fn miss_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.misses as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{:-<50}", "")?;
        writeln!(f, "{}", self.filename)?;
        writeln!(f, "{}", self.outfile)?;
        writeln!(f, "Examples:\t\t\t{}", self.total)?;
        writeln!(f, "Mismatches in top {}:\t\t{}", self.k, self.misses)?;
        writeln!(f, "Mismatch % in top {}:\t\t{:.2}", self.k, self.miss_percentage())?;
        if self.failures > 0 {
            writeln!(f, "Lookup failures:\t\t{}", self.failures)?;
        }
        writeln!(f, "Total time:\t\t\t{:.4} (s)", self.elapsed_secs)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<out_dir>/<dataset stem>-<model stem>.errs`; model defaults to `default`.
pub fn error_file_path(out_dir: &Path, dataset: &Path, model: Option<&Path>) -> PathBuf {
    let model = model.map(file_stem).filter(|m| !m.is_empty());
    let name = format!(
        "{}-{}.errs",
        file_stem(dataset),
        model.as_deref().unwrap_or("default")
    );
    out_dir.join(name)
}
