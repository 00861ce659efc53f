//! Error files that only appear once a batch has succeeded.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::coordinator::{run_batch, BatchOptions, BatchReport, ContextFactory};
use super::types::RankedResult;
use crate::error::{QacurateError, Result};

/// An error file being written under a temporary name next to its
/// destination. Dropping it without [`ErrorFile::commit`] removes it.
pub struct ErrorFile {
    dest: PathBuf,
    tmp: NamedTempFile,
}

impl ErrorFile {
    pub fn create(dest: &Path) -> Result<Self> {
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        log::debug!("Staging {} at {}", dest.display(), tmp.path().display());
        Ok(Self {
            dest: dest.to_path_buf(),
            tmp,
        })
    }

    /// A second handle on the staged file, for the batch writer.
    pub fn writer(&self) -> Result<File> {
        Ok(self.tmp.reopen()?)
    }

    /// Move the staged file to its destination.
    pub fn commit(self) -> Result<PathBuf> {
        self.tmp
            .persist(&self.dest)
            .map_err(|e| QacurateError::Io(e.error))?;
        Ok(self.dest)
    }
}

/// [`run_batch`] into `dest`; nothing is left at `dest` if the batch fails.
pub async fn score_to_file<P>(
    tasks: Vec<RankedResult>,
    options: &BatchOptions,
    factory: ContextFactory,
    dest: &Path,
    on_progress: P,
) -> Result<BatchReport>
where
    P: FnMut(usize, usize),
{
    let staged = ErrorFile::create(dest)?;
    let report = run_batch(tasks, options, factory, staged.writer()?, on_progress).await?;
    staged.commit()?;
    Ok(report)
}
