//! Correction sessions: walk unexplored error cases and record rewritten
//! questions.
//!
//! The correction file is the error file plus `dirty` / `sq` annotations.
//! A session rewrites it with the explored cases first, then appends every
//! remaining case (annotated or not) when it ends, so repeated sessions pick
//! up where the last one stopped.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use super::display::render_case;
use crate::error::Result;
use crate::eval::ErrorCase;
use crate::jsonl;

/// Marker stored in `dirty` once a case has been looked at.
pub const EXPLORED_MARK: &str = "Y";

/// `<error file without extension>.corr`
pub fn default_correction_path(error_file: &Path) -> PathBuf {
    error_file.with_extension("corr")
}

/// Seed the correction file from the error file when it is missing or empty.
///
/// Returns `true` if the file was (re)created.
pub fn prepare_correction_file(error_file: &Path, corr_file: &Path) -> Result<bool> {
    if jsonl::count_records(corr_file)? > 0 {
        return Ok(false);
    }
    std::fs::copy(error_file, corr_file)?;
    log::info!(
        "Correction file does not exist or is empty. Created {} from {}.",
        corr_file.display(),
        error_file.display()
    );
    Ok(true)
}

/// Correction file split into what was already explored and what was not.
#[derive(Debug, Clone, Default)]
pub struct CorrectionState {
    pub explored: Vec<ErrorCase>,
    pub remaining: Vec<ErrorCase>,
    /// Cases carrying an `sq`, explored or not.
    pub reformulated: usize,
}

impl CorrectionState {
    pub fn from_cases(cases: Vec<ErrorCase>) -> Self {
        let reformulated = cases.iter().filter(|c| c.is_reformulated()).count();
        let (explored, remaining) = cases.into_iter().partition(|c| c.is_explored());
        Self { explored, remaining, reformulated }
    }

    pub fn total(&self) -> usize {
        self.explored.len() + self.remaining.len()
    }
}

/// Load the correction file and rewrite it with the explored cases only.
///
/// The remaining cases live in memory until [`finish_session`] appends them.
pub fn begin_session(corr_file: &Path) -> Result<CorrectionState> {
    log::info!("Loading error cases from {}...", corr_file.display());
    let state = CorrectionState::from_cases(jsonl::read_jsonl(corr_file)?);

    jsonl::write_jsonl(corr_file, &state.explored)?;

    log::info!("Write back {} cases.", state.explored.len());
    log::info!("{} cases loaded.", state.total());
    log::info!(
        "{} cases explored with {} reformulated.",
        state.explored.len(),
        state.reformulated
    );
    log::info!("{} cases need to be explored.", state.remaining.len());
    Ok(state)
}

/// Append the session's cases back to the correction file.
pub fn finish_session(corr_file: &Path, remaining: &[ErrorCase]) -> Result<()> {
    jsonl::append_jsonl(corr_file, remaining)?;
    log::info!("Remaining {} cases saved back to {}.", remaining.len(), corr_file.display());
    Ok(())
}

/// Counts from one interactive pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub explored: usize,
    pub reformulated: usize,
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> Result<Option<String>> {
    write!(out, "{}", text)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "1" | "y" | "yes")
}

/// Interactively walk `cases` in order, marking each one explored and
/// recording a reformulated question when asked to.
///
/// Stops when the user answers `n` to "Continue" or input ends; cases not
/// reached are left untouched.
pub fn correct_cases<R: BufRead, W: Write>(
    cases: &mut [ErrorCase],
    mut input: R,
    out: &mut W,
    color: bool,
) -> Result<SessionStats> {
    let mut stats = SessionStats::default();

    for case in cases.iter_mut() {
        writeln!(out, "\n===============================================\n")?;
        write!(out, "{}", render_case(case, color))?;

        let Some(tag) = prompt(&mut input, out, "Need reformulate: ")? else {
            break;
        };
        if is_yes(&tag) {
            let Some(question) = prompt(&mut input, out, "Reformulated question:\n>> ")? else {
                break;
            };
            case.sq = Some(question.trim().to_string());
            stats.reformulated += 1;
        }
        case.dirty = Some(EXPLORED_MARK.to_string());
        stats.explored += 1;

        match prompt(&mut input, out, "Continue (y/n): ")? {
            Some(c) if c.trim() == "n" => break,
            Some(_) => {}
            None => break,
        }
    }

    log::info!(
        "Reformulated {} cases out of {}. Remains {} cases to explore.",
        stats.reformulated,
        stats.explored,
        cases.len() - stats.explored
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn case(q: &str) -> ErrorCase {
        ErrorCase::new(q.to_string(), vec!["a".to_string()], vec![("d".to_string(), 1.0)])
    }

    fn session(cases: &mut [ErrorCase], script: &str) -> SessionStats {
        let mut out = Vec::new();
        correct_cases(cases, Cursor::new(script.to_string()), &mut out, false).unwrap()
    }

    #[test]
    fn test_default_correction_path() {
        assert_eq!(
            default_correction_path(Path::new("/tmp/dev-default.errs")),
            PathBuf::from("/tmp/dev-default.corr")
        );
    }

    #[test]
    fn test_reformulate_then_stop() {
        let mut cases = vec![case("q0"), case("q1"), case("q2")];
        let stats = session(&mut cases, "y\n  Better question?  \ny\nno\nn\n");

        assert_eq!(stats, SessionStats { explored: 2, reformulated: 1 });
        assert_eq!(cases[0].sq.as_deref(), Some("Better question?"));
        assert_eq!(cases[0].dirty.as_deref(), Some("Y"));
        assert!(cases[1].sq.is_none());
        assert!(cases[1].is_explored());
        assert!(!cases[2].is_explored());
    }

    #[test]
    fn test_yes_variants() {
        for tag in ["1", "Y", "yes", "YES"] {
            let mut cases = vec![case("q")];
            let stats = session(&mut cases, &format!("{}\nnew\ny\n", tag));
            assert_eq!(stats.reformulated, 1, "tag {}", tag);
        }
    }

    #[test]
    fn test_end_of_input_stops_cleanly() {
        let mut cases = vec![case("q0"), case("q1")];
        let stats = session(&mut cases, "n\n");
        // "n" answered the reformulate prompt; input ends at "Continue"
        assert_eq!(stats.explored, 1);
        assert!(!cases[1].is_explored());
    }

    #[test]
    fn test_session_roundtrip_on_disk() {
        let dir = TempDir::new().unwrap();
        let errs = dir.path().join("dev-default.errs");
        jsonl::write_jsonl(&errs, &[case("q0"), case("q1"), case("q2")]).unwrap();
        let corr = default_correction_path(&errs);

        assert!(prepare_correction_file(&errs, &corr).unwrap());
        assert!(!prepare_correction_file(&errs, &corr).unwrap());

        // first session explores one case and reformulates it
        let mut state = begin_session(&corr).unwrap();
        assert_eq!(state.remaining.len(), 3);
        session(&mut state.remaining, "y\nfixed q0\nn\n");
        finish_session(&corr, &state.remaining).unwrap();

        // second session sees it as explored
        let state = begin_session(&corr).unwrap();
        assert_eq!(state.explored.len(), 1);
        assert_eq!(state.explored[0].sq.as_deref(), Some("fixed q0"));
        assert_eq!(state.remaining.len(), 2);
        assert_eq!(state.reformulated, 1);

        // begin_session rewrote the file with explored cases only
        let on_disk: Vec<ErrorCase> = jsonl::read_jsonl(&corr).unwrap();
        assert_eq!(on_disk.len(), 1);
        finish_session(&corr, &state.remaining).unwrap();
        assert_eq!(jsonl::count_records(&corr).unwrap(), 3);
    }

    #[test]
    fn test_prepare_replaces_empty_file() {
        let dir = TempDir::new().unwrap();
        let errs = dir.path().join("x.errs");
        let corr = dir.path().join("x.corr");
        jsonl::write_jsonl(&errs, &[case("q0")]).unwrap();
        std::fs::write(&corr, "").unwrap();

        assert!(prepare_correction_file(&errs, &corr).unwrap());
        assert_eq!(jsonl::count_records(&corr).unwrap(), 1);
    }
}
