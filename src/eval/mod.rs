//! Retriever error analysis: does any top-k candidate contain the gold answer?

pub mod coordinator;
pub mod matcher;
pub mod output;
pub mod scorer;
pub mod summary;
pub mod types;

pub use coordinator::{run_batch, BatchOptions, BatchReport, ContextFactory};
pub use matcher::{contains_token_window, regex_match, AnswerPattern, MatchMode, PreparedAnswers};
pub use output::{score_to_file, ErrorFile};
pub use scorer::{score_task, TaskScore, WorkerContext};
pub use summary::{error_file_path, EvalSummary};
pub use types::{pair_rankings, ErrorCase, MatchResult, Outcome, QuestionRecord, RankedResult};
