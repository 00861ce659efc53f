//! Deciding whether a document's text contains a gold answer.
//!
//! Two strategies:
//! - `string`: token-level exact match of any answer against a sliding window
//!   over the document's uncased tokens.
//! - `regex`: the first answer is a pattern, searched case-insensitively over
//!   the whole normalized document.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::{normalize, Tokenizer};

/// How answers are compared against document text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    String,
    Regex,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::String => write!(f, "string"),
            MatchMode::Regex => write!(f, "regex"),
        }
    }
}

/// True if `needle` occurs as a contiguous run inside `haystack`.
///
/// An empty needle never matches.
pub fn contains_token_window(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// A compiled answer pattern.
///
/// Plain patterns run on `regex`. Patterns it rejects (lookaround,
/// backreferences) fall back to `fancy_regex` with the same flags.
#[derive(Debug, Clone)]
pub enum AnswerPattern {
    Plain(Regex),
    Fancy(fancy_regex::Regex),
}

impl AnswerPattern {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            AnswerPattern::Plain(re) => re.is_match(text),
            AnswerPattern::Fancy(re) => re.is_match(text).unwrap_or_else(|e| {
                log::warn!("Answer pattern {:?} gave up, treating as no match: {}", re.as_str(), e);
                false
            }),
        }
    }
}

/// Compile an answer pattern: case-insensitive, multi-line, Unicode-aware.
///
/// A pattern neither engine accepts is logged and yields `None`.
pub fn compile_answer_pattern(pattern: &str) -> Option<AnswerPattern> {
    let plain_err = match RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .unicode(true)
        .build()
    {
        Ok(re) => return Some(AnswerPattern::Plain(re)),
        Err(e) => e,
    };
    match fancy_regex::Regex::new(&format!("(?im){}", pattern)) {
        Ok(re) => Some(AnswerPattern::Fancy(re)),
        Err(e) => {
            log::warn!(
                "Invalid answer pattern {:?}, treating as no match: {} / {}",
                pattern,
                plain_err,
                e
            );
            None
        }
    }
}

/// True if `pattern` compiles and occurs anywhere in `text`.
pub fn regex_match(text: &str, pattern: &str) -> bool {
    compile_answer_pattern(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// An answer set preprocessed once per question, then tested against each
/// candidate document.
#[derive(Debug, Clone)]
pub enum PreparedAnswers {
    /// Uncased token sequences, one per answer string.
    Tokens(Vec<Vec<String>>),
    /// Compiled first answer; `None` when it failed to compile.
    Pattern(Option<AnswerPattern>),
}

impl PreparedAnswers {
    pub fn new(answers: &[String], mode: MatchMode, tokenizer: &dyn Tokenizer) -> Self {
        match mode {
            MatchMode::String => PreparedAnswers::Tokens(
                answers
                    .iter()
                    .map(|a| tokenizer.tokenize(&normalize(a)).words(true))
                    .collect(),
            ),
            // Only the first answer is used in regex mode
            MatchMode::Regex => PreparedAnswers::Pattern(
                answers
                    .first()
                    .and_then(|a| compile_answer_pattern(&normalize(a))),
            ),
        }
    }

    /// Test already-normalized document text.
    pub fn matches_normalized(&self, text: &str, tokenizer: &dyn Tokenizer) -> bool {
        match self {
            PreparedAnswers::Tokens(answers) => {
                if answers.iter().all(|a| a.is_empty()) {
                    return false;
                }
                let words = tokenizer.tokenize(text).words(true);
                answers.iter().any(|a| contains_token_window(&words, a))
            }
            PreparedAnswers::Pattern(Some(re)) => re.is_match(text),
            PreparedAnswers::Pattern(None) => false,
        }
    }

    /// Test raw document text.
    pub fn matches(&self, text: &str, tokenizer: &dyn Tokenizer) -> bool {
        self.matches_normalized(&normalize(text), tokenizer)
    }
}
