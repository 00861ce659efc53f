//! Word tokenizers.
//!
//! - `regexp` (default): numbers with separators (`3,500`, `2.5`), hyphenated
//!   words, abbreviations, titles and contractions stay whole; quotes, dashes
//!   and ellipses are normalized.
//! - `simple`: runs of letters/digits/marks, or single non-space symbols.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QacurateError, Result};

const ALPHA_NUM: &str = r"[\p{L}\p{N}\p{M}]+";
const NON_WS: &str = r"[^\p{Z}\p{C}]";

const DIGIT: &str = r"\p{Nd}+(?:[:\.,]\p{Nd}+)*";
const TITLE: &str = r"(?:dr|esq|hon|jr|mr|mrs|ms|prof|rev|sr|st|rt|messrs|mmes|msgr)\.(?=\p{Z})";
const ABBRV: &str = r"(?:\p{L}\.){2,}(?=\p{Z}|$)";
const NEGATION: &str = r"(?:(?!n't)[\p{L}\p{N}\p{M}])+(?=n't)|n't";
const CONTRACTION1: &str = r"can(?=not\b)";
const CONTRACTION2: &str = r"'(?:[tsdm]|re|ve|ll)\b";
const START_DQUOTE: &str = "(?:^|(?<=[\\p{Z}\\(\\[\\{<]))(?:``|[\"\u{93}\u{201C}\u{AB}])(?!\\p{Z})";
const START_SQUOTE: &str = "(?:^|(?<=[\\p{Z}\\(\\[\\{<]))['\u{91}\u{2018}\u{201B}\u{2039}](?!\\p{Z})";
const END_DQUOTE: &str = "(?<!\\p{Z})(?:''|[\"\u{94}\u{201D}\u{BB}])";
const END_SQUOTE: &str = "(?<!\\p{Z})['\u{92}\u{2019}\u{203A}]";
const DASH: &str = "--|[\u{96}\u{97}]";
const ELLIPSES: &str = "\\.\\.\\.|\u{2026}";
const PUNCT: &str = r"\p{P}";

/// Tokenized text: owns the source buffer, tokens are byte spans into it.
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    buffer: String,
    spans: Vec<(usize, usize)>,
}

impl Tokens {
    pub fn new(buffer: String, spans: Vec<(usize, usize)>) -> Self {
        Self { buffer, spans }
    }

    /// Iterator over token slices as they appear in the text.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans.iter().map(|&(s, e)| &self.buffer[s..e])
    }

    /// Token texts, lowercased when `uncased` is set.
    pub fn words(&self, uncased: bool) -> Vec<String> {
        self.iter()
            .map(|t| if uncased { t.to_lowercase() } else { t.to_string() })
            .collect()
    }

    /// Build from token texts that need not appear verbatim in any source.
    pub fn from_pieces<'a, I: IntoIterator<Item = &'a str>>(pieces: I) -> Self {
        let mut buffer = String::new();
        let mut spans = Vec::new();
        for piece in pieces {
            let start = buffer.len();
            buffer.push_str(piece);
            spans.push((start, buffer.len()));
        }
        Self { buffer, spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Splits text into word tokens.
///
/// Each scoring worker owns its own instance, so implementations need `Send`
/// but not `Sync`.
pub trait Tokenizer: Send {
    fn tokenize(&self, text: &str) -> Tokens;
}

/// Which [`Tokenizer`] STRING matching uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    #[default]
    Regexp,
    Simple,
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerKind::Regexp => write!(f, "regexp"),
            TokenizerKind::Simple => write!(f, "simple"),
        }
    }
}

/// Build the tokenizer for `kind`; compile failures are worker-init errors.
pub fn build_tokenizer(kind: TokenizerKind) -> Result<Box<dyn Tokenizer>> {
    Ok(match kind {
        TokenizerKind::Regexp => Box::new(RegexpTokenizer::new()?),
        TokenizerKind::Simple => Box::new(SimpleTokenizer::new()?),
    })
}

/// Regex tokenizer: alphanumeric runs (combining marks included) are one
/// token, every other non-whitespace, non-control character is its own token.
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    pattern: Regex,
}

impl SimpleTokenizer {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(&format!("({})|({})", ALPHA_NUM, NON_WS))
            .map_err(|e| QacurateError::WorkerInit(format!("tokenizer pattern: {}", e)))?;
        Ok(Self { pattern })
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Tokens {
        let spans = self
            .pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        Tokens::new(text.to_string(), spans)
    }
}

/// Tokenizer aware of numbers, hyphenation, abbreviations and contractions.
///
/// Needs lookaround, so it runs on `fancy_regex`. Quote, dash and ellipsis
/// variants are rewritten to one canonical form each.
#[derive(Debug, Clone)]
pub struct RegexpTokenizer {
    pattern: fancy_regex::Regex,
}

impl RegexpTokenizer {
    pub fn new() -> Result<Self> {
        let hyphen = format!("{a}(?:[-\u{58A}\u{2010}\u{2011}]{a})+", a = ALPHA_NUM);
        let alternatives = [
            ("digit", DIGIT),
            ("title", TITLE),
            ("abbr", ABBRV),
            ("neg", NEGATION),
            ("hyph", hyphen.as_str()),
            ("contr1", CONTRACTION1),
            ("alphanum", ALPHA_NUM),
            ("contr2", CONTRACTION2),
            ("sdquote", START_DQUOTE),
            ("edquote", END_DQUOTE),
            ("ssquote", START_SQUOTE),
            ("esquote", END_SQUOTE),
            ("dash", DASH),
            ("ellipses", ELLIPSES),
            ("punct", PUNCT),
            ("nonws", NON_WS),
        ];
        let body = alternatives
            .iter()
            .map(|(name, re)| format!("(?P<{}>{})", name, re))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = fancy_regex::Regex::new(&format!("(?im){}", body))
            .map_err(|e| QacurateError::WorkerInit(format!("tokenizer pattern: {}", e)))?;
        Ok(Self { pattern })
    }
}

impl Tokenizer for RegexpTokenizer {
    fn tokenize(&self, text: &str) -> Tokens {
        let mut pieces: Vec<&str> = Vec::new();
        for caps in self.pattern.captures_iter(text) {
            let caps = match caps {
                Ok(caps) => caps,
                Err(e) => {
                    log::warn!("tokenizer stopped early: {}", e);
                    break;
                }
            };
            let Some(whole) = caps.get(0) else { continue };
            let piece = if caps.name("sdquote").is_some() {
                "``"
            } else if caps.name("edquote").is_some() {
                "''"
            } else if caps.name("ssquote").is_some() {
                "`"
            } else if caps.name("esquote").is_some() {
                "'"
            } else if caps.name("dash").is_some() {
                "--"
            } else if caps.name("ellipses").is_some() {
                "..."
            } else {
                whole.as_str()
            };
            pieces.push(piece);
        }
        Tokens::from_pieces(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        SimpleTokenizer::new().unwrap().tokenize(text).words(true)
    }

    #[test]
    fn test_punctuation_is_separate_token() {
        assert_eq!(words("Paris, France."), vec!["paris", ",", "france", "."]);
    }

    #[test]
    fn test_cased_words_preserved() {
        let tokens = SimpleTokenizer::new().unwrap().tokenize("New York City");
        assert_eq!(tokens.words(false), vec!["New", "York", "City"]);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_whitespace_variants_collapse() {
        assert_eq!(words("  New\tYork\n\nCity "), vec!["new", "york", "city"]);
    }

    #[test]
    fn test_combining_marks_stay_in_token() {
        assert_eq!(words("cafe\u{301} au lait"), vec!["cafe\u{301}", "au", "lait"]);
    }

    #[test]
    fn test_digits_and_symbols() {
        assert_eq!(words("$1,000"), vec!["$", "1", ",", "000"]);
    }

    fn regexp_words(text: &str) -> Vec<String> {
        RegexpTokenizer::new().unwrap().tokenize(text).words(true)
    }

    #[test]
    fn test_regexp_keeps_numbers_whole() {
        assert_eq!(regexp_words("about 3,500 people"), vec!["about", "3,500", "people"]);
        assert_eq!(regexp_words("2.5 million"), vec!["2.5", "million"]);
        assert_eq!(regexp_words("at 10:30."), vec!["at", "10:30", "."]);
    }

    #[test]
    fn test_regexp_keeps_hyphenated_words() {
        assert_eq!(regexp_words("New-York based"), vec!["new-york", "based"]);
    }

    #[test]
    fn test_regexp_abbreviations_and_titles() {
        assert_eq!(regexp_words("the U.S. army"), vec!["the", "u.s.", "army"]);
        assert_eq!(regexp_words("Dr. Who"), vec!["dr.", "who"]);
    }

    #[test]
    fn test_regexp_contractions() {
        assert_eq!(regexp_words("don't"), vec!["do", "n't"]);
        assert_eq!(regexp_words("cannot"), vec!["can", "not"]);
        assert_eq!(regexp_words("it's"), vec!["it", "'s"]);
    }

    #[test]
    fn test_regexp_quotes_and_dashes_normalized() {
        assert_eq!(
            regexp_words("\u{201C}hi\u{201D} -- wait\u{2026}"),
            vec!["``", "hi", "''", "--", "wait", "..."]
        );
    }

    #[test]
    fn test_build_tokenizer_kinds() {
        let regexp = build_tokenizer(TokenizerKind::Regexp).unwrap();
        let simple = build_tokenizer(TokenizerKind::Simple).unwrap();
        assert_eq!(regexp.tokenize("3,500").len(), 1);
        assert_eq!(simple.tokenize("3,500").len(), 3);
        assert_eq!(TokenizerKind::default(), TokenizerKind::Regexp);
    }

    #[test]
    fn test_empty_input() {
        let tokens = SimpleTokenizer::new().unwrap().tokenize("   ");
        assert!(tokens.is_empty());
    }
}
