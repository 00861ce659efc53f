//! Text canonicalization and tokenization shared by the scorer and the tools.

pub mod tokenizer;

pub use tokenizer::{build_tokenizer, RegexpTokenizer, SimpleTokenizer, Tokenizer, TokenizerKind, Tokens};

use unicode_normalization::UnicodeNormalization;

/// Canonicalize text to Unicode NFD.
///
/// Document text and answers both pass through this before tokenizing or
/// regex matching, so composed and decomposed spellings compare equal.
pub fn normalize(text: &str) -> String {
    text.nfd().collect()
}
