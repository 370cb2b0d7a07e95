//! Tokens produced by the scanners and the [`Scanner`] seam between source text
//! and the parser.
//!
//! Two scanners implement the trait: the line-tracking state machine in
//! [`crate::lexer`] (used by default) and the combinator-based splitter in
//! [`crate::tokenizer`]. The parser accepts the output of either.

use crate::Diagnostic;

/// Kind of a scanned token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Open,
    Close,
    String,
    Number,
    Id,
    /// A run of whitespace or statement delimiters
    Space,
    Comment,
}

/// An immutable scanned token.
///
/// `data` holds the raw text: string tokens exclude their quotes but keep escape
/// sequences undecoded (`\n` is stored as a backslash followed by `n`).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub data: String,
    /// 1-based line on which the token starts
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, data: impl Into<String>, line: usize) -> Self {
        Token {
            kind,
            data: data.into(),
            line,
        }
    }

    /// Tokens the parser ignores
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Comment)
    }
}

/// Converts source text into a token stream
pub trait Scanner {
    fn scan(&self, source: &str) -> Result<Vec<Token>, Diagnostic>;
}

/// Decide whether a bare word is a numeric literal.
///
/// The word must start with a digit, or with a sign or decimal point followed by
/// a digit, and parse as a float. This keeps words such as `inf`, `nan` or `-`
/// as identifiers.
pub(crate) fn is_numeric_word(word: &str) -> bool {
    let mut chars = word.chars();
    let starts_numeric = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+' | '-' | '.') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
        _ => false,
    };

    starts_numeric && word.parse::<f64>().is_ok()
}

/// Classify a finished bare word as an identifier or a number
pub(crate) fn word_kind(word: &str) -> TokenKind {
    if is_numeric_word(word) {
        TokenKind::Number
    } else {
        TokenKind::Id
    }
}
