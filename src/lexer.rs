//! Line-tracking lexical state machine.
//!
//! The lexer walks the source one character at a time and switches between four
//! states. Each state decides what the current character means and whether the
//! buffered text is complete:
//!
//! - `Identifier`: accumulates a bare word until a delimiter, quote, comment
//!   marker or parenthesis ends it
//! - `String`: accumulates everything up to the matching quote, keeping escape
//!   sequences as written
//! - `Comment`: runs from `#` to the next `;` or newline
//! - `Delimiter`: swallows a run of whitespace / `;` and emits one `Space` token
//!
//! Newlines are statement delimiters and advance the line counter, so every token
//! records the 1-based line on which it started.

use crate::Diagnostic;
use crate::token::{Scanner, Token, TokenKind, word_kind};

/// Default scanner, see the module documentation
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexer;

impl Scanner for Lexer {
    fn scan(&self, source: &str) -> Result<Vec<Token>, Diagnostic> {
        Machine::new().run(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Identifier,
    /// Inside a string opened by the given quote character
    String(char),
    Comment,
    Delimiter,
}

fn is_delimiter(c: char) -> bool {
    c == ';' || c.is_whitespace()
}

struct Machine {
    state: State,
    tokens: Vec<Token>,
    buffer: String,
    line: usize,
    /// Line on which the buffered text started
    start_line: usize,
}

impl Machine {
    fn new() -> Self {
        Machine {
            state: State::Identifier,
            tokens: Vec::new(),
            buffer: String::new(),
            line: 1,
            start_line: 1,
        }
    }

    fn run(mut self, source: &str) -> Result<Vec<Token>, Diagnostic> {
        let mut chars = source.chars().peekable();

        while let Some(&c) = chars.peek() {
            match self.state {
                State::Identifier => {
                    chars.next();
                    match c {
                        '"' | '\'' => {
                            self.flush_word();
                            self.begin(State::String(c));
                        }
                        '#' => {
                            self.flush_word();
                            self.begin(State::Comment);
                        }
                        '(' => {
                            self.flush_word();
                            self.tokens.push(Token::new(TokenKind::Open, "(", self.line));
                        }
                        ')' => {
                            self.flush_word();
                            self.tokens.push(Token::new(TokenKind::Close, ")", self.line));
                        }
                        '\\' => {
                            if self.buffer.is_empty() {
                                self.start_line = self.line;
                            }
                            self.buffer.push('\\');
                            if let Some(escaped) = chars.next() {
                                self.store(escaped);
                            }
                        }
                        c if is_delimiter(c) => {
                            self.flush_word();
                            self.begin(State::Delimiter);
                            self.store(c);
                        }
                        c => {
                            if self.buffer.is_empty() {
                                self.start_line = self.line;
                            }
                            self.buffer.push(c);
                        }
                    }
                }

                State::String(quote) => {
                    chars.next();
                    if c == quote {
                        self.flush(TokenKind::String);
                        self.state = State::Identifier;
                    } else if c == '\\' {
                        self.buffer.push('\\');
                        match chars.next() {
                            Some(escaped) => self.store(escaped),
                            None => break, // reported as unterminated below
                        }
                    } else {
                        self.store(c);
                    }
                }

                State::Comment => {
                    chars.next();
                    if c == ';' || c == '\n' {
                        self.flush(TokenKind::Comment);
                        self.advance_line(c);
                        self.state = State::Identifier;
                    } else {
                        self.buffer.push(c);
                    }
                }

                // Does not consume the character that ends the run
                State::Delimiter => {
                    if is_delimiter(c) {
                        chars.next();
                        self.store(c);
                    } else {
                        self.flush(TokenKind::Space);
                        self.state = State::Identifier;
                    }
                }
            }
        }

        match self.state {
            State::Identifier => self.flush_word(),
            State::Delimiter => self.flush(TokenKind::Space),
            State::Comment => self.flush(TokenKind::Comment),
            State::String(_) => {
                return Err(Diagnostic::syntax("Unterminated string literal").at(self.start_line));
            }
        }

        Ok(self.tokens)
    }

    /// Enter a state that buffers text starting at the current line
    fn begin(&mut self, state: State) {
        self.state = state;
        self.start_line = self.line;
    }

    /// Buffer a character, counting it if it ends a line
    fn store(&mut self, c: char) {
        self.buffer.push(c);
        self.advance_line(c);
    }

    fn advance_line(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
        }
    }

    fn flush_word(&mut self) {
        if !self.buffer.is_empty() {
            let kind = word_kind(&self.buffer);
            self.flush(kind);
        }
    }

    /// Emit the buffer as a token. Strings and comments are emitted even when
    /// empty so that `""` survives as a literal.
    fn flush(&mut self, kind: TokenKind) {
        let data = std::mem::take(&mut self.buffer);
        self.tokens.push(Token::new(kind, data, self.start_line));
    }
}
