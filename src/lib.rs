//! foldlisp - a small Lisp front end with two execution modes
//!
//! This crate scans, parses and evaluates a minimal S-expression language. The same
//! evaluation engine runs in two modes:
//!
//! - **interpreting**: the program is reduced to a runtime [`ast::Value`]
//! - **compiling**: every top-level form is constant-folded and recorded as a single
//!   `PUSH` operation in an [`opcodes::Opcodes`] sequence
//!
//! ```text
//! (define square-of x (* x x))   ; user function with one positional parameter
//! (square-of 5)                  ; 25
//! (if (< 1 2 3) "yes" "no")      ; "yes" - relations chain over consecutive pairs
//! (foo)                          ; foo - unknown words pass through as symbols
//! ```
//!
//! ## Language summary
//!
//! - Special forms: `define`, `if`, and the reserved heads `lambda` / `memoize`
//! - Builtins: variadic arithmetic, bitwise and relational operators with verbose
//!   aliases (`add`, `smaller`, `not`, ...), plus `zero`, `square` and `print`
//! - Any other head builds a list; a single-element list collapses to its element
//! - Unknown identifiers are never an error: they evaluate to their own text
//!
//! ## Errors
//!
//! Every failure is a [`Diagnostic`] returned on the `Result` channel. Diagnostics
//! pick up the nearest known source line while they propagate outwards.
//!
//! ## Modules
//!
//! - `token`, `lexer`, `tokenizer`: source text to token stream
//! - `parser`: token stream to [`ast::Node`] tree
//! - `definitions`: definition table and parameter environments
//! - `builtinops`: the builtin operator library
//! - `opcodes`: emission sequence and compile-time symbol table
//! - `evaluator`: the evaluation engine and the [`Engine`] entry points

use thiserror::Error;

/// Maximum nesting depth accepted by the parser
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum nesting of user function calls before evaluation is aborted with a
/// [`DiagnosticKind::Limit`] diagnostic. Nested forms do not count; their depth
/// is bounded by [`MAX_PARSE_DEPTH`].
pub const MAX_EVAL_DEPTH: usize = 1000;

/// Category of a [`Diagnostic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Malformed special forms, arity violations, unbalanced parentheses,
    /// name collisions
    Syntax,
    /// A builtin received an operand it cannot operate on
    Type,
    /// A configured depth limit was exceeded
    Limit,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Syntax => write!(f, "SyntaxError"),
            DiagnosticKind::Type => write!(f, "TypeError"),
            DiagnosticKind::Limit => write!(f, "LimitError"),
        }
    }
}

/// A failure detected while scanning, parsing or evaluating
///
/// The line is left unset when the detecting code does not know it (builtins
/// never do) and is filled in by [`Diagnostic::after`] as the diagnostic travels
/// back up the evaluation stack.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}{}", line_suffix(.line))]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: Option<usize>,
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Syntax, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Type, message)
    }

    pub fn limit(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Limit, message)
    }

    /// Attach a line, replacing whatever was there
    pub fn at(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach a line only if none is recorded yet.
    ///
    /// The first line recorded wins, so the innermost node that knows its
    /// position determines where the diagnostic points.
    pub fn after(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }
}

pub mod ast;
pub mod builtinops;
pub mod definitions;
pub mod evaluator;
pub mod lexer;
pub mod opcodes;
pub mod parser;
pub mod token;
pub mod tokenizer;

pub use evaluator::{Engine, EngineConfig, Mode, Redefinition, compile_text, evaluate_text};
