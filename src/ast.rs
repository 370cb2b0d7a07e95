//! Syntax tree nodes produced by the parser and the runtime values the engine
//! reduces them to.
//!
//! [`Node`] is the read-only input of evaluation: a leaf wraps one scanned token,
//! a group is a parenthesised sequence of nodes. [`Value`] is the result:
//! numbers, strings, booleans, pass-through symbols, lists and the
//! [`Value::Unspecified`] marker. Helper functions [`val`], [`sym`] and [`nil`]
//! build values from Rust literals for code and tests.

use crate::token::{Token, TokenKind};

/// A parsed program element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Token),
    Group {
        children: Vec<Node>,
        /// Line of the opening parenthesis
        line: usize,
    },
}

impl Node {
    /// Root node for a sequence of top-level forms: the form itself when there is
    /// exactly one, otherwise a group holding all of them.
    pub fn program(mut forms: Vec<Node>) -> Node {
        if forms.len() == 1
            && let Some(form) = forms.pop()
        {
            return form;
        }
        let line = forms.first().map_or(1, Node::line);
        Node::Group {
            children: forms,
            line,
        }
    }

    pub fn has_children(&self) -> bool {
        matches!(self, Node::Group { .. })
    }

    /// Children of a group; empty for a leaf
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group { children, .. } => children,
            Node::Leaf(_) => &[],
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            Node::Leaf(token) => Some(token),
            Node::Group { .. } => None,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Node::Leaf(token) => token.line,
            Node::Group { line, .. } => *line,
        }
    }

    /// Identifier text of a group's first child, if the group starts with one
    pub fn head_text(&self) -> Option<&str> {
        match self.children().first()?.token()? {
            Token {
                kind: TokenKind::Id,
                data,
                ..
            } => Some(data.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Leaf(token) if token.kind == TokenKind::String => write!(f, "\"{}\"", token.data),
            Node::Leaf(token) => write!(f, "{}", token.data),
            Node::Group { children, .. } => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Decode the escape sequences a scanner kept verbatim in a string token.
/// Unknown escapes decode to the escaped character itself.
pub(crate) fn unescape(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some(other) => decoded.push(other),
            None => decoded.push('\\'),
        }
    }

    decoded
}

/// Runtime value
///
/// To build values, use the helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    /// An identifier that resolved to nothing evaluates to its own text
    Symbol(String),
    List(Vec<Value>),
    /// Result of `define`, `lambda`, `memoize` and of an `if` without an else
    /// branch. Dropped from lists, never emitted, never equal to anything.
    Unspecified,
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(f64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::List(slice.iter().cloned().map(|x| x.into()).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating the empty list
pub fn nil() -> Value {
    Value::List(vec![])
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // f64 Display already omits the fraction of integral values
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl Value {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Value::Unspecified)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) | Value::Symbol(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::List(list) => !list.is_empty(),
            Value::Unspecified => false,
        }
    }

    /// Text of a string or symbol
    pub fn text(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Display form with strings left unquoted
    pub fn plain_text(&self) -> String {
        match self {
            Value::String(s) | Value::Symbol(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Collapse a single-element list to its element
    pub fn pill(self) -> Value {
        match self {
            Value::List(mut list) if list.len() == 1 => list.pop().unwrap_or(Value::Unspecified),
            other => other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // Unspecified never equals anything
            (Value::Unspecified, _) | (_, Value::Unspecified) => false,
            _ => false, // Different variants are never equal
        }
    }
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        // (helper_result, expected_value)
        let test_cases = vec![
            (val(42), Value::Number(42.0)),
            (val(-17), Value::Number(-17.0)),
            (val(2.5), Value::Number(2.5)),
            (val(4294967295u32), Value::Number(4294967295.0)),
            (val(-128i8), Value::Number(-128.0)),
            (val(true), Value::Bool(true)),
            (val("hello"), Value::String("hello".to_owned())),
            (val(""), Value::String(String::new())),
            (sym("square-of"), Value::Symbol("square-of".to_owned())),
            (sym(String::from("test")), Value::Symbol("test".to_owned())),
            (nil(), Value::List(vec![])),
            (
                val([1, 2, 3]),
                Value::List(vec![
                    Value::Number(1.0),
                    Value::Number(2.0),
                    Value::Number(3.0),
                ]),
            ),
            (
                val(vec![sym("foo"), val(42), val("bar"), val(false)]),
                Value::List(vec![
                    Value::Symbol("foo".to_owned()),
                    Value::Number(42.0),
                    Value::String("bar".to_owned()),
                    Value::Bool(false),
                ]),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "Test case {} failed", i + 1);
        }
    }

    #[test]
    fn test_unspecified_values() {
        // Unspecified never equals anything, including itself
        let unspec = Value::Unspecified;
        assert_ne!(unspec, unspec);
        assert_ne!(unspec, Value::Unspecified);
        assert_ne!(unspec, val(0));
        assert!(unspec.is_unspecified());
    }

    #[test]
    fn test_truthiness() {
        let cases = vec![
            (val(1), true),
            (val(-0.5), true),
            (val(0), false),
            (Value::Number(f64::NAN), false),
            (val("x"), true),
            (val(""), false),
            (sym("foo"), true),
            (val(true), true),
            (val(false), false),
            (val([1]), true),
            (nil(), false),
            (Value::Unspecified, false),
        ];

        for (value, expected) in cases {
            assert_eq!(value.is_truthy(), expected, "value: {value:?}");
        }
    }

    #[test]
    fn test_display() {
        let cases = vec![
            (val(25), "25"),
            (val(2.5), "2.5"),
            (val(-3), "-3"),
            (val("hi \"you\"\n"), r#""hi \"you\"\n""#),
            (sym("foo"), "foo"),
            (val(true), "true"),
            (val(vec![sym("a"), val(1), val("b")]), r#"(a 1 "b")"#),
            (nil(), "()"),
            (Value::Unspecified, "#<unspecified>"),
        ];

        for (value, expected) in cases {
            assert_eq!(format!("{value}"), expected);
        }
        assert_eq!(val("x").plain_text(), "x");
        assert_eq!(val(3).plain_text(), "3");
    }

    #[test]
    fn test_pill() {
        assert_eq!(val([7]).pill(), val(7));
        assert_eq!(val([1, 2]).pill(), val([1, 2]));
        assert_eq!(nil().pill(), nil());
        assert_eq!(val(vec![val([5])]).pill(), val([5]));
    }

    #[test]
    fn test_unescape() {
        let cases = vec![
            ("plain", "plain"),
            (r"a\nb", "a\nb"),
            (r"tab\there", "tab\there"),
            (r#"say \"hi\""#, "say \"hi\""),
            (r"it\'s", "it's"),
            (r"back\\slash", "back\\slash"),
            (r"\q", "q"),
            ("trailing\\", "trailing\\"),
        ];

        for (raw, expected) in cases {
            assert_eq!(unescape(raw), expected, "raw: {raw:?}");
        }
    }

    #[test]
    fn test_node_program_and_accessors() {
        let leaf = |kind, data: &str, line| Node::Leaf(Token::new(kind, data, line));
        let form = Node::Group {
            children: vec![leaf(TokenKind::Id, "add", 2), leaf(TokenKind::Number, "1", 2)],
            line: 2,
        };

        assert_eq!(form.head_text(), Some("add"));
        assert!(form.has_children());
        assert_eq!(form.children().len(), 2);
        assert_eq!(format!("{form}"), "(add 1)");

        let single = Node::program(vec![form.clone()]);
        assert_eq!(single, form);

        let root = Node::program(vec![form.clone(), leaf(TokenKind::String, "s", 3)]);
        assert_eq!(root.line(), 2);
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.head_text(), None);
        assert_eq!(format!("{root}"), "((add 1) \"s\")");

        let empty = Node::program(vec![]);
        assert_eq!(empty.children().len(), 0);
        assert_eq!(empty.line(), 1);

        let string_head = Node::Group {
            children: vec![leaf(TokenKind::String, "define", 1)],
            line: 1,
        };
        assert_eq!(string_head.head_text(), None);
        assert!(!leaf(TokenKind::Id, "x", 1).has_children());
    }
}
