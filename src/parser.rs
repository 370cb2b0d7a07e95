//! Token stream to syntax tree.
//!
//! Whitespace and comment tokens are skipped; every `(` opens a new group
//! recorded with the line of the parenthesis. Groups are built on an explicit
//! stack, so the nesting limit is a configured bound rather than a property of
//! the call stack.

use crate::Diagnostic;
use crate::ast::Node;
use crate::token::{Token, TokenKind};

/// Parse the top-level forms of a program
pub fn parse_program(tokens: &[Token], max_depth: usize) -> Result<Vec<Node>, Diagnostic> {
    let mut forms = Vec::new();
    // Open groups, innermost last, with the line of their opening parenthesis
    let mut open: Vec<(Vec<Node>, usize)> = Vec::new();

    for token in tokens.iter().filter(|t| !t.is_trivia()) {
        let node = match token.kind {
            TokenKind::Open => {
                if open.len() >= max_depth {
                    return Err(Diagnostic::limit(format!(
                        "Expression too deeply nested (max depth: {max_depth})"
                    ))
                    .at(token.line));
                }
                open.push((Vec::new(), token.line));
                continue;
            }
            TokenKind::Close => {
                let Some((children, line)) = open.pop() else {
                    return Err(Diagnostic::syntax("Unexpected closing parenthesis").at(token.line));
                };
                Node::Group { children, line }
            }
            _ => Node::Leaf(token.clone()),
        };

        match open.last_mut() {
            Some((siblings, _)) => siblings.push(node),
            None => forms.push(node),
        }
    }

    if let Some((_, line)) = open.first() {
        return Err(Diagnostic::syntax("Unclosed parenthesis").at(*line));
    }

    Ok(forms)
}

/// Parse a program into its root node, see [`Node::program`]
pub fn parse(tokens: &[Token], max_depth: usize) -> Result<Node, Diagnostic> {
    parse_program(tokens, max_depth).map(Node::program)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::token::Scanner;
    use crate::{DiagnosticKind, MAX_PARSE_DEPTH};

    fn parse_text(source: &str) -> Result<Vec<Node>, Diagnostic> {
        let tokens = Lexer.scan(source).unwrap();
        parse_program(&tokens, MAX_PARSE_DEPTH)
    }

    /// Render parsed forms back to text for compact comparisons
    fn render(source: &str) -> Vec<String> {
        parse_text(source)
            .unwrap()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    #[test]
    fn test_forms() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("", vec![]),
            ("   # only a comment", vec![]),
            ("42", vec!["42"]),
            ("(+ 1 2)", vec!["(+ 1 2)"]),
            ("()", vec!["()"]),
            ("(a (b (c)))", vec!["(a (b (c)))"]),
            ("(define a 1)\n(a)", vec!["(define a 1)", "(a)"]),
            ("(print \"hi there\") x", vec!["(print \"hi there\")", "x"]),
            ("(a # comment\n b)", vec!["(a b)"]),
        ];

        for (source, expected) in cases {
            assert_eq!(render(source), expected, "source: {source:?}");
        }
    }

    #[test]
    fn test_group_lines() {
        let forms = parse_text("(a\n  (b)\n)\n\n(c)").unwrap();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].line(), 1);
        assert_eq!(forms[0].children()[1].line(), 2);
        assert_eq!(forms[1].line(), 5);
    }

    #[test]
    fn test_unbalanced() {
        let cases = vec![
            ("(a b", "Unclosed parenthesis", 1),
            ("(a)\n(b\n(c)", "Unclosed parenthesis", 2),
            ("a)", "Unexpected closing parenthesis", 1),
            ("(a))\n", "Unexpected closing parenthesis", 1),
            ("(a)\n\n)", "Unexpected closing parenthesis", 3),
        ];

        for (source, message, line) in cases {
            let err = parse_text(source).unwrap_err();
            assert_eq!(err.kind, DiagnosticKind::Syntax, "source: {source:?}");
            assert_eq!(err.message, message, "source: {source:?}");
            assert_eq!(err.line, Some(line), "source: {source:?}");
        }
    }

    #[test]
    fn test_depth_limit() {
        let at_limit = format!("{}{}", "(".repeat(4), ")".repeat(4));
        let tokens = Lexer.scan(&at_limit).unwrap();
        assert!(parse_program(&tokens, 4).is_ok());

        let too_deep = format!("{}{}", "(".repeat(5), ")".repeat(5));
        let tokens = Lexer.scan(&too_deep).unwrap();
        let err = parse_program(&tokens, 4).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Limit);
    }

    #[test]
    fn test_root_node() {
        let tokens = Lexer.scan("(a) (b)").unwrap();
        let root = parse(&tokens, MAX_PARSE_DEPTH).unwrap();
        assert_eq!(root.to_string(), "((a) (b))");

        let tokens = Lexer.scan("(a b)").unwrap();
        let root = parse(&tokens, MAX_PARSE_DEPTH).unwrap();
        assert_eq!(root.to_string(), "(a b)");
    }
}
