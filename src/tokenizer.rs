//! Combinator-based whitespace tokenizer.
//!
//! A simpler alternative to [`crate::lexer::Lexer`]: the input is split into
//! whitespace runs, parentheses, quoted strings and bare atoms. There is no
//! comment syntax and `;` is an ordinary atom character.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace1},
    combinator::{map, value},
    error::ErrorKind,
};

use crate::Diagnostic;
use crate::token::{Scanner, Token, TokenKind, word_kind};

/// Nom-based scanner without comment support
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

/// One recognized piece of input before line numbers are attached
#[derive(Debug, Clone, PartialEq)]
enum Piece<'a> {
    Space(&'a str),
    Open,
    Close,
    Quoted(String),
    Atom(&'a str),
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | '\'')
}

fn parse_space(input: &str) -> IResult<&str, Piece<'_>> {
    map(multispace1, Piece::Space).parse(input)
}

fn parse_paren(input: &str) -> IResult<&str, Piece<'_>> {
    alt((value(Piece::Open, char('(')), value(Piece::Close, char(')')))).parse(input)
}

fn parse_atom(input: &str) -> IResult<&str, Piece<'_>> {
    map(take_while1(is_atom_char), Piece::Atom).parse(input)
}

/// Parse a string opened by `"` or `'`, keeping escape sequences undecoded
fn parse_quoted(input: &str) -> IResult<&str, Piece<'_>> {
    let (mut remaining, quote) = alt((char('"'), char('\''))).parse(input)?;
    let mut text = String::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some(c) if c == quote => return Ok((char_iter.as_str(), Piece::Quoted(text))),
            Some('\\') => match char_iter.next() {
                Some(escaped) => {
                    text.push('\\');
                    text.push(escaped);
                }
                None => {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        input,
                        ErrorKind::Char,
                    )));
                }
            },
            Some(c) => text.push(c),
            // Failure rather than Error so `alt` does not try the remaining branches
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    ErrorKind::Char,
                )));
            }
        }
        remaining = char_iter.as_str();
    }
}

fn parse_piece(input: &str) -> IResult<&str, Piece<'_>> {
    alt((parse_space, parse_paren, parse_quoted, parse_atom)).parse(input)
}

fn error_message(error: &nom::Err<nom::error::Error<&str>>) -> String {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
            ErrorKind::Char => "Unterminated string literal".into(),
            _ => {
                let near: String = e.input.chars().take(10).collect();
                format!("Invalid input near '{near}'")
            }
        },
        nom::Err::Incomplete(_) => "Incomplete input".into(),
    }
}

impl Scanner for Tokenizer {
    fn scan(&self, source: &str) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        let mut rest = source;
        let mut line = 1;

        while !rest.is_empty() {
            let (remaining, piece) = parse_piece(rest)
                .map_err(|e| Diagnostic::syntax(error_message(&e)).at(line))?;
            let consumed = &rest[..rest.len() - remaining.len()];

            let token = match piece {
                Piece::Space(text) => Token::new(TokenKind::Space, text, line),
                Piece::Open => Token::new(TokenKind::Open, "(", line),
                Piece::Close => Token::new(TokenKind::Close, ")", line),
                Piece::Quoted(text) => Token::new(TokenKind::String, text, line),
                Piece::Atom(text) => Token::new(word_kind(text), text, line),
            };
            tokens.push(token);

            line += consumed.matches('\n').count();
            rest = remaining;
        }

        Ok(tokens)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn significant(scanner: &dyn Scanner, source: &str) -> Vec<(TokenKind, String, usize)> {
        scanner
            .scan(source)
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| (t.kind, t.data, t.line))
            .collect()
    }

    #[test]
    fn test_pieces() {
        let cases = vec![
            ("(", Piece::Open),
            (")", Piece::Close),
            ("  \n", Piece::Space("  \n")),
            ("abc", Piece::Atom("abc")),
            ("a;b", Piece::Atom("a;b")),
            (r#""x y""#, Piece::Quoted("x y".into())),
            (r#"'q\'s'"#, Piece::Quoted(r"q\'s".into())),
        ];

        for (input, expected) in cases {
            let (rest, piece) = parse_piece(input).unwrap();
            assert_eq!(piece, expected, "input: {input:?}");
            assert_eq!(rest, "", "input: {input:?}");
        }
    }

    #[test]
    fn test_lines_and_kinds() {
        use TokenKind::*;
        let tokens = significant(&Tokenizer, "(define x\n  2.5)\n(x)");
        assert_eq!(
            tokens,
            vec![
                (Open, "(".into(), 1),
                (Id, "define".into(), 1),
                (Id, "x".into(), 1),
                (Number, "2.5".into(), 2),
                (Close, ")".into(), 2),
                (Open, "(".into(), 3),
                (Id, "x".into(), 3),
                (Close, ")".into(), 3),
            ]
        );
    }

    #[test]
    fn test_matches_lexer_without_comments() {
        let sources = [
            "(+ 1 2 3)",
            "(define square-of x (* x x))\n(square-of 5)",
            r#"(if (< 1 2) "yes" 'no')"#,
            "(print \"a\\tb\")",
            "((a) (b c))",
        ];

        for source in sources {
            assert_eq!(
                significant(&Tokenizer, source),
                significant(&Lexer, source),
                "source: {source:?}"
            );
        }
    }

    #[test]
    fn test_unterminated_string() {
        let err = Tokenizer.scan("(a\n\"open").unwrap_err();
        assert_eq!(err.kind, crate::DiagnosticKind::Syntax);
        assert_eq!(err.message, "Unterminated string literal");
        assert_eq!(err.line, Some(2));
    }
}
