//! Tokenizer for the compound filter syntax (`a=b&(c=d|e~f)`).
//!
//! A tag whose text would not survive lexing on its own (it holds a `&`/`|`
//! that starts a new tag, an unbalanced parenthesis, or surrounding spaces)
//! is written between double quotes, with `\"` and `\\` as escapes.

use std::borrow::Cow;
use winnow::ascii::space0;
use winnow::combinator::alt;
use winnow::prelude::*;

/// Token types of the compound syntax. Everything between operators is an
/// opaque atom handed to the single-tag parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Atom(String),

    And, // &
    Or,  // |

    LParen, // (
    RParen, // )

    Eof,
}

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    UnclosedParenthesis,
    UnterminatedQuote,
}

/// True when the text following a `&` or `|` begins a new operand: a group,
/// or a segment containing a tag operator. Otherwise the separator belongs to
/// the current value (`highway~primary|secondary`, `name=Tom & Jerry`).
fn starts_operand(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.starts_with('(') || rest.starts_with('"') {
        return true;
    }

    let mut depth = 0usize;
    for c in rest.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => break,
            ')' => depth -= 1,
            '&' | '|' if depth == 0 => break,
            '=' | '~' | '<' | '>' => return true,
            _ => {}
        }
    }
    false
}

/// Lex a single tag. Parentheses inside a tag must balance; a `)` at depth
/// zero closes the enclosing group.
fn lex_atom(input: &mut &str) -> PResult<Token> {
    let text: &str = *input;
    let mut depth = 0usize;
    let mut end = text.len();

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                end = i;
                break;
            }
            ')' => depth -= 1,
            '&' | '|' if depth == 0 && starts_operand(&text[i + 1..]) => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Err(winnow::error::ErrMode::Cut(winnow::error::ContextError::new()));
    }

    let atom = text[..end].trim_end().to_string();
    *input = &text[end..];
    Ok(Token::Atom(atom))
}

/// Lex a tag between double quotes.
fn lex_quoted(input: &mut &str) -> PResult<Token> {
    let text: &str = *input;
    let Some(body) = text.strip_prefix('"') else {
        return Err(winnow::error::ErrMode::Backtrack(winnow::error::ContextError::new()));
    };

    let mut atom = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                *input = &body[i + 1..];
                return Ok(Token::Atom(atom));
            }
            '\\' => match chars.next() {
                Some((_, escaped)) => atom.push(escaped),
                None => break,
            },
            _ => atom.push(c),
        }
    }

    Err(winnow::error::ErrMode::Cut(winnow::error::ContextError::new()))
}

/// Lex a single token.
fn lex_token(input: &mut &str) -> PResult<Token> {
    space0.parse_next(input)?;

    if input.is_empty() {
        return Ok(Token::Eof);
    }

    alt((
        "(".value(Token::LParen),
        ")".value(Token::RParen),
        "&".value(Token::And),
        "|".value(Token::Or),
        lex_quoted,
        lex_atom,
    ))
    .parse_next(input)
}

/// Tokenize the entire input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    loop {
        match lex_token(&mut remaining) {
            Ok(Token::Eof) => break,
            Ok(tok) => tokens.push(tok),
            Err(_) if remaining.starts_with('"') => return Err(LexError::UnterminatedQuote),
            Err(_) => return Err(LexError::UnclosedParenthesis),
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// The text of one tag as it must appear in the compound syntax: unchanged
/// when it lexes back as exactly one atom, quoted otherwise.
pub fn quote_atom(atom: &str) -> Cow<'_, str> {
    let plain = !atom.starts_with('"')
        && matches!(tokenize(atom).as_deref(), Ok([Token::Atom(a), Token::Eof]) if a == atom);
    if plain {
        Cow::Borrowed(atom)
    } else {
        Cow::Owned(format!("\"{}\"", atom.replace('\\', "\\\\").replace('"', "\\\"")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(s: &str) -> Token {
        Token::Atom(s.into())
    }

    #[test]
    fn test_single_tag() {
        assert_eq!(tokenize("highway=primary").unwrap(), vec![atom("highway=primary"), Token::Eof]);
    }

    #[test]
    fn test_and_or_groups() {
        let tokens = tokenize("a=b& (c=d|e~f) ").unwrap();
        assert_eq!(
            tokens,
            vec![
                atom("a=b"),
                Token::And,
                Token::LParen,
                atom("c=d"),
                Token::Or,
                atom("e~f"),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_separator_inside_value() {
        assert_eq!(
            tokenize("highway!~pedestrian|living_street").unwrap(),
            vec![atom("highway!~pedestrian|living_street"), Token::Eof]
        );
        assert_eq!(
            tokenize("name=Tom & Jerry").unwrap(),
            vec![atom("name=Tom & Jerry"), Token::Eof]
        );
    }

    #[test]
    fn test_parentheses_inside_value() {
        assert_eq!(
            tokenize("tags~(.*;)?amenity=public_bookcase(;.*)?|shop=books").unwrap(),
            vec![
                atom("tags~(.*;)?amenity=public_bookcase(;.*)?"),
                Token::Or,
                atom("shop=books"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unclosed_parenthesis_in_value() {
        assert_eq!(tokenize("name~(abc"), Err(LexError::UnclosedParenthesis));
    }

    #[test]
    fn test_quoted_atoms() {
        assert_eq!(
            tokenize(r#""note=x&y=z"&a=b"#).unwrap(),
            vec![atom("note=x&y=z"), Token::And, atom("a=b"), Token::Eof]
        );
        assert_eq!(
            tokenize(r#"a=b|"name=:-)""#).unwrap(),
            vec![atom("a=b"), Token::Or, atom("name=:-)"), Token::Eof]
        );
        assert_eq!(
            tokenize(r#"("say=\"hi\" \\o/")"#).unwrap(),
            vec![Token::LParen, atom(r#"say="hi" \o/"#), Token::RParen, Token::Eof]
        );
        assert_eq!(tokenize(r#"a=b&"c=d"#), Err(LexError::UnterminatedQuote));
    }

    #[test]
    fn test_quote_atom() {
        assert_eq!(quote_atom("highway=primary"), "highway=primary");
        assert_eq!(quote_atom("highway!~pedestrian|living_street"), "highway!~pedestrian|living_street");
        assert_eq!(quote_atom("name=Tom & Jerry"), "name=Tom & Jerry");
        assert_eq!(quote_atom("note=x&y=z"), r#""note=x&y=z""#);
        assert_eq!(quote_atom("name=:-)"), r#""name=:-)""#);
        assert_eq!(quote_atom("name=(x"), r#""name=(x""#);
        assert_eq!(quote_atom("name=x "), r#""name=x ""#);
        assert_eq!(quote_atom(r#"say="hi""#), r#"say="hi""#);
        assert_eq!(quote_atom(r#""k"=v"#), r#""\"k\"=v""#);
        assert_eq!(quote_atom(r#"path=C:\dir&x=y"#), r#""path=C:\\dir&x=y""#);
    }
}
