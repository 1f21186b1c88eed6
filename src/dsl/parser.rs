//! Parsers for tag specifications.
//!
//! Three entry points:
//!
//! - [`parse_tag`]: one tag in the compact string syntax. Operators are tried
//!   in a fixed precedence order and the input is split at the *first*
//!   occurrence of the operator found, so values may contain operator
//!   characters.
//! - [`parse`]: a structured [`TagSpec`] (`{and: [...]}`, `{or: [...]}` or a
//!   string), as found in configuration files.
//! - [`parse_expression`]: the compound syntax produced by `Display`:
//!
//! ```text
//! filter     = or_expr
//! or_expr    = and_expr ("|" and_expr)*
//! and_expr   = primary ("&" primary)*
//! primary    = "(" filter ")" | TAG | '"' QUOTED_TAG '"'
//! ```

use super::ast::{CompareOp, ComparingTag, RegexTag, SubstitutingTag, Tag, TagsFilter};
use super::error::{ParseError, ParseErrorKind};
use super::eval::parse_comparable;
use super::lexer::{LexError, Token, tokenize};
use super::pattern::TagPattern;
use serde::{Deserialize, Serialize};

/// Structured tag configuration: a tag string or an `and`/`or` group.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TagSpec {
    Expr(String),
    Group {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        and: Option<Vec<TagSpec>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        or: Option<Vec<TagSpec>>,
    },
}

impl From<&str> for TagSpec {
    fn from(s: &str) -> Self {
        TagSpec::Expr(s.to_string())
    }
}

impl TagSpec {
    pub fn and(specs: Vec<TagSpec>) -> Self {
        TagSpec::Group {
            and: Some(specs),
            or: None,
        }
    }

    pub fn or(specs: Vec<TagSpec>) -> Self {
        TagSpec::Group {
            and: None,
            or: Some(specs),
        }
    }

    fn fragment(&self) -> String {
        match self {
            TagSpec::Expr(s) => s.clone(),
            group => serde_json::to_string(group).unwrap_or_default(),
        }
    }
}

/// Operators of the single-tag syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Compare(CompareOp),
    NotRegex,      // !~
    KeyRegex,      // ~~
    NotSubstitute, // !:=
    Substitute,    // :=
    NotEqual,      // !=
    Regex,         // ~
    Equal,         // =
}

/// Tried top to bottom; the first operator present anywhere in the input wins.
/// Comparators come first, then every operator before the ones it contains.
const OPERATORS: [(&str, Operator); 11] = [
    ("<=", Operator::Compare(CompareOp::Le)),
    (">=", Operator::Compare(CompareOp::Ge)),
    ("<", Operator::Compare(CompareOp::Lt)),
    (">", Operator::Compare(CompareOp::Gt)),
    ("!~", Operator::NotRegex),
    ("~~", Operator::KeyRegex),
    ("!:=", Operator::NotSubstitute),
    (":=", Operator::Substitute),
    ("!=", Operator::NotEqual),
    ("~", Operator::Regex),
    ("=", Operator::Equal),
];

/// Parse a single tag such as `amenity=cafe`, `name~.*[Cc]afe.*` or `lanes>=2`.
pub fn parse_tag(tag: &str, context: &str) -> Result<TagsFilter, ParseError> {
    let error = |kind| ParseError::new(tag, context, kind);

    for (symbol, operator) in OPERATORS {
        let Some((key, value)) = tag.split_once(symbol) else {
            continue;
        };

        let filter: TagsFilter = match operator {
            Operator::Compare(op) => {
                let rhs = value.trim();
                let bound = parse_comparable(rhs).unwrap_or_else(|| {
                    tracing::warn!(
                        "'{}' (in {}): '{}' is neither a number nor a date; this tag never matches",
                        tag,
                        context,
                        rhs
                    );
                    f64::NAN
                });
                ComparingTag::new(key, op, bound, format!("{}{}", op, rhs)).into()
            }
            Operator::NotRegex => {
                if value == "*" {
                    return Err(error(ParseErrorKind::NegatedRegexWildcard { key: key.into() }));
                }
                RegexTag::new(key, value, true).into()
            }
            Operator::KeyRegex => {
                let value = if value == "*" { TagPattern::ANY_NON_EMPTY } else { value };
                RegexTag::with_key_pattern(key, value).into()
            }
            Operator::NotSubstitute => SubstitutingTag::new(key, value, true).into(),
            Operator::Substitute => SubstitutingTag::new(key, value, false).into(),
            Operator::NotEqual => match value {
                "*" => return Err(error(ParseErrorKind::NegatedWildcard { key: key.into() })),
                "" => RegexTag::new(key, TagPattern::ANY_NON_EMPTY, false).into(),
                _ => RegexTag::literal(key, value, true).into(),
            },
            Operator::Regex => match value {
                "" => return Err(error(ParseErrorKind::EmptyRegex { key: key.into() })),
                "*" => RegexTag::new(key, TagPattern::ANY_NON_EMPTY, false).into(),
                _ => RegexTag::new(key, value, false).into(),
            },
            Operator::Equal => {
                if value == "*" {
                    return Err(error(ParseErrorKind::WildcardValue { key: key.into() }));
                }
                Tag::new(key, value).into()
            }
        };

        tracing::debug!("Parsed '{}' with operator '{}'", tag, symbol);
        return Ok(filter);
    }

    Err(error(ParseErrorKind::NoOperator))
}

/// Parse a structured tag specification. Failures are logged with their
/// context before being returned.
pub fn parse(spec: &TagSpec, context: &str) -> Result<TagsFilter, ParseError> {
    parse_unlogged(spec, context).inspect_err(|err| {
        tracing::error!("Could not parse tag {} in context {}: {}", spec.fragment(), context, err);
    })
}

fn parse_unlogged(spec: &TagSpec, context: &str) -> Result<TagsFilter, ParseError> {
    match spec {
        TagSpec::Expr(tag) => parse_tag(tag, context),
        TagSpec::Group {
            and: Some(_),
            or: Some(_),
        } => Err(ParseError::new(spec.fragment(), context, ParseErrorKind::AmbiguousGroup)),
        TagSpec::Group { and: Some(specs), .. } => Ok(TagsFilter::And(
            specs
                .iter()
                .map(|s| parse_unlogged(s, context))
                .collect::<Result<_, _>>()?,
        )),
        TagSpec::Group { or: Some(specs), .. } => Ok(TagsFilter::Or(
            specs
                .iter()
                .map(|s| parse_unlogged(s, context))
                .collect::<Result<_, _>>()?,
        )),
        TagSpec::Group { .. } => Err(ParseError::new(
            spec.fragment(),
            context,
            ParseErrorKind::UnrecognizedObject,
        )),
    }
}

/// Parse a JSON value (string or `and`/`or` object).
pub fn parse_json(value: &serde_json::Value, context: &str) -> Result<TagsFilter, ParseError> {
    if value.is_object() && value.get("and").is_some() && value.get("or").is_some() {
        let err = ParseError::new(value.to_string(), context, ParseErrorKind::AmbiguousGroup);
        tracing::error!("Could not parse tag {} in context {}: {}", value, context, err);
        return Err(err);
    }
    let spec: TagSpec = serde_json::from_value(value.clone()).map_err(|_| {
        let err = ParseError::new(value.to_string(), context, ParseErrorKind::InvalidStructure);
        tracing::error!("Could not parse tag {} in context {}: {}", value, context, err);
        err
    })?;
    parse(&spec, context)
}

/// Parser state for the compound syntax.
struct Parser<'c> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'c str,
    context: &'c str,
}

impl<'c> Parser<'c> {
    fn new(tokens: Vec<Token>, source: &'c str, context: &'c str) -> Self {
        Parser {
            tokens,
            pos: 0,
            source,
            context,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.source, self.context, kind)
    }

    fn unexpected(&self, tok: &Token) -> ParseError {
        let what = match tok {
            Token::Atom(s) => format!("tag '{}'", s),
            Token::And => "'&'".to_string(),
            Token::Or => "'|'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Eof => "end of input".to_string(),
        };
        self.error(ParseErrorKind::UnexpectedToken(what))
    }

    /// Parse OR expression: and_expr ("|" and_expr)*
    fn parse_or_expr(&mut self) -> Result<TagsFilter, ParseError> {
        let mut exprs = vec![self.parse_and_expr()?];

        while matches!(self.peek(), Token::Or) {
            self.advance(); // consume |
            exprs.push(self.parse_and_expr()?);
        }

        Ok(TagsFilter::Or(exprs).simplify())
    }

    /// Parse AND expression: primary ("&" primary)*
    fn parse_and_expr(&mut self) -> Result<TagsFilter, ParseError> {
        let mut exprs = vec![self.parse_primary()?];

        while matches!(self.peek(), Token::And) {
            self.advance(); // consume &
            exprs.push(self.parse_primary()?);
        }

        Ok(TagsFilter::And(exprs).simplify())
    }

    /// Parse primary expression: "(" filter ")" | TAG
    fn parse_primary(&mut self) -> Result<TagsFilter, ParseError> {
        match self.advance() {
            Token::LParen => {
                let inner = self.parse_or_expr()?;
                match self.advance() {
                    Token::RParen => Ok(inner),
                    Token::Eof => Err(self.error(ParseErrorKind::UnbalancedParentheses)),
                    other => Err(self.unexpected(&other)),
                }
            }
            Token::Atom(tag) => parse_tag(&tag, self.context),
            other => Err(self.unexpected(&other)),
        }
    }
}

/// Parse the compound syntax, e.g. `highway=primary&(lanes>=2|oneway=yes)`.
/// An empty input is the empty `And`, which matches everything.
pub fn parse_expression(input: &str, context: &str) -> Result<TagsFilter, ParseError> {
    parse_expression_unlogged(input, context).inspect_err(|err| {
        tracing::error!("Could not parse expression '{}' in context {}: {}", input, context, err);
    })
}

fn parse_expression_unlogged(input: &str, context: &str) -> Result<TagsFilter, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(TagsFilter::And(vec![]));
    }

    let tokens = tokenize(input).map_err(|err| {
        let kind = match err {
            LexError::UnclosedParenthesis => ParseErrorKind::UnbalancedParentheses,
            LexError::UnterminatedQuote => ParseErrorKind::UnterminatedQuote,
        };
        ParseError::new(input, context, kind)
    })?;
    let mut parser = Parser::new(tokens, input, context);
    let filter = parser.parse_or_expr()?;

    // Ensure we consumed all tokens
    match parser.peek() {
        Token::Eof => Ok(filter),
        Token::RParen => Err(parser.error(ParseErrorKind::UnbalancedParentheses)),
        other => Err(parser.unexpected(other)),
    }
}

/// Parse a filter given on the command line or in a mapping rule: a JSON or
/// YAML document when it starts with `{`, the compound syntax otherwise.
pub fn parse_filter(input: &str, context: &str) -> Result<TagsFilter, ParseError> {
    if input.trim_start().starts_with('{') {
        let spec: TagSpec = serde_yaml::from_str(input)
            .map_err(|e| ParseError::new(input, context, ParseErrorKind::InvalidDocument(e.to_string())))?;
        return parse(&spec, context);
    }
    parse_expression(input, context)
}

/// Parse a strict `key=value` pair; no other operator is recognized.
pub fn simple_tag(tag: &str, context: &str) -> Result<Tag, ParseError> {
    match tag.split_once('=') {
        Some((key, value)) => Ok(Tag::new(key, value)),
        None => Err(ParseError::new(tag, context, ParseErrorKind::MissingEquals)),
    }
}
