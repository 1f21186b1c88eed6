//! Error types for parsing and for filter utilities.

use thiserror::Error;

/// A malformed tag specification. Carries the offending fragment and the
/// caller-supplied context (usually a config path).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse tag '{fragment}' (in {context}): {kind}")]
pub struct ParseError {
    pub fragment: String,
    pub context: String,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("got an object where both 'and' and 'or' are defined")]
    AmbiguousGroup,
    #[error("unrecognized tag: an object needs either 'and' or 'or'")]
    UnrecognizedObject,
    #[error("expected a string or an object with 'and'/'or'")]
    InvalidStructure,
    #[error("not a valid JSON/YAML tag document: {0}")]
    InvalidDocument(String),
    #[error("no key part and value part were found")]
    NoOperator,
    #[error("don't use '{key}!~*', use '{key}=' instead (an empty value means the tag is absent)")]
    NegatedRegexWildcard { key: String },
    #[error("to indicate a missing tag, use '{key}!=' instead")]
    NegatedWildcard { key: String },
    #[error("a regex tag with an empty regex is not allowed, use '{key}=' instead")]
    EmptyRegex { key: String },
    #[error("detected a wildcard on a normal value, use '{key}~*' instead")]
    WildcardValue { key: String },
    #[error("no '=' found")]
    MissingEquals,
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("a quoted tag is missing its closing '\"'")]
    UnterminatedQuote,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
}

impl ParseError {
    pub fn new(fragment: impl Into<String>, context: impl Into<String>, kind: ParseErrorKind) -> Self {
        ParseError {
            fragment: fragment.into(),
            context: context.into(),
            kind,
        }
    }
}

/// Failures of filter utilities other than parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("'{0}' cannot be converted into a tag change")]
    NotAChange(String),
    #[error("could not resolve all substitutions in '{key}={value}'")]
    UnresolvedPlaceholder { key: String, value: String },
    #[error("'{0}' cannot be split into key/value sets")]
    UnsupportedInSplit(String),
    #[error("invalid tag specification '{spec}': {reason}")]
    InvalidApplySpec { spec: String, reason: String },
}
