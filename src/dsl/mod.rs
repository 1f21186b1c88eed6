//! Tag filter DSL for OSM key/value conditions.
//!
//! Single tags (first operator found wins, in this order):
//!   key<=n, key>=n, key<n, key>n   - numeric or date comparison
//!   key!~regex                     - value does not match (absent counts as "")
//!   keyregex~~regex                - some key matching keyregex has a matching value
//!   key!:={template}               - value differs from the resolved template
//!   key:={template}                - value equals the resolved template
//!   key!=value, key!=              - value differs / key is present
//!   key~regex, key~*               - value matches / key is present
//!   key=value, key=                - value is one of the `;` parts / key is absent
//!
//! Regexes are anchored at both ends. Structured specs combine tags with
//! `{and: [...]}` and `{or: [...]}`; the compound string syntax uses `&`,
//! `|` (lower precedence) and parentheses.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod pattern;
mod render;
mod shadow;

pub use ast::*;
pub use error::{ParseError, ParseErrorKind, TagError};
pub use eval::{evaluate_filter, parse_comparable, parse_date_millis, substitute};
pub use parser::{TagSpec, parse, parse_expression, parse_filter, parse_json, parse_tag, simple_tag};
pub use pattern::TagPattern;
