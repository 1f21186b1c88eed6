//! Filter tree types.

use super::pattern::TagPattern;
use std::collections::HashMap;
use std::fmt;

/// The tags of one map feature. Multi-valued tags are `;`-joined.
pub type Properties = HashMap<String, String>;

/// A predicate over a property bag.
///
/// Trees are immutable once built and contain no back-references, so they can
/// be cloned and shared freely between evaluators.
#[derive(Debug, Clone, PartialEq)]
pub enum TagsFilter {
    /// `key=value`
    Tag(Tag),
    /// `key~pattern`, `key!~pattern`, `key!=value`, `keypattern~~pattern`
    Regex(RegexTag),
    /// `key<n`, `key<=n`, `key>n`, `key>=n`
    Comparing(ComparingTag),
    /// `key:={template}`, `key!:={template}`
    Substituting(SubstitutingTag),
    /// All children match. An empty list matches everything.
    And(Vec<TagsFilter>),
    /// Any child matches. An empty list matches nothing.
    Or(Vec<TagsFilter>),
}

/// Plain equality, with multi-value semantics on the bag side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// How a [`RegexTag`] selects the key(s) it looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatcher {
    Exact(String),
    /// Every bag key is scanned; the first one matching decides.
    Pattern(TagPattern),
}

/// How a [`RegexTag`] tests a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMatcher {
    /// Whole-string equality (produced by `key!=value`).
    Literal(String),
    Pattern(TagPattern),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexTag {
    pub key: KeyMatcher,
    pub value: ValueMatcher,
    pub invert: bool,
}

/// Ordering operator of a [`ComparingTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Le, // <=
    Ge, // >=
    Lt, // <
    Gt, // >
}

/// Numeric or date inequality. `label` is the operator and right-hand side as
/// written (e.g. `<5`, `>=2022-01-01`).
#[derive(Debug, Clone)]
pub struct ComparingTag {
    pub key: String,
    pub op: CompareOp,
    /// Right-hand side as a number, dates as epoch milliseconds. `NaN` when the
    /// literal was neither, in which case nothing matches.
    pub bound: f64,
    pub label: String,
}

/// A tag whose value is a template with `{key}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubstitutingTag {
    pub key: String,
    pub template: String,
    pub invert: bool,
}

/// A concrete key/value write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagChange {
    pub key: String,
    pub value: String,
}

impl CompareOp {
    /// Operators in the order the parser must try them.
    pub const PRECEDENCE: [CompareOp; 4] = [CompareOp::Le, CompareOp::Ge, CompareOp::Lt, CompareOp::Gt];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
        }
    }

    pub fn holds(self, actual: f64, bound: f64) -> bool {
        match self {
            CompareOp::Le => actual <= bound,
            CompareOp::Ge => actual >= bound,
            CompareOp::Lt => actual < bound,
            CompareOp::Gt => actual > bound,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl PartialEq for ComparingTag {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.op == other.op
            && self.label == other.label
            && (self.bound == other.bound || (self.bound.is_nan() && other.bound.is_nan()))
    }
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl RegexTag {
    /// `key~fragment` (or `key!~fragment` when inverted).
    pub fn new(key: impl Into<String>, fragment: impl Into<String>, invert: bool) -> Self {
        RegexTag {
            key: KeyMatcher::Exact(key.into()),
            value: ValueMatcher::Pattern(TagPattern::new(fragment)),
            invert,
        }
    }

    /// Whole-value comparison, `key!=value` when inverted.
    pub fn literal(key: impl Into<String>, value: impl Into<String>, invert: bool) -> Self {
        RegexTag {
            key: KeyMatcher::Exact(key.into()),
            value: ValueMatcher::Literal(value.into()),
            invert,
        }
    }

    /// `keyfragment~~valuefragment`
    pub fn with_key_pattern(key_fragment: impl Into<String>, value_fragment: impl Into<String>) -> Self {
        RegexTag {
            key: KeyMatcher::Pattern(TagPattern::new(key_fragment)),
            value: ValueMatcher::Pattern(TagPattern::new(value_fragment)),
            invert: false,
        }
    }

    /// Source text of the key: the literal key or the pattern fragment.
    pub fn key_source(&self) -> &str {
        match &self.key {
            KeyMatcher::Exact(key) => key,
            KeyMatcher::Pattern(pattern) => pattern.fragment(),
        }
    }

    /// Source text of the value: the literal or the pattern fragment.
    pub fn value_source(&self) -> &str {
        match &self.value {
            ValueMatcher::Literal(value) => value,
            ValueMatcher::Pattern(pattern) => pattern.fragment(),
        }
    }
}

impl ComparingTag {
    pub fn new(key: impl Into<String>, op: CompareOp, bound: f64, label: impl Into<String>) -> Self {
        ComparingTag {
            key: key.into(),
            op,
            bound,
            label: label.into(),
        }
    }
}

impl SubstitutingTag {
    pub fn new(key: impl Into<String>, template: impl Into<String>, invert: bool) -> Self {
        SubstitutingTag {
            key: key.into(),
            template: template.into(),
            invert,
        }
    }
}

impl TagChange {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        TagChange {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<Tag> for TagsFilter {
    fn from(tag: Tag) -> Self {
        TagsFilter::Tag(tag)
    }
}

impl From<RegexTag> for TagsFilter {
    fn from(tag: RegexTag) -> Self {
        TagsFilter::Regex(tag)
    }
}

impl From<ComparingTag> for TagsFilter {
    fn from(tag: ComparingTag) -> Self {
        TagsFilter::Comparing(tag)
    }
}

impl From<SubstitutingTag> for TagsFilter {
    fn from(tag: SubstitutingTag) -> Self {
        TagsFilter::Substituting(tag)
    }
}

impl TagsFilter {
    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        TagsFilter::Tag(Tag::new(key, value))
    }

    /// The single key an atomic filter talks about. `None` for composites and
    /// for regex-keyed tags.
    pub fn key(&self) -> Option<&str> {
        match self {
            TagsFilter::Tag(tag) => Some(&tag.key),
            TagsFilter::Regex(tag) => match &tag.key {
                KeyMatcher::Exact(key) => Some(key),
                KeyMatcher::Pattern(_) => None,
            },
            TagsFilter::Comparing(tag) => Some(&tag.key),
            TagsFilter::Substituting(tag) => Some(&tag.key),
            TagsFilter::And(_) | TagsFilter::Or(_) => None,
        }
    }

    /// Flatten nested And/Or of the same kind and unwrap single-child groups.
    pub fn simplify(self) -> Self {
        match self {
            TagsFilter::And(exprs) => {
                let mut flat = Vec::new();
                for expr in exprs {
                    match expr.simplify() {
                        TagsFilter::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                if flat.len() == 1 {
                    flat.remove(0)
                } else {
                    TagsFilter::And(flat)
                }
            }
            TagsFilter::Or(exprs) => {
                let mut flat = Vec::new();
                for expr in exprs {
                    match expr.simplify() {
                        TagsFilter::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                if flat.len() == 1 {
                    flat.remove(0)
                } else {
                    TagsFilter::Or(flat)
                }
            }
            other => other,
        }
    }
}
