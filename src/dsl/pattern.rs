//! Anchored regular expressions that remember their source text.

use regex::Regex;
use std::fmt;

/// A pattern compiled as `^(?:fragment)$`.
///
/// Equality, shadowing and opposite detection compare the fragment text, never
/// the compiled automaton. A fragment that fails to compile is kept (so it
/// still renders and compares) but matches nothing.
#[derive(Clone)]
pub struct TagPattern {
    fragment: String,
    compiled: Option<Regex>,
}

impl TagPattern {
    /// Fragment used for the "any non-empty value" pattern.
    pub const ANY_NON_EMPTY: &'static str = "..*";

    pub fn new(fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        let compiled = match Regex::new(&format!("^(?:{})$", fragment)) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!("Pattern '{}' does not compile and will never match: {}", fragment, err);
                None
            }
        };
        TagPattern { fragment, compiled }
    }

    pub fn any_non_empty() -> Self {
        Self::new(Self::ANY_NON_EMPTY)
    }

    /// The fragment as written, without anchors.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The anchored form, `^fragment$`.
    pub fn anchored(&self) -> String {
        format!("^{}$", self.fragment)
    }

    pub fn is_any_non_empty(&self) -> bool {
        self.fragment == Self::ANY_NON_EMPTY
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(value))
    }
}

impl PartialEq for TagPattern {
    fn eq(&self, other: &Self) -> bool {
        self.fragment == other.fragment
    }
}

impl Eq for TagPattern {}

impl fmt::Debug for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.anchored())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchoring() {
        let p = TagPattern::new(".*bicycle_tube.*");
        assert_eq!(p.anchored(), "^.*bicycle_tube.*$");
        assert!(p.is_match("bicycle_tube"));
        assert!(p.is_match("drinks;bicycle_tube;food"));
        assert!(!p.is_match("bicycle_tub"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let p = TagPattern::new("pedestrian|living_street");
        assert!(p.is_match("pedestrian"));
        assert!(p.is_match("living_street"));
        assert!(!p.is_match("pedestrian_zone"));
        assert!(!p.is_match("a living_street"));
    }

    #[test]
    fn test_any_non_empty() {
        let p = TagPattern::any_non_empty();
        assert!(p.is_any_non_empty());
        assert!(p.is_match("x"));
        assert!(!p.is_match(""));
    }

    #[test]
    fn test_broken_pattern_never_matches() {
        let p = TagPattern::new("(unclosed");
        assert!(!p.is_match("(unclosed"));
        assert!(!p.is_match(""));
        assert_eq!(p, TagPattern::new("(unclosed"));
    }
}
