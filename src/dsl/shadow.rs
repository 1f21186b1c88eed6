//! Shadowing: does one filter's match set contain another's?
//!
//! A plain tag `key=v` also matches bags where `v` is one `;` part of a longer
//! value, so a guard shadows it only when it accepts every such value. The
//! answer is conservative, `false` whenever containment cannot be shown.

use super::ast::{ComparingTag, CompareOp, KeyMatcher, RegexTag, Tag, TagsFilter, ValueMatcher};

impl TagsFilter {
    /// True when every feature matching `other` also matches `self`.
    pub fn shadows(&self, other: &TagsFilter) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (_, TagsFilter::Or(others)) => others.iter().all(|o| self.shadows(o)),
            (TagsFilter::And(exprs), _) => exprs.iter().all(|e| e.shadows(other)),
            (TagsFilter::Or(exprs), _) => exprs.iter().any(|e| e.shadows(other)),
            (_, TagsFilter::And(others)) => others.iter().any(|o| self.shadows(o)),
            (TagsFilter::Tag(tag), TagsFilter::Regex(o)) => tag_shadows_regex(tag, o),
            (TagsFilter::Regex(regex), TagsFilter::Tag(o)) => regex_shadows_tag(regex, o),
            (TagsFilter::Regex(regex), TagsFilter::Regex(o)) => regex_shadows_regex(regex, o),
            (TagsFilter::Comparing(cmp), TagsFilter::Comparing(o)) => comparing_shadows(cmp, o),
            // no number or date survives having `;other` appended
            (TagsFilter::Comparing(_), TagsFilter::Tag(_)) => false,
            (
                TagsFilter::Tag(_) | TagsFilter::Regex(_) | TagsFilter::Comparing(_) | TagsFilter::Substituting(_),
                TagsFilter::Tag(_)
                | TagsFilter::Regex(_)
                | TagsFilter::Comparing(_)
                | TagsFilter::Substituting(_),
            ) => false,
        }
    }
}

/// `key=value` contains the whole-value comparison `key=value`.
fn tag_shadows_regex(tag: &Tag, other: &RegexTag) -> bool {
    match (&other.key, &other.value) {
        (KeyMatcher::Exact(key), ValueMatcher::Literal(value)) => {
            !other.invert && *key == tag.key && *value == tag.value
        }
        _ => false,
    }
}

fn regex_shadows_tag(regex: &RegexTag, other: &Tag) -> bool {
    match &regex.key {
        KeyMatcher::Exact(key) if *key != other.key => false,
        KeyMatcher::Exact(_) if regex.invert => match &regex.value {
            // rejects only `w`, so `w` must not be a value `key=v` matches
            ValueMatcher::Literal(w) => !w.split(';').any(|part| part == other.value),
            ValueMatcher::Pattern(_) => false,
        },
        // `key=` also matches an absent key, which reads as ""
        KeyMatcher::Exact(_) => !other.value.is_empty() && accepts_any_non_empty(regex),
        KeyMatcher::Pattern(key_pattern) => {
            !regex.invert && !other.value.is_empty() && key_pattern.is_match(&other.key) && accepts_any_non_empty(regex)
        }
    }
}

fn accepts_any_non_empty(regex: &RegexTag) -> bool {
    matches!(&regex.value, ValueMatcher::Pattern(pattern) if pattern.is_any_non_empty())
}

fn regex_shadows_regex(regex: &RegexTag, other: &RegexTag) -> bool {
    if regex.key != other.key || other.invert {
        return false;
    }
    match (&regex.value, &other.value, regex.invert) {
        // key~..* contains every positive test that rejects the empty value
        (ValueMatcher::Pattern(pattern), _, false) if pattern.is_any_non_empty() => !other.value_matches(""),
        // key!~P contains key=v whenever v does not match P
        (_, ValueMatcher::Literal(value), true) => !regex.value_matches(value),
        _ => false,
    }
}

fn comparing_shadows(cmp: &ComparingTag, other: &ComparingTag) -> bool {
    if cmp.key != other.key {
        return false;
    }
    match (cmp.op, other.op) {
        (CompareOp::Le, CompareOp::Le) | (CompareOp::Le, CompareOp::Lt) | (CompareOp::Lt, CompareOp::Lt) => {
            other.bound <= cmp.bound
        }
        (CompareOp::Lt, CompareOp::Le) => other.bound < cmp.bound,
        (CompareOp::Ge, CompareOp::Ge) | (CompareOp::Ge, CompareOp::Gt) | (CompareOp::Gt, CompareOp::Gt) => {
            other.bound >= cmp.bound
        }
        (CompareOp::Gt, CompareOp::Ge) => other.bound > cmp.bound,
        _ => false,
    }
}
