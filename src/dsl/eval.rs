//! Evaluation of filter trees against a property bag.

use super::ast::{
    ComparingTag, KeyMatcher, Properties, RegexTag, SubstitutingTag, Tag, TagsFilter, ValueMatcher,
};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Evaluate a filter against a set of tags.
///
/// Never fails: missing keys, values that are not numbers or dates and
/// patterns that did not compile all count as "does not match".
pub fn evaluate_filter(filter: &TagsFilter, tags: &Properties) -> bool {
    match filter {
        TagsFilter::Tag(tag) => tag.matches_properties(tags),
        TagsFilter::Regex(tag) => tag.matches_properties(tags),
        TagsFilter::Comparing(tag) => tag.matches_properties(tags),
        TagsFilter::Substituting(tag) => tag.matches_properties(tags),
        TagsFilter::And(exprs) => exprs.iter().all(|e| evaluate_filter(e, tags)),
        TagsFilter::Or(exprs) => exprs.iter().any(|e| evaluate_filter(e, tags)),
    }
}

impl TagsFilter {
    pub fn matches_properties(&self, tags: &Properties) -> bool {
        evaluate_filter(self, tags)
    }
}

impl Tag {
    /// `value` must be one of the `;`-separated parts of the bag's value (or
    /// the whole value). An empty `value` also matches an absent key.
    pub fn matches_properties(&self, tags: &Properties) -> bool {
        match tags.get(&self.key) {
            None => self.value.is_empty(),
            Some(actual) => *actual == self.value || actual.split(';').any(|part| part == self.value),
        }
    }
}

impl RegexTag {
    /// An absent key is tested as the empty string, so `key!=value` and
    /// `key!~pattern` match features without `key`.
    pub fn matches_properties(&self, tags: &Properties) -> bool {
        match &self.key {
            KeyMatcher::Exact(key) => {
                let actual = tags.get(key).map(String::as_str).unwrap_or("");
                self.value_matches(actual) != self.invert
            }
            KeyMatcher::Pattern(key_pattern) => {
                let found = tags
                    .iter()
                    .any(|(key, value)| key_pattern.is_match(key) && self.value_matches(value));
                found != self.invert
            }
        }
    }

    pub(crate) fn value_matches(&self, actual: &str) -> bool {
        match &self.value {
            ValueMatcher::Literal(expected) => actual == expected,
            ValueMatcher::Pattern(pattern) => pattern.is_match(actual),
        }
    }
}

impl ComparingTag {
    pub fn matches_properties(&self, tags: &Properties) -> bool {
        match tags.get(&self.key) {
            None => false,
            Some(actual) => self.accepts(actual),
        }
    }

    /// Test a raw value against the comparator.
    pub fn accepts(&self, actual: &str) -> bool {
        match parse_comparable(actual) {
            None => false,
            Some(n) => self.op.holds(n, self.bound),
        }
    }
}

impl SubstitutingTag {
    /// Compares the bag's value with the template resolved against the same
    /// bag. A missing or empty value never matches, inverted or not.
    pub fn matches_properties(&self, tags: &Properties) -> bool {
        let Some(actual) = tags.get(&self.key).filter(|v| !v.is_empty()) else {
            return false;
        };
        let (expected, _) = substitute(&self.template, tags, false);
        (*actual == expected) != self.invert
    }
}

/// Replace every `{key}` in `template` with the bag's value for `key`.
///
/// Unresolved placeholders are dropped, or kept verbatim with
/// `keep_unresolved`. The flag in the result is false when at least one
/// placeholder could not be resolved.
pub fn substitute(template: &str, tags: &Properties, keep_unresolved: bool) -> (String, bool) {
    let mut out = String::with_capacity(template.len());
    let mut complete = true;
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start + 1..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + 1 + len];
        out.push_str(&rest[..start]);
        match tags.get(name) {
            Some(value) => out.push_str(value),
            None => {
                complete = false;
                if keep_unresolved {
                    out.push_str(&rest[start..start + len + 2]);
                }
            }
        }
        rest = &rest[start + len + 2..];
    }

    out.push_str(rest);
    (out, complete)
}

/// Interpret a value as a number, falling back to a date (epoch millis).
///
/// Infinity is only accepted spelled `Infinity`, `+Infinity` or `-Infinity`;
/// `inf` and friends are not numbers here.
pub fn parse_comparable(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        Ok(n) if n.is_infinite() && s.trim_start_matches(['+', '-']) == "Infinity" => Some(n),
        _ => parse_date_millis(s),
    }
}

/// Parse an ISO-8601-ish date or datetime into milliseconds since the epoch.
/// Values without an offset are taken as UTC.
pub fn parse_date_millis(s: &str) -> Option<f64> {
    let s = s.trim();

    let datetime = if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        dt
    } else if let Ok(date) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        date.midnight().assume_utc()
    } else if let Ok(dt) = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        dt.assume_utc()
    } else if let Ok(dt) = PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        dt.assume_utc()
    } else if let Ok(dt) =
        PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        dt.assume_utc()
    } else {
        return None;
    };

    Some((datetime.unix_timestamp_nanos() / 1_000_000) as f64)
}
