//! Per-key value sets, used to treat answers as multi-valued assignments.

use crate::dsl::{KeyMatcher, Properties, RegexTag, Tag, TagError, TagsFilter};
use std::collections::VecDeque;

/// One required value for a key: a literal (one `;` part) or a regex tag
/// that must match the bag as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitValue<'a> {
    Value(String),
    Regex(&'a RegexTag),
}

/// Required values per key, keys in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues<'a> {
    entries: Vec<(String, Vec<SplitValue<'a>>)>,
}

impl<'a> KeyValues<'a> {
    fn push(&mut self, key: &str, value: SplitValue<'a>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key.to_string(), vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[SplitValue<'a>]> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SplitValue<'a>])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten `filters` into the values each key must carry.
///
/// `And` groups are expanded breadth first and tag values are split on `;`.
/// Regex tags with a literal key are kept whole when `allow_regex` is set.
/// Anything else (`Or`, comparisons, templates, regex keys) has no per-key
/// reading and is rejected.
pub fn split_keys(filters: &[TagsFilter], allow_regex: bool) -> Result<KeyValues<'_>, TagError> {
    let mut out = KeyValues::default();
    let mut queue: VecDeque<&TagsFilter> = filters.iter().collect();
    while let Some(filter) = queue.pop_front() {
        match filter {
            TagsFilter::And(exprs) => queue.extend(exprs.iter()),
            TagsFilter::Tag(tag) => {
                for part in tag.value.split(';') {
                    out.push(&tag.key, SplitValue::Value(part.to_string()));
                }
            }
            TagsFilter::Regex(regex @ RegexTag { key: KeyMatcher::Exact(key), .. }) if allow_regex => {
                out.push(key, SplitValue::Regex(regex));
            }
            other => {
                tracing::error!("Cannot split '{}' into per-key values", other);
                return Err(TagError::UnsupportedInSplit(other.to_string()));
            }
        }
    }
    Ok(out)
}

/// Merge several answer filters into a single `And` with one tag per key,
/// holding the de-duplicated union of the values seen for that key.
///
/// Empty values (`key=`, "remove this key") do not contribute a part.
pub fn flatten_multi_answer(filters: &[TagsFilter]) -> Result<TagsFilter, TagError> {
    let split = split_keys(filters, false)?;
    let and = split
        .iter()
        .map(|(key, values)| {
            let mut seen: Vec<&str> = Vec::new();
            for value in values {
                if let SplitValue::Value(v) = value
                    && !v.is_empty()
                    && !seen.contains(&v.as_str())
                {
                    seen.push(v);
                }
            }
            Tag::new(key, seen.join(";")).into()
        })
        .collect();
    Ok(TagsFilter::And(and))
}

/// Match `filter` as a multi-valued answer: every required value of every key
/// must be one of the bag's `;` parts for that key.
///
/// Regex entries are the exception, they are evaluated against the whole
/// bag rather than the split values. Filters without a per-key reading fall
/// back to plain evaluation.
pub fn matches_multi_answer(filter: &TagsFilter, properties: &Properties) -> bool {
    let split = match split_keys(std::slice::from_ref(filter), true) {
        Ok(split) => split,
        Err(e) => {
            tracing::debug!("{}, evaluating as a plain filter", e);
            return filter.matches_properties(properties);
        }
    };
    split.iter().all(|(key, needed)| {
        let Some(actual) = properties.get(key) else {
            return false;
        };
        let parts: Vec<&str> = actual.split(';').collect();
        needed.iter().all(|value| match value {
            SplitValue::Regex(regex) => regex.matches_properties(properties),
            SplitValue::Value(v) => parts.contains(&v.as_str()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{ComparingTag, CompareOp, parse_expression};

    fn tags(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn values(split: &KeyValues<'_>, key: &str) -> Vec<String> {
        split
            .get(key)
            .unwrap()
            .iter()
            .map(|v| match v {
                SplitValue::Value(s) => s.clone(),
                SplitValue::Regex(r) => format!("/{}/", r.value_source()),
            })
            .collect()
    }

    #[test]
    fn test_split_keys_expands_and_splits() {
        let filters = vec![
            TagsFilter::And(vec![TagsFilter::tag("x", "a"), TagsFilter::tag("y", "0;1")]),
            TagsFilter::tag("x", "b"),
        ];
        let split = split_keys(&filters, false).unwrap();
        assert_eq!(split.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(values(&split, "x"), vec!["b", "a"]);
        assert_eq!(values(&split, "y"), vec!["0", "1"]);
    }

    #[test]
    fn test_split_keys_regex_only_when_allowed() {
        let filters = vec![TagsFilter::Regex(RegexTag::new("cuisine", "pizza|pasta", false))];
        assert!(matches!(split_keys(&filters, false), Err(TagError::UnsupportedInSplit(_))));
        let split = split_keys(&filters, true).unwrap();
        assert_eq!(values(&split, "cuisine"), vec!["/pizza|pasta/"]);

        let keyed = vec![TagsFilter::Regex(RegexTag::with_key_pattern("service:.*", "yes"))];
        assert!(split_keys(&keyed, true).is_err());
    }

    #[test]
    fn test_split_keys_rejects_or_and_comparisons() {
        let or = vec![TagsFilter::Or(vec![TagsFilter::tag("a", "b")])];
        assert!(split_keys(&or, true).is_err());
        let cmp = vec![ComparingTag::new("lanes", CompareOp::Lt, 3.0, "<3").into()];
        assert!(split_keys(&cmp, true).is_err());
    }

    #[test]
    fn test_flatten_multi_answer() {
        let filters = vec![
            TagsFilter::And(vec![TagsFilter::tag("x", "a"), TagsFilter::tag("y", "0;1")]),
            TagsFilter::And(vec![TagsFilter::tag("x", "b"), TagsFilter::tag("y", "2")]),
        ];
        assert_eq!(
            flatten_multi_answer(&filters).unwrap(),
            TagsFilter::And(vec![TagsFilter::tag("x", "a;b"), TagsFilter::tag("y", "0;1;2")])
        );
    }

    #[test]
    fn test_flatten_multi_answer_dedups_and_skips_empty() {
        let filters = vec![
            TagsFilter::And(vec![TagsFilter::tag("x", "a"), TagsFilter::tag("y", "0")]),
            TagsFilter::And(vec![TagsFilter::tag("x", ""), TagsFilter::tag("y", "0;3")]),
        ];
        assert_eq!(
            flatten_multi_answer(&filters).unwrap(),
            TagsFilter::And(vec![TagsFilter::tag("x", "a"), TagsFilter::tag("y", "0;3")])
        );
        assert_eq!(flatten_multi_answer(&[]).unwrap(), TagsFilter::And(vec![]));
    }

    #[test]
    fn test_matches_multi_answer() {
        let answer = parse_expression("cuisine=pizza;burger&diet:vegan=yes", "test").unwrap();
        assert!(matches_multi_answer(
            &answer,
            &tags(&[("cuisine", "burger;pizza;kebab"), ("diet:vegan", "yes")])
        ));
        assert!(!matches_multi_answer(&answer, &tags(&[("cuisine", "pizza"), ("diet:vegan", "yes")])));
        assert!(!matches_multi_answer(&answer, &tags(&[("cuisine", "pizza;burger")])));
    }

    #[test]
    fn test_matches_multi_answer_regex_sees_whole_value() {
        // A regex entry is not matched per part: `pizza` alone matches,
        // `pizza;kebab` does not, unlike a plain tag entry.
        let answer = TagsFilter::Regex(RegexTag::new("cuisine", "pizza", false));
        assert!(matches_multi_answer(&answer, &tags(&[("cuisine", "pizza")])));
        assert!(!matches_multi_answer(&answer, &tags(&[("cuisine", "pizza;kebab")])));
        assert!(matches_multi_answer(&TagsFilter::tag("cuisine", "pizza"), &tags(&[("cuisine", "pizza;kebab")])));
    }

    #[test]
    fn test_matches_multi_answer_falls_back_for_or() {
        let or = TagsFilter::Or(vec![TagsFilter::tag("a", "1"), TagsFilter::tag("b", "2")]);
        assert!(matches_multi_answer(&or, &tags(&[("b", "2")])));
        assert!(!matches_multi_answer(&or, &tags(&[("c", "3")])));
    }
}
