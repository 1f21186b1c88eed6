//! Set algebra over lists of filters.
//!
//! These helpers treat filters as sets of matching features: merging several
//! answers into one write, spotting contradictions, dropping conditions that
//! another condition already covers, and ordering conditions so cheap ones run
//! first.

mod equivalence;
mod sort;
mod split;

pub use equivalence::{contains_equivalents, contains_opposite_tags, remove_equivalents, remove_shadowed_elements_from};
pub use sort::sort_filters;
pub use split::{KeyValues, SplitValue, flatten_multi_answer, matches_multi_answer, split_keys};
pub use crate::dsl::simple_tag;

use crate::dsl::{Properties, Tag, TagChange};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static VALID_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9:_]{2,253}[a-z0-9]$").expect("valid key pattern"));

/// A lowercase OSM key of 4 to 255 characters from `[a-z0-9:_]`, starting
/// with a letter and not ending in `:` or `_`.
pub fn is_valid_key(key: &str) -> bool {
    VALID_KEY.is_match(key)
}

/// Later tags overwrite earlier ones with the same key.
pub fn kv_to_properties(tags: &[Tag]) -> Properties {
    tags.iter().map(|t| (t.key.clone(), t.value.clone())).collect()
}

pub fn change_as_properties(changes: &[TagChange]) -> Properties {
    changes.iter().map(|c| (c.key.clone(), c.value.clone())).collect()
}

/// True when every needed key is available with (at least) every needed value.
pub fn all_keys_are_contained(available: &HashMap<String, Vec<String>>, needed: &HashMap<String, Vec<String>>) -> bool {
    needed.iter().all(|(key, values)| match available.get(key) {
        Some(have) => values.iter().all(|v| have.contains(v)),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("name"));
        assert!(is_valid_key("addr:street"));
        assert!(is_valid_key("survey_date2"));
        assert!(!is_valid_key("x"));
        assert!(!is_valid_key("abc"));
        assert!(!is_valid_key("with space"));
        assert!(!is_valid_key("Name"));
        assert!(!is_valid_key("name:"));
        assert!(!is_valid_key("2name"));
        assert!(!is_valid_key(&format!("a{}", "b".repeat(255))));
    }

    #[test]
    fn test_kv_to_properties() {
        let props = kv_to_properties(&[Tag::new("a", "1"), Tag::new("b", "2"), Tag::new("a", "3")]);
        assert_eq!(props.len(), 2);
        assert_eq!(props["a"], "3");
        let props = change_as_properties(&[TagChange::new("k", "v")]);
        assert_eq!(props["k"], "v");
    }

    #[test]
    fn test_all_keys_are_contained() {
        let available = kv(&[("cuisine", &["pizza", "burger"]), ("diet", &["vegan"])]);
        assert!(all_keys_are_contained(&available, &kv(&[("cuisine", &["pizza"])])));
        assert!(all_keys_are_contained(&available, &kv(&[])));
        assert!(!all_keys_are_contained(&available, &kv(&[("cuisine", &["sushi"])])));
        assert!(!all_keys_are_contained(&available, &kv(&[("opening_hours", &["24/7"])])));
    }
}
