//! Contradiction and redundancy checks between filters of one list.

use crate::dsl::TagsFilter;

/// Key source, value source and sense of a plain or regex tag.
fn signed_parts(filter: &TagsFilter) -> Option<(&str, &str, bool)> {
    match filter {
        TagsFilter::Tag(tag) => Some((tag.key.as_str(), tag.value.as_str(), false)),
        TagsFilter::Regex(tag) => Some((tag.key_source(), tag.value_source(), tag.invert)),
        _ => None,
    }
}

/// Detect a pair like `key=value` / `key!~value`: same key and value text,
/// opposite sense. Only plain and regex tags are compared, so this is a
/// heuristic and misses contradictions spelled differently.
pub fn contains_opposite_tags(filters: &[TagsFilter]) -> bool {
    let parts: Vec<_> = filters.iter().filter_map(signed_parts).collect();
    parts.iter().enumerate().any(|(i, (key, value, invert))| {
        parts[i + 1..]
            .iter()
            .any(|(k, v, inv)| k == key && v == value && inv != invert)
    })
}

/// The elements of `list` that no element of `blacklist` shadows.
pub fn remove_shadowed_elements_from(blacklist: &[TagsFilter], list: &[TagsFilter]) -> Vec<TagsFilter> {
    list.iter()
        .filter(|f| !blacklist.iter().any(|guard| guard.shadows(f)))
        .cloned()
        .collect()
}

/// Drop every element that another element already covers.
///
/// When two elements shadow each other (duplicates, or different spellings
/// of the same set) the one with the lower index is kept.
pub fn remove_equivalents(list: &[TagsFilter]) -> Vec<TagsFilter> {
    list.iter()
        .enumerate()
        .filter(|(i, filter)| {
            !list.iter().enumerate().any(|(j, guard)| {
                j != *i && guard.shadows(filter) && (j < *i || !filter.shadows(guard))
            })
        })
        .map(|(_, f)| f.clone())
        .collect()
}

/// True when some guard shadows some element of `list`.
pub fn contains_equivalents(guards: &[TagsFilter], list: &[TagsFilter]) -> bool {
    list.iter().any(|f| guards.iter().any(|guard| guard.shadows(f)))
}
