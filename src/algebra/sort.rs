//! Evaluation order for the children of a group.

use crate::dsl::TagsFilter;
use crate::popularity::KeyCounts;
use std::cmp::Ordering;

/// Sort filters in place: regex tags last, then (with `popularity`) by
/// ascending usage count, then by key. Filters without a count come after
/// counted ones; composites sort as if their key were empty.
///
/// A counted filter precedes an uncounted one even when the keys alone would
/// order them the other way; older tooling compared such pairs by key only,
/// which is not a total order.
///
/// The sort is stable, so filters that compare equal keep their order.
pub fn sort_filters(filters: &mut [TagsFilter], popularity: Option<&KeyCounts>) {
    filters.sort_by(|a, b| order(a, b, popularity));
}

fn order(a: &TagsFilter, b: &TagsFilter, popularity: Option<&KeyCounts>) -> Ordering {
    let is_regex = |f: &TagsFilter| matches!(f, TagsFilter::Regex(_));
    is_regex(a)
        .cmp(&is_regex(b))
        .then_with(|| match popularity {
            Some(counts) => match (count(a, counts), count(b, counts)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            None => Ordering::Equal,
        })
        .then_with(|| a.key().unwrap_or("").cmp(b.key().unwrap_or("")))
}

fn count(filter: &TagsFilter, counts: &KeyCounts) -> Option<u64> {
    let value = match filter {
        TagsFilter::Tag(tag) => Some(tag.value.as_str()),
        _ => None,
    };
    counts.get_count(filter.key()?, value)
}
