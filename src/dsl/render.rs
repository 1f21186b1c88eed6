//! Human-readable rendering, used keys and conversion into tag changes.

use super::ast::{KeyMatcher, Properties, RegexTag, TagChange, TagsFilter, ValueMatcher};
use super::error::TagError;
use super::eval::substitute;
use super::lexer::quote_atom;
use std::collections::BTreeSet;
use std::fmt;

const WIKI: &str = "https://wiki.openstreetmap.org/wiki";
const SHORTEN_AFTER: usize = 25;

fn ellipsis_after(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max - 3).collect();
    format!("{}...", head)
}

impl TagsFilter {
    /// Render for end users.
    ///
    /// `shorten` cuts long values, `link_to_wiki` turns keys and values into
    /// OSM wiki links, and `current` holds the feature's present tags: a
    /// `key=` tag whose key is present renders struck through (applying it
    /// removes the key), and substitution templates are resolved against it.
    pub fn as_human_string(&self, link_to_wiki: bool, shorten: bool, current: &Properties) -> String {
        self.human(link_to_wiki, shorten, current, true)
    }

    fn human(&self, link_to_wiki: bool, shorten: bool, current: &Properties, toplevel: bool) -> String {
        match self {
            TagsFilter::Tag(tag) => {
                let v = if shorten {
                    ellipsis_after(&tag.value, SHORTEN_AFTER)
                } else {
                    tag.value.clone()
                };
                if tag.value.is_empty() && current.contains_key(&tag.key) {
                    return format!("<span class='line-through'>{}</span>", tag.key);
                }
                if link_to_wiki {
                    return format!(
                        "<a href='{WIKI}/Key:{k}' target='_blank'>{k}</a>=<a href='{WIKI}/Tag:{k}%3D{value}' target='_blank'>{v}</a>",
                        k = tag.key,
                        value = tag.value,
                    );
                }
                format!("{}={}", tag.key, v)
            }
            TagsFilter::Regex(tag) => regex_human_string(tag),
            TagsFilter::Comparing(tag) => format!("{}{}", tag.key, tag.label),
            TagsFilter::Substituting(tag) => {
                let (value, _) = substitute(&tag.template, current, true);
                let op = if tag.invert { "!:=" } else { ":=" };
                format!("{}{}{}", tag.key, op, value)
            }
            TagsFilter::And(exprs) => join(exprs, "&", toplevel, |e| e.human(link_to_wiki, shorten, current, false)),
            TagsFilter::Or(exprs) => join(exprs, "|", toplevel, |e| e.human(link_to_wiki, shorten, current, false)),
        }
    }

    /// Every key this filter reads. Keys given as patterns are not listed.
    pub fn used_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys(&self, keys: &mut BTreeSet<String>) {
        match self {
            TagsFilter::And(exprs) | TagsFilter::Or(exprs) => {
                for expr in exprs {
                    expr.collect_keys(keys);
                }
            }
            atomic => {
                if let Some(key) = atomic.key() {
                    keys.insert(key.to_string());
                }
            }
        }
    }

    /// True when applying this filter as an answer yields a well-defined set
    /// of tags.
    pub fn is_usable_as_answer(&self) -> bool {
        match self {
            TagsFilter::Tag(_) => true,
            TagsFilter::Substituting(tag) => !tag.invert,
            TagsFilter::And(exprs) => exprs.iter().all(TagsFilter::is_usable_as_answer),
            TagsFilter::Regex(_) | TagsFilter::Comparing(_) | TagsFilter::Or(_) => false,
        }
    }

    /// The concrete writes that make this filter true for a feature with the
    /// `current` tags.
    pub fn as_change(&self, current: &Properties) -> Result<Vec<TagChange>, TagError> {
        match self {
            TagsFilter::Tag(tag) => Ok(vec![TagChange::new(&tag.key, &tag.value)]),
            TagsFilter::Substituting(tag) => {
                if tag.invert {
                    return Err(TagError::NotAChange(self.to_string()));
                }
                let (value, complete) = substitute(&tag.template, current, true);
                if !complete {
                    return Err(TagError::UnresolvedPlaceholder {
                        key: tag.key.clone(),
                        value,
                    });
                }
                Ok(vec![TagChange::new(&tag.key, value)])
            }
            TagsFilter::And(exprs) => {
                let mut changes = Vec::new();
                for expr in exprs {
                    changes.extend(expr.as_change(current)?);
                }
                Ok(changes)
            }
            TagsFilter::Regex(_) | TagsFilter::Comparing(_) | TagsFilter::Or(_) => {
                Err(TagError::NotAChange(self.to_string()))
            }
        }
    }
}

fn regex_human_string(tag: &RegexTag) -> String {
    match (&tag.key, &tag.value) {
        (KeyMatcher::Exact(key), ValueMatcher::Literal(value)) => {
            format!("{}{}={}", key, if tag.invert { "!" } else { "" }, value)
        }
        (KeyMatcher::Exact(key), ValueMatcher::Pattern(pattern)) => {
            format!("{}{}~{}", key, if tag.invert { "!" } else { "" }, pattern.fragment())
        }
        (KeyMatcher::Pattern(key), _) => {
            let op = if tag.invert { "!~" } else { "~~" };
            format!("{}{}{}", key.fragment(), op, tag.value_source())
        }
    }
}

fn join<F>(exprs: &[TagsFilter], separator: &str, toplevel: bool, render: F) -> String
where
    F: Fn(&TagsFilter) -> String,
{
    let joined = exprs.iter().map(render).collect::<Vec<_>>().join(separator);
    if toplevel { joined } else { format!("({})", joined) }
}

impl TagsFilter {
    fn compact(&self, toplevel: bool) -> String {
        match self {
            TagsFilter::And(exprs) => join(exprs, "&", toplevel, |e| e.compact(false)),
            TagsFilter::Or(exprs) => join(exprs, "|", toplevel, |e| e.compact(false)),
            atomic => quote_atom(&atomic.human(false, false, &Properties::new(), true)).into_owned(),
        }
    }
}

/// The compact syntax, readable back with `parse_expression`. Tags whose
/// text would be split or rejected by the lexer are quoted.
impl fmt::Display for TagsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ast::SubstitutingTag;
    use crate::dsl::{parse_expression, parse_tag};

    fn tags(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn p(s: &str) -> TagsFilter {
        parse_tag(s, "test").unwrap()
    }

    #[test]
    fn test_atomic_strings() {
        assert_eq!(p("key=value").to_string(), "key=value");
        assert_eq!(p("key!=value").to_string(), "key!=value");
        assert_eq!(p("key!=").to_string(), "key~..*");
        assert_eq!(p("key~*").to_string(), "key~..*");
        assert_eq!(p("x!~y").to_string(), "x!~y");
        assert_eq!(p("xyz<5").to_string(), "xyz<5");
        assert_eq!(p("service:bicycle:.*~~*").to_string(), "service:bicycle:.*~~..*");
        assert_eq!(p("survey:date:={_date:now}").to_string(), "survey:date:={_date:now}");
    }

    #[test]
    fn test_nested_groups() {
        let f = TagsFilter::And(vec![
            TagsFilter::tag("a", "1"),
            TagsFilter::Or(vec![TagsFilter::tag("b", "2"), TagsFilter::tag("c", "3")]),
        ]);
        assert_eq!(f.to_string(), "a=1&(b=2|c=3)");
    }

    #[test]
    fn test_round_trip() {
        for s in [
            "a=1&(b=2|c~3.*)",
            "highway!~pedestrian|living_street&access!~destination",
            "(lanes>=2&oneway=yes)|name~..*",
            "survey:date:={_date:now}&check_date<2020-01-01",
            "service:bicycle:.*~~..*|amenity!=",
        ] {
            let f = parse_expression(s, "test").unwrap();
            let again = parse_expression(&f.to_string(), "test").unwrap();
            assert_eq!(f, again, "round trip of {}", s);
        }
    }

    #[test]
    fn test_round_trip_of_tags_with_separators() {
        let bag = tags(&[("_tags", "shop=b")]);
        let f = p("_tags~.*amenity=a.*|.*shop=b.*");
        assert_eq!(f.to_string(), r#""_tags~.*amenity=a.*|.*shop=b.*""#);
        let again = parse_expression(&f.to_string(), "test").unwrap();
        assert_eq!(again, f);
        assert!(again.matches_properties(&bag));

        for f in [
            TagsFilter::And(vec![p("name=:-)"), p("a=b")]),
            TagsFilter::And(vec![TagsFilter::tag("note", "x&y=z"), p("a=b")]),
            TagsFilter::Or(vec![p("a=b"), TagsFilter::And(vec![p("name=(x"), p("c~d|e")])]),
            TagsFilter::And(vec![TagsFilter::tag("\"k\"", "v"), TagsFilter::tag("path", "C:\\dir&x=y")]),
        ] {
            let again = parse_expression(&f.to_string(), "test").unwrap();
            assert_eq!(again, f, "round trip of {}", f);
        }
        assert_eq!(
            TagsFilter::And(vec![p("name=:-)"), p("a=b")]).to_string(),
            r#""name=:-)"&a=b"#
        );
    }

    #[test]
    fn test_human_string_shortens_and_links() {
        let f = TagsFilter::tag("name", "A very long name that keeps on going");
        assert_eq!(f.as_human_string(false, true, &Properties::new()), "name=A very long name that ...");
        let linked = TagsFilter::tag("amenity", "cafe").as_human_string(true, false, &Properties::new());
        assert!(linked.contains("wiki/Key:amenity"));
        assert!(linked.contains("wiki/Tag:amenity%3Dcafe"));
    }

    #[test]
    fn test_human_string_strikes_removed_key() {
        let f = TagsFilter::tag("fixme", "");
        assert_eq!(
            f.as_human_string(false, false, &tags(&[("fixme", "check")])),
            "<span class='line-through'>fixme</span>"
        );
        assert_eq!(f.as_human_string(false, false, &Properties::new()), "fixme=");
    }

    #[test]
    fn test_human_string_resolves_templates() {
        let f: TagsFilter = SubstitutingTag::new("addr:street", "{_street}", false).into();
        assert_eq!(
            f.as_human_string(false, false, &tags(&[("_street", "Main")])),
            "addr:street:=Main"
        );
    }

    #[test]
    fn test_used_keys() {
        let f = parse_expression("a=1&(b~x|c<3)&service:.*~~..*", "test").unwrap();
        let keys: Vec<_> = f.used_keys().into_iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_as_change() {
        let f = TagsFilter::And(vec![
            TagsFilter::tag("amenity", "cafe"),
            SubstitutingTag::new("check_date", "{_now:date}", false).into(),
        ]);
        let changes = f.as_change(&tags(&[("_now:date", "2024-05-01")])).unwrap();
        assert_eq!(
            changes,
            vec![TagChange::new("amenity", "cafe"), TagChange::new("check_date", "2024-05-01")]
        );
        assert!(matches!(
            f.as_change(&Properties::new()),
            Err(TagError::UnresolvedPlaceholder { .. })
        ));
    }

    #[test]
    fn test_as_change_rejects_non_assignments() {
        let bag = Properties::new();
        assert!(matches!(p("a~b").as_change(&bag), Err(TagError::NotAChange(_))));
        assert!(matches!(p("a<3").as_change(&bag), Err(TagError::NotAChange(_))));
        assert!(matches!(p("a!:=b").as_change(&bag), Err(TagError::NotAChange(_))));
        let or = TagsFilter::Or(vec![TagsFilter::tag("a", "b")]);
        assert!(matches!(or.as_change(&bag), Err(TagError::NotAChange(_))));
    }

    #[test]
    fn test_usable_as_answer() {
        assert!(p("a=b").is_usable_as_answer());
        assert!(p("a:={b}").is_usable_as_answer());
        assert!(!p("a!:={b}").is_usable_as_answer());
        assert!(!p("a~b").is_usable_as_answer());
        assert!(!TagsFilter::Or(vec![p("a=b")]).is_usable_as_answer());
        assert!(TagsFilter::And(vec![p("a=b"), p("c=d")]).is_usable_as_answer());
    }
}
