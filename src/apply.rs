//! Tag-apply specifications: `key=value;other=$source_key`.
//!
//! Parts are separated by `;` (`\;` keeps a literal semicolon). In values,
//! `$name` is replaced by the bag's value for `name`, where a name is made of
//! `[A-Za-z0-9_:]`. A spec that is nothing but `$name` is first replaced by
//! the bag's value for `name`, so a feature can carry its own spec.

use crate::dsl::{Properties, Tag, TagError};

fn invalid(spec: &str, reason: impl Into<String>) -> TagError {
    TagError::InvalidApplySpec {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

/// Split a spec into trimmed `(key, value)` pairs.
pub fn parse_tag_spec(spec: &str) -> Result<Vec<(String, String)>, TagError> {
    let mut pairs = Vec::new();
    for part in split_unescaped(spec) {
        let kv: Vec<String> = part.split('=').map(|s| s.trim().replace("\\;", ";")).collect();
        match kv.as_slice() {
            [key, value] => {
                if key.ends_with(':') {
                    return Err(invalid(
                        spec,
                        format!("key '{}' ends with ':', write 'key=$otherkey' instead of 'key:=otherkey'", key),
                    ));
                }
                pairs.push((key.clone(), value.clone()));
            }
            [_] => return Err(invalid(spec, format!("no '=' found in '{}'", part))),
            _ => return Err(invalid(spec, format!("multiple '=' found in '{}'", part))),
        }
    }
    Ok(pairs)
}

/// Parts between `;` that are not preceded by a backslash. A trailing `;`
/// does not start an empty part.
fn split_unescaped(spec: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev = None;
    for (i, c) in spec.char_indices() {
        if c == ';' && prev != Some('\\') {
            parts.push(&spec[start..i]);
            start = i + 1;
        }
        prev = Some(c);
    }
    if start < spec.len() {
        parts.push(&spec[start..]);
    }
    parts
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Replace each `$name` in `value` with the bag's value (empty when absent).
fn substitute_references(value: &str, properties: &Properties) -> String {
    let mut parts = value.split('$');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let end = part.find(|c: char| !is_name_char(c)).unwrap_or(part.len());
        let (name, rest) = part.split_at(end);
        if let Some(v) = properties.get(name) {
            out.push_str(v);
        }
        out.push_str(rest);
    }
    out
}

/// The tags a spec writes onto a feature with the given properties.
pub fn generate_tags_to_apply(spec: &str, properties: &Properties) -> Result<Vec<Tag>, TagError> {
    let resolved;
    let spec = if !spec.contains(';') && !spec.contains('=') && spec.contains('$') {
        let name = spec.replacen('$', "", 1);
        resolved = properties
            .get(&name)
            .cloned()
            .ok_or_else(|| invalid(spec, format!("the feature has no '{}' to read a spec from", name)))?;
        tracing::debug!("Apply: read spec '{}' from '{}'", resolved, name);
        resolved.as_str()
    } else {
        spec
    };

    Ok(parse_tag_spec(spec)?
        .into_iter()
        .map(|(key, value)| {
            if value.contains('$') {
                Tag::new(key, substitute_references(&value, properties))
            } else {
                Tag::new(key, value)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn pairs(spec: &str) -> Vec<(String, String)> {
        parse_tag_spec(spec).unwrap()
    }

    fn kv(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_parse_tag_spec() {
        assert_eq!(pairs("key=value;key0=value0"), vec![kv("key", "value"), kv("key0", "value0")]);
        assert_eq!(pairs(" key = value ;"), vec![kv("key", "value")]);
        assert!(pairs("").is_empty());
    }

    #[test]
    fn test_parse_tag_spec_escaped_semicolon() {
        assert_eq!(
            pairs("key=value;key0=value0\\;value1"),
            vec![kv("key", "value"), kv("key0", "value0;value1")]
        );
    }

    #[test]
    fn test_parse_tag_spec_errors() {
        assert!(matches!(parse_tag_spec("novalue"), Err(TagError::InvalidApplySpec { .. })));
        assert!(matches!(parse_tag_spec("a=b=c"), Err(TagError::InvalidApplySpec { .. })));
        let err = parse_tag_spec("a=b=c").unwrap_err();
        assert!(err.to_string().contains("multiple '='"));
        let err = parse_tag_spec("addr:street:=name").unwrap_err();
        assert!(err.to_string().contains("ends with ':'"));
    }

    #[test]
    fn test_generate_substitutes_references() {
        let bag = tags(&[("_now:date", "2024-05-01"), ("name", "Central")]);
        let generated = generate_tags_to_apply("survey:date=$_now:date;ref=x-$name-y;fixme=$missing", &bag).unwrap();
        assert_eq!(
            generated,
            vec![
                Tag::new("survey:date", "2024-05-01"),
                Tag::new("ref", "x-Central-y"),
                Tag::new("fixme", ""),
            ]
        );
    }

    #[test]
    fn test_generate_reads_spec_from_feature() {
        let bag = tags(&[("_to_apply", "amenity=bench;backrest=yes")]);
        assert_eq!(
            generate_tags_to_apply("$_to_apply", &bag).unwrap(),
            vec![Tag::new("amenity", "bench"), Tag::new("backrest", "yes")]
        );
        assert!(generate_tags_to_apply("$_absent", &bag).is_err());
    }
}
