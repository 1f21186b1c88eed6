//! JSON-lines input of property bags.
//!
//! Each non-empty line is either a plain JSON object of tags or a GeoJSON
//! feature whose `properties` hold the tags. Values that are not strings are
//! stringified (`3` → `"3"`, `true` → `"true"`); `null` values are skipped.

use crate::dsl::Properties;
use crate::sinks::FeatureRow;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct JsonlSource {
    reader: Box<dyn BufRead>,
    line: usize,
}

impl JsonlSource {
    /// Read from `path`, or from stdin for `None` and `-`.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let reader: Box<dyn BufRead> = match path {
            Some(p) if p != Path::new("-") => {
                let file = File::open(p).with_context(|| format!("Source: Failed to open {:?}", p))?;
                Box::new(BufReader::new(file))
            }
            _ => Box::new(BufReader::new(std::io::stdin())),
        };
        Ok(Self { reader, line: 0 })
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            line: 0,
        }
    }
}

impl Iterator for JsonlSource {
    type Item = Result<FeatureRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = String::new();
        loop {
            buf.clear();
            self.line += 1;
            match self.reader.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(_) if buf.trim().is_empty() => continue,
                Ok(_) => {
                    let line = self.line;
                    return Some(
                        serde_json::from_str(buf.trim())
                            .map_err(anyhow::Error::from)
                            .and_then(FeatureRow::from_document)
                            .with_context(|| format!("Source: Invalid input on line {}", line)),
                    );
                }
                Err(e) => return Some(Err(e).context("Source: Failed to read input")),
            }
        }
    }
}

impl FeatureRow {
    pub fn from_document(document: Value) -> Result<Self> {
        let properties = if is_feature(&document) {
            match document.get("properties") {
                Some(Value::Object(object)) => to_properties(object),
                Some(Value::Null) | None => Properties::new(),
                Some(_) => bail!("feature properties must be an object"),
            }
        } else {
            match document.as_object() {
                Some(object) => to_properties(object),
                None => bail!("expected a JSON object or a GeoJSON feature"),
            }
        };
        Ok(FeatureRow {
            document,
            properties,
            columns: Vec::new(),
        })
    }
}

pub(crate) fn is_feature(document: &Value) -> bool {
    document.get("type").and_then(Value::as_str) == Some("Feature")
}

fn to_properties(object: &Map<String, Value>) -> Properties {
    object
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn rows(input: &str) -> Vec<Result<FeatureRow>> {
        JsonlSource::from_reader(Cursor::new(input.to_string())).collect()
    }

    #[test]
    fn test_plain_objects() {
        let rows = rows("{\"amenity\": \"cafe\", \"level\": 2, \"wifi\": true, \"fixme\": null}\n\n{\"shop\": \"bakery\"}\n");
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.properties["amenity"], "cafe");
        assert_eq!(first.properties["level"], "2");
        assert_eq!(first.properties["wifi"], "true");
        assert!(!first.properties.contains_key("fixme"));
    }

    #[test]
    fn test_geojson_feature() {
        let rows = rows(
            r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [4.3, 50.8]}, "properties": {"highway": "bus_stop"}}"#,
        );
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.properties.len(), 1);
        assert_eq!(row.properties["highway"], "bus_stop");
        assert!(row.document.get("geometry").is_some());
    }

    #[test]
    fn test_feature_without_properties() {
        let rows = rows(r#"{"type": "Feature", "geometry": null, "properties": null}"#);
        assert!(rows[0].as_ref().unwrap().properties.is_empty());
    }

    #[test]
    fn test_invalid_line_reports_number() {
        let rows = rows("{\"a\": \"b\"}\n[1, 2]\nnot json\n");
        assert!(rows[0].is_ok());
        let err = rows[1].as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
        let err = rows[2].as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }
}
