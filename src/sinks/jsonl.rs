use super::{ColumnValue, DataSink, FeatureRow};
use crate::source::is_feature;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes each row back in the shape it was read (plain object or GeoJSON
/// feature), one document per line, with its columns set on the tags.
pub struct JsonlSink {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl JsonlSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Sink: Failed to create {:?}", path.as_ref()))?;
        Ok(Self::from_writer(file))
    }

    pub fn stdout() -> Result<Self> {
        Ok(Self::from_writer(std::io::stdout()))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: BufWriter::new(Box::new(writer)),
        }
    }
}

fn tags_mut(document: &mut Value) -> Option<&mut Map<String, Value>> {
    if is_feature(document) {
        let object = document.as_object_mut()?;
        let properties = object
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if properties.is_null() {
            *properties = Value::Object(Map::new());
        }
        return properties.as_object_mut();
    }
    document.as_object_mut()
}

impl DataSink for JsonlSink {
    fn add_feature(&mut self, row: FeatureRow) -> Result<()> {
        let mut document = row.document;
        if let Some(tags) = tags_mut(&mut document) {
            for (name, value) in row.columns {
                match value {
                    ColumnValue::String(val) => tags.insert(name, Value::String(val)),
                    ColumnValue::Bool(val) => tags.insert(name, Value::Bool(val)),
                    ColumnValue::Null => tags.remove(&name),
                };
            }
        }

        serde_json::to_writer(&mut self.writer, &document)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
