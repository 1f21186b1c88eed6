use crate::dsl::Properties;
use anyhow::Result;
use serde_json::Value;

pub mod jsonl;

pub use self::jsonl::JsonlSink;

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValue {
    String(String),
    Bool(bool),
    /// Removes the property.
    Null,
}

/// One input document, its tags, and the columns computed for it.
#[derive(Clone, Debug)]
pub struct FeatureRow {
    /// The document as read, written back with `columns` merged in.
    pub document: Value,
    pub properties: Properties,
    pub columns: Vec<(String, ColumnValue)>,
}

impl FeatureRow {
    pub fn push_column(&mut self, name: impl Into<String>, value: ColumnValue) {
        self.columns.push((name.into(), value));
    }
}

pub trait DataSink: Send {
    fn add_feature(&mut self, row: FeatureRow) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
