//! Tag usage counts, used to evaluate popular (cheap to index) tags first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Usage totals per key and per key/value pair, in the layout of a
/// `key_totals.json` export:
///
/// ```json
/// { "keys": { "amenity": 2400000 }, "tags": { "amenity": { "cafe": 480000 } } }
/// ```
///
/// Loaded once and passed by reference to whoever sorts filters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct KeyCounts {
    #[serde(default)]
    pub keys: HashMap<String, u64>,
    #[serde(default)]
    pub tags: HashMap<String, HashMap<String, u64>>,
}

impl KeyCounts {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Popularity: Failed to read {:?}", path))?;
        let counts: KeyCounts = serde_json::from_str(&raw)
            .with_context(|| format!("Popularity: Failed to parse {:?}", path))?;
        tracing::info!(
            "Popularity: {} keys, {} keys with value counts",
            counts.keys.len(),
            counts.tags.len()
        );
        Ok(counts)
    }

    /// The key/value count when known, otherwise the count of the key alone.
    pub fn get_count(&self, key: &str, value: Option<&str>) -> Option<u64> {
        value
            .and_then(|v| self.tags.get(key)?.get(v).copied())
            .or_else(|| self.keys.get(key).copied())
    }
}
