use crate::dsl::{TagSpec, TagsFilter, parse};
use crate::mapping::{Mapping, MappingConfig};
use crate::popularity::KeyCounts;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A theme file: named filters, classification mappings and an optional
/// popularity table.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ThemeConfig {
    /// Path of a `key_totals.json`, relative to the config file.
    #[serde(default)]
    pub key_counts: Option<PathBuf>,
    #[serde(default)]
    pub filters: BTreeMap<String, TagSpec>,
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingConfig>,
}

impl ThemeConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()
            .with_context(|| format!("Config: Failed to read {:?}", path))?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse every filter and mapping. `path` names the file in error
    /// contexts and anchors the relative `key_counts` path.
    pub fn compile(&self, path: &Path) -> anyhow::Result<Theme> {
        let file = path.display().to_string();

        let mut filters = Vec::with_capacity(self.filters.len());
        for (name, spec) in &self.filters {
            let context = format!("{}: filters.{}", file, name);
            let filter = parse(spec, &context).with_context(|| format!("Config: Invalid filter '{}'", name))?;
            filters.push((name.clone(), filter));
        }

        let mut mappings = Vec::with_capacity(self.mappings.len());
        for (name, mapping) in &self.mappings {
            mappings.push(Mapping::compile(name, mapping, &file)?);
        }

        let key_counts = match &self.key_counts {
            Some(counts) => {
                let resolved = path.parent().map(|dir| dir.join(counts)).unwrap_or_else(|| counts.clone());
                Some(KeyCounts::load(&resolved)?)
            }
            None => None,
        };

        tracing::info!(
            "Config: {} filters, {} mappings from {}",
            filters.len(),
            mappings.len(),
            file
        );
        Ok(Theme {
            filters,
            mappings,
            key_counts,
        })
    }
}

/// A compiled theme, in name order.
#[derive(Debug)]
pub struct Theme {
    pub filters: Vec<(String, TagsFilter)>,
    pub mappings: Vec<Mapping>,
    pub key_counts: Option<KeyCounts>,
}

impl Theme {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        ThemeConfig::load(path)?.compile(path)
    }
}
