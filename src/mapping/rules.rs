//! Mapping rule definitions and evaluation.

use crate::dsl::{Properties, TagSpec, TagsFilter, evaluate_filter, parse};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A mapping definition with ordered rules.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub name: String,
    pub rules: Vec<CompiledRule>,
    pub default: Option<String>,
}

/// A compiled mapping rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub filter: TagsFilter,
    pub value: String,
}

/// Raw mapping rule from YAML (before compilation).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingRule {
    /// The condition, a tag string or an `and`/`or` group
    #[serde(rename = "if")]
    pub condition: TagSpec,
    /// The value to return if this rule matches
    #[serde(rename = "then")]
    pub value: String,
}

/// Raw mapping from YAML (before compilation).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    pub rules: Vec<MappingRule>,
    #[serde(default)]
    pub default: Option<String>,
}

impl Mapping {
    /// Compile a mapping from config. `context` prefixes the rule path in
    /// parse errors, usually the config file name.
    pub fn compile(name: &str, config: &MappingConfig, context: &str) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());

        for (i, rule) in config.rules.iter().enumerate() {
            let path = format!("{}: mappings.{}.rules[{}]", context, name, i);
            let filter = parse(&rule.condition, &path)
                .map_err(|e| anyhow::anyhow!("Error parsing rule {} in mapping '{}': {}", i + 1, name, e))?;

            rules.push(CompiledRule {
                filter,
                value: rule.value.clone(),
            });
        }

        tracing::debug!("Mapping '{}': {} rules", name, rules.len());
        Ok(Mapping {
            name: name.to_string(),
            rules,
            default: config.default.clone(),
        })
    }
}

/// Evaluate a mapping against tags, returning the first matching value.
pub fn evaluate_mapping(mapping: &Mapping, tags: &Properties) -> Option<String> {
    for rule in &mapping.rules {
        if evaluate_filter(&rule.filter, tags) {
            return Some(rule.value.clone());
        }
    }

    mapping.default.clone()
}
