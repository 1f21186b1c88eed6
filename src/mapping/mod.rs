//! Mapping rules for derived columns.
//!
//! Mappings provide first-match-wins rule evaluation to classify
//! features into categories, e.g. which icon or label to render.

mod rules;

pub use rules::{CompiledRule, Mapping, MappingConfig, MappingRule, evaluate_mapping};
