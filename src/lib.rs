//! OSM tag filter expressions.
//!
//! [`dsl`] parses tag conditions (`amenity=cafe`, `{or: [...]}`,
//! `a=b&(c~d|e<3)`) into [`dsl::TagsFilter`] trees and evaluates them against
//! property bags. [`algebra`] reasons about lists of filters, and the
//! remaining modules load themes and stream features for the `tagmatch` CLI.

pub mod algebra;
pub mod apply;
pub mod config;
pub mod dsl;
pub mod mapping;
pub mod popularity;
pub mod sinks;
pub mod source;
