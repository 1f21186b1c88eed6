use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};

use tagmatch::algebra::{contains_opposite_tags, is_valid_key, remove_equivalents, sort_filters};
use tagmatch::apply::generate_tags_to_apply;
use tagmatch::config::Theme;
use tagmatch::dsl::{Tag, TagChange, TagsFilter, parse_filter};
use tagmatch::mapping::evaluate_mapping;
use tagmatch::popularity::KeyCounts;
use tagmatch::sinks::{ColumnValue, DataSink, FeatureRow, JsonlSink};
use tagmatch::source::JsonlSource;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a filter and print its canonical form as JSON
    Parse {
        /// Filter expression, or a YAML/JSON document starting with '{'
        filter: String,

        /// Context named in parse errors
        #[arg(long, default_value = "command line")]
        context: String,
    },

    /// Write the input features that match a filter
    Match {
        #[arg(short, long)]
        filter: String,

        /// Write the features that do not match instead
        #[arg(long)]
        invert: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Add one column per filter and mapping of a theme file
    Classify {
        /// Theme configuration file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Sort the children of an and/or filter: regex tags last, rare tags first
    Sort {
        filter: String,

        /// Tag usage counts (JSON with 'keys' and 'tags')
        #[arg(long, env = "TAGMATCH_KEY_COUNTS")]
        key_counts: Option<PathBuf>,

        /// Also drop children that another child already covers
        #[arg(long)]
        dedup: bool,
    },

    /// Write tags onto each input feature
    Apply {
        /// Tag-apply specification, e.g. 'survey:date=$_now:date;fixme='
        #[arg(long, conflicts_with = "filter", required_unless_present = "filter")]
        spec: Option<String>,

        /// Filter to materialize as tag changes
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        io: IoArgs,
    },
}

#[derive(Args)]
pub struct IoArgs {
    /// Input JSON-lines file ('-' for stdin)
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Output JSON-lines file ('-' for stdout)
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,
}

pub fn run(cli: &Cli) -> Result<u64> {
    match &cli.command {
        Command::Parse { filter, context } => {
            let filter = read_filter(filter, context)?;
            println!("{}", serde_json::to_string_pretty(&describe(&filter))?);
            Ok(1)
        }
        Command::Match { filter, invert, io } => {
            let filter = read_filter(filter, "--filter")?;
            stream(io, |row| Ok(filter.matches_properties(&row.properties) != *invert))
        }
        Command::Classify { config, io } => {
            let theme = Theme::load(config)?;
            stream(io, |row| {
                for (name, filter) in &theme.filters {
                    let matched = filter.matches_properties(&row.properties);
                    row.push_column(name.as_str(), ColumnValue::Bool(matched));
                }
                for mapping in &theme.mappings {
                    if let Some(value) = evaluate_mapping(mapping, &row.properties) {
                        row.push_column(mapping.name.as_str(), ColumnValue::String(value));
                    }
                }
                Ok(true)
            })
        }
        Command::Sort {
            filter,
            key_counts,
            dedup,
        } => {
            let counts = key_counts.as_deref().map(KeyCounts::load).transpose()?;
            let sorted = sort_children(read_filter(filter, "command line")?, counts.as_ref(), *dedup);
            println!("{}", sorted);
            Ok(1)
        }
        Command::Apply { spec, filter, io } => match (spec, filter) {
            (Some(spec), _) => stream(io, |row| {
                match generate_tags_to_apply(spec, &row.properties) {
                    Ok(tags) => set_tags(row, tags.iter().map(|Tag { key, value }| (key, value))),
                    Err(e) => tracing::warn!("Apply: {}, feature left unchanged", e),
                }
                Ok(true)
            }),
            (None, Some(filter)) => {
                let filter = read_filter(filter, "--filter")?;
                if !filter.is_usable_as_answer() {
                    bail!("CLI: '{}' does not describe a set of tags to write", filter);
                }
                stream(io, |row| {
                    match filter.as_change(&row.properties) {
                        Ok(changes) => set_tags(row, changes.iter().map(|TagChange { key, value }| (key, value))),
                        Err(e) => tracing::warn!("Apply: {}, feature left unchanged", e),
                    }
                    Ok(true)
                })
            }
            (None, None) => bail!("CLI: apply needs --spec or --filter"),
        },
    }
}

/// A command-line filter: YAML/JSON when it starts with '{', the compound
/// expression syntax otherwise.
pub fn read_filter(input: &str, context: &str) -> Result<TagsFilter> {
    parse_filter(input, context).with_context(|| format!("CLI: Invalid filter '{}'", input))
}

pub fn describe(filter: &TagsFilter) -> serde_json::Value {
    let keys = filter.used_keys();
    let nonstandard: Vec<&String> = keys.iter().filter(|k| !is_valid_key(k)).collect();
    json!({
        "filter": filter.to_string(),
        "keys": keys,
        "nonstandard_keys": nonstandard,
        "usable_as_answer": filter.is_usable_as_answer(),
    })
}

pub fn sort_children(filter: TagsFilter, counts: Option<&KeyCounts>, dedup: bool) -> TagsFilter {
    let order = |mut children: Vec<TagsFilter>| {
        if dedup {
            children = remove_equivalents(&children);
        }
        sort_filters(&mut children, counts);
        children
    };
    match filter {
        TagsFilter::And(children) => {
            if contains_opposite_tags(&children) {
                tracing::warn!("Sort: the and-group contains opposite tags, it probably never matches");
            }
            TagsFilter::And(order(children))
        }
        TagsFilter::Or(children) => TagsFilter::Or(order(children)),
        atomic => atomic,
    }
}

/// Empty values remove the key.
fn set_tags<'a>(row: &mut FeatureRow, tags: impl Iterator<Item = (&'a String, &'a String)>) {
    for (key, value) in tags {
        let column = if value.is_empty() {
            ColumnValue::Null
        } else {
            ColumnValue::String(value.clone())
        };
        row.push_column(key.as_str(), column);
    }
}

pub fn init_sink(output: &Path) -> Result<Box<dyn DataSink + Send>> {
    if output == Path::new("-") {
        tracing::info!("Sink: jsonl -> stdout");
        Ok(Box::new(JsonlSink::stdout()?))
    } else {
        tracing::info!("Sink: jsonl -> {:?}", output);
        Ok(Box::new(JsonlSink::new(output)?))
    }
}

/// Read every input row, let `process` add columns, and write the rows it
/// keeps. Returns the number written.
fn stream<F>(io: &IoArgs, mut process: F) -> Result<u64>
where
    F: FnMut(&mut FeatureRow) -> Result<bool>,
{
    let source = JsonlSource::open(Some(&io.input))?;
    let mut sink = init_sink(&io.output)?;
    let mut read = 0u64;
    let mut written = 0u64;

    for row in source {
        let mut row = row?;
        read += 1;
        if process(&mut row)? {
            sink.add_feature(row)?;
            written += 1;
        }
    }

    sink.finish().context("Pipeline: Failed to finalize sink")?;
    tracing::info!("Pipeline: {} of {} features written", written, read);
    Ok(written)
}
