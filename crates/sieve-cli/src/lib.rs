//! Command-line front end for the sieve filter compiler
//!
//! Loads a field schema and limits from `sieve.toml`, compiles one query
//! for one provider and prints the fragment with its bound values.

pub mod cli;
pub mod config;
pub mod output;

use anyhow::{bail, Result};
use tracing::info;

use crate::cli::{Cli, OutputFormat};
use crate::config::CliConfig;

/// Compile the query described by `cli` and return the printable result
pub fn run(cli: &Cli) -> Result<String> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli);

    if cli.show_config {
        return match cli.format {
            OutputFormat::Text => config.display_as_toml(),
            OutputFormat::Json => config.display_as_json(),
        };
    }

    let Some(query) = cli.query.as_deref() else {
        bail!("A query is required unless --show-config is given");
    };
    let parser = config.build_parser()?;

    if cli.tree {
        let tree = parser.parse(query)?;
        return output::format_tree(tree.as_ref(), cli.format);
    }

    let rendered = parser.compile(query, cli.provider)?;
    info!(
        provider = %cli.provider,
        values = rendered.as_ref().map_or(0, |r| r.value_count()),
        "compiled filter"
    );
    output::format_rendered(cli.provider, rendered.as_ref(), cli.format)
}
