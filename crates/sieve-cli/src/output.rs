//! Text and JSON rendering of compile results.

use anyhow::{Context, Result};
use serde::Serialize;
use sieve_query::{AttributeValue, Expr, Provider, RenderedQuery};

use crate::cli::OutputFormat;

/// Printed when the query was blank
const NO_FILTER: &str = "(no filter)";

#[derive(Serialize)]
struct JsonOutput<'a> {
    provider: Provider,
    filter: Option<&'a RenderedQuery>,
}

pub fn format_rendered(
    provider: Provider,
    rendered: Option<&RenderedQuery>,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&JsonOutput {
            provider,
            filter: rendered,
        })
        .context("Failed to serialize output as JSON"),
        OutputFormat::Text => Ok(match rendered {
            None => NO_FILTER.to_string(),
            Some(rendered) => format_text(rendered)?,
        }),
    }
}

fn format_text(rendered: &RenderedQuery) -> Result<String> {
    let mut lines = vec![rendered.text().to_string()];
    match rendered {
        RenderedQuery::Sql(fragment) => {
            for (i, value) in fragment.params.iter().enumerate() {
                lines.push(format!("  [{}] {}", i + 1, value));
            }
        }
        RenderedQuery::Partiql(fragment) => {
            for (i, value) in fragment.attribute_values.iter().enumerate() {
                let (tag, text) = match value {
                    AttributeValue::S(s) => ("S", s),
                    AttributeValue::N(n) => ("N", n),
                };
                let text = serde_json::to_string(text).context("Failed to format value")?;
                lines.push(format!("  [{}] {tag} {text}", i + 1));
            }
        }
    }
    Ok(lines.join("\n"))
}

pub fn format_tree(tree: Option<&Expr>, format: OutputFormat) -> Result<String> {
    match (tree, format) {
        (None, OutputFormat::Text) => Ok(NO_FILTER.to_string()),
        (tree, OutputFormat::Json) => {
            serde_json::to_string_pretty(&tree).context("Failed to serialize tree as JSON")
        }
        (Some(tree), OutputFormat::Text) => {
            serde_json::to_string(tree).context("Failed to serialize tree")
        }
    }
}
