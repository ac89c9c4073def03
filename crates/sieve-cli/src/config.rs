//! `sieve.toml` loading.
//!
//! ```toml
//! [limits]
//! max_query_length = 10000
//! max_nesting_depth = 20
//! max_term_count = 100
//!
//! [[fields]]
//! name = "name"
//! kind = "text"
//!
//! [[fields]]
//! name = "meta"
//! kind = "structured"
//! implicit = false
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sieve_query::{FieldDescriptor, FieldSchema, ParserConfiguration, QueryParser};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::Cli;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "sieve.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub limits: ParserConfiguration,
    pub fields: Vec<FieldDescriptor>,
}

impl CliConfig {
    /// Load from `path`, or from `./sieve.toml` when present, or defaults.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(&fallback)
                } else {
                    debug!("no config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), fields = config.fields.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `--max-*` flags on top of the file values
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(max) = cli.max_query_length {
            self.limits.max_query_length = max;
        }
        if let Some(max) = cli.max_nesting_depth {
            self.limits.max_nesting_depth = max;
        }
        if let Some(max) = cli.max_term_count {
            self.limits.max_term_count = max;
        }
    }

    pub fn build_parser(&self) -> Result<QueryParser> {
        if self.fields.is_empty() {
            bail!("No fields configured; add [[fields]] entries to {DEFAULT_CONFIG_FILE}");
        }
        let schema = FieldSchema::new(self.fields.clone()).context("Invalid field schema")?;
        QueryParser::new(schema, self.limits).context("Invalid limits")
    }

    /// Display the configuration as TOML
    pub fn display_as_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config as TOML")
    }

    /// Display the configuration as JSON
    pub fn display_as_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config as JSON")
    }
}
