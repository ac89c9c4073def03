//! Safety limits applied before any grammar work.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 20;
pub const DEFAULT_MAX_TERM_COUNT: usize = 100;

/// Bounds on query size, fixed when a parser is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfiguration {
    /// Maximum query length in bytes
    pub max_query_length: usize,
    /// Maximum bracket nesting depth
    pub max_nesting_depth: usize,
    /// Maximum number of terms (fielded values, bare terms, phrases, ranges)
    pub max_term_count: usize,
}

impl Default for ParserConfiguration {
    fn default() -> Self {
        Self {
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_term_count: DEFAULT_MAX_TERM_COUNT,
        }
    }
}

impl ParserConfiguration {
    pub fn with_max_query_length(mut self, max: usize) -> Self {
        self.max_query_length = max;
        self
    }

    pub fn with_max_nesting_depth(mut self, max: usize) -> Self {
        self.max_nesting_depth = max;
        self
    }

    pub fn with_max_term_count(mut self, max: usize) -> Self {
        self.max_term_count = max;
        self
    }

    /// Reject limits that would refuse every query
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_query_length == 0 {
            return Err(ConfigurationError::ZeroLimit("max_query_length"));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigurationError::ZeroLimit("max_nesting_depth"));
        }
        if self.max_term_count == 0 {
            return Err(ConfigurationError::ZeroLimit("max_term_count"));
        }
        Ok(())
    }
}
