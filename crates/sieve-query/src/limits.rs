//! Safety validator.
//!
//! Bounds query length, bracket depth and term count before the grammar runs
//! so adversarial input cannot drive parse cost. All three checks always run
//! and every violation is reported in one error.

use crate::config::ParserConfiguration;
use crate::error::{LimitExceededError, LimitViolation};
use crate::scan::scan;

/// Measured size of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    /// Length in bytes
    pub length: usize,
    pub depth: usize,
    pub terms: usize,
}

impl QueryStats {
    pub fn measure(raw: &str) -> Self {
        let scanned = scan(raw);
        Self {
            length: raw.len(),
            depth: scanned.max_depth,
            terms: scanned.term_count(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyValidator {
    config: ParserConfiguration,
}

impl SafetyValidator {
    pub fn new(config: ParserConfiguration) -> Self {
        Self { config }
    }

    pub fn validate(&self, raw: &str) -> Result<QueryStats, LimitExceededError> {
        let stats = QueryStats::measure(raw);
        let mut violations = Vec::new();

        if stats.length > self.config.max_query_length {
            violations.push(LimitViolation::QueryLength {
                actual: stats.length,
                max: self.config.max_query_length,
            });
        }
        if stats.depth > self.config.max_nesting_depth {
            violations.push(LimitViolation::NestingDepth {
                actual: stats.depth,
                max: self.config.max_nesting_depth,
            });
        }
        if stats.terms > self.config.max_term_count {
            violations.push(LimitViolation::TermCount {
                actual: stats.terms,
                max: self.config.max_term_count,
            });
        }

        if violations.is_empty() {
            Ok(stats)
        } else {
            Err(LimitExceededError { violations })
        }
    }
}
