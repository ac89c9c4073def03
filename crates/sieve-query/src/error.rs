//! Error types for the filter compiler.
//!
//! Every error except [`ConfigurationError`] is derived from caller-supplied
//! query text and is meant to be surfaced to the caller rather than logged
//! and swallowed.

use std::fmt;
use thiserror::Error;

use crate::schema::FieldKind;

/// Raised while building a schema or parser configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two fields serialize under the same external name
    #[error("duplicate field name '{name}' (declared as {first} and {second})")]
    DuplicateField {
        name: String,
        first: FieldKind,
        second: FieldKind,
    },

    /// A field was declared without a name
    #[error("field names must not be empty")]
    EmptyFieldName,

    /// A field name the grammar cannot reference
    #[error("field name '{0}' must start with a letter or underscore and contain only letters, digits and underscores")]
    InvalidFieldName(String),

    /// An override named a field the schema does not contain
    #[error("cannot annotate unknown field '{0}'")]
    UnknownField(String),

    /// A limit was configured as zero
    #[error("limit '{0}' must be greater than zero")]
    ZeroLimit(&'static str),

    /// The record or type used for extraction has no object shape
    #[error("cannot extract fields: {0}")]
    Extraction(String),

    /// A provider name that no renderer answers to
    #[error("unknown provider '{0}' (expected postgresql, mysql, sqlite or dynamodb)")]
    UnknownProvider(String),
}

/// One violated safety limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitViolation {
    QueryLength { actual: usize, max: usize },
    NestingDepth { actual: usize, max: usize },
    TermCount { actual: usize, max: usize },
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryLength { actual, max } => {
                write!(f, "query length {actual} exceeds maximum of {max} bytes")
            }
            Self::NestingDepth { actual, max } => {
                write!(f, "nesting depth {actual} exceeds maximum of {max}")
            }
            Self::TermCount { actual, max } => {
                write!(f, "term count {actual} exceeds maximum of {max}")
            }
        }
    }
}

/// Every limit a query violated, reported together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct LimitExceededError {
    pub violations: Vec<LimitViolation>,
}

impl fmt::Display for LimitExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "query rejected: {}", parts.join("; "))
    }
}

/// Why a field reference was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFieldReason {
    /// The name is not in the schema
    Unknown,
    /// `base.sub` was used on a field without nested access
    NotNested,
    /// Whitespace was found inside a dotted reference
    Whitespace,
}

/// A `field:` reference that does not match the schema.
///
/// Carries the full list of valid names so it can be shown to end users
/// as-is. Nested-capable fields are listed as `name.*`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InvalidFieldError {
    pub field: String,
    pub reason: InvalidFieldReason,
    pub valid_fields: Vec<String>,
}

impl fmt::Display for InvalidFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = match self.reason {
            InvalidFieldReason::Unknown => "unknown field",
            InvalidFieldReason::NotNested => "field does not support nested access",
            InvalidFieldReason::Whitespace => "whitespace is not allowed in field names",
        };
        write!(
            f,
            "invalid field '{}' ({}); valid fields are: {}",
            self.field,
            detail,
            self.valid_fields.join(", ")
        )
    }
}

/// Errors produced while compiling a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Length, depth or term-count limits were exceeded
    #[error(transparent)]
    Limit(#[from] LimitExceededError),

    /// The grammar rejected the query
    #[error("syntax error: {message}")]
    Syntax { message: String },

    /// A field reference is not in the schema
    #[error(transparent)]
    InvalidField(#[from] InvalidFieldError),

    /// The operator cannot be expressed for the target dialect
    #[error("unsupported {operator}: {message}")]
    Unsupported {
        operator: &'static str,
        message: String,
    },

    /// An identifier cannot be interpolated safely
    #[error("unsafe identifier '{identifier}'")]
    UnsafeIdentifier { identifier: String },
}

impl QueryError {
    pub(crate) fn unsupported(operator: &'static str, message: impl Into<String>) -> Self {
        Self::Unsupported {
            operator,
            message: message.into(),
        }
    }

    /// Stable tag for log fields and response mapping
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Limit(_) => "limit_exceeded",
            Self::Syntax { .. } => "syntax",
            Self::InvalidField(_) => "invalid_field",
            Self::Unsupported { .. } => "unsupported_operator",
            Self::UnsafeIdentifier { .. } => "unsafe_identifier",
        }
    }

    /// Whether the error was caused by the query text (a 4xx, not a 5xx)
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Limit(_)
            | Self::Syntax { .. }
            | Self::InvalidField(_)
            | Self::Unsupported { .. }
            | Self::UnsafeIdentifier { .. } => true,
        }
    }
}

/// Result type for compile operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_error_lists_every_violation() {
        let err = LimitExceededError {
            violations: vec![
                LimitViolation::QueryLength {
                    actual: 12,
                    max: 10,
                },
                LimitViolation::TermCount { actual: 3, max: 2 },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("query length 12"));
        assert!(msg.contains("term count 3"));
    }

    #[test]
    fn test_invalid_field_message_lists_valid_names() {
        let err = InvalidFieldError {
            field: "nmae".to_string(),
            reason: InvalidFieldReason::Unknown,
            valid_fields: vec!["name".to_string(), "meta.*".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "invalid field 'nmae' (unknown field); valid fields are: name, meta.*"
        );
    }

    #[test]
    fn test_duplicate_field_names_both_kinds() {
        let err = ConfigurationError::DuplicateField {
            name: "id".to_string(),
            first: FieldKind::Text,
            second: FieldKind::Number,
        };
        assert_eq!(
            err.to_string(),
            "duplicate field name 'id' (declared as text and number)"
        );
    }

    #[test]
    fn test_query_error_kinds() {
        let err = QueryError::unsupported("boost", "boosting is not supported");
        assert_eq!(err.kind(), "unsupported_operator");
        assert!(err.is_client_error());
    }
}
