//! Target renderers for the expression tree.
//!
//! Renderers convert the closed [`Expr`] tree into a dialect-specific filter
//! fragment (SQL `WHERE` body or PartiQL condition) plus the values it needs.
//! Renderers are plain values held by the parser; they carry no state
//! between calls.

mod partiql;
mod sql;

pub use partiql::{AttributeValue, PartiqlFragment, PartiqlRenderer};
pub use sql::{SqlFragment, SqlProvider, SqlRenderer};

use crate::ast::Expr;
use crate::error::QueryResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Identifiers safe to interpolate unquoted
static SAFE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

pub(crate) fn is_safe_identifier(name: &str) -> bool {
    SAFE_IDENTIFIER.is_match(name)
}

/// Trait for rendering an expression to a target dialect.
pub trait QueryRenderer: Send + Sync {
    type Output;

    /// Unique name for this renderer
    fn name(&self) -> &'static str;

    /// Render the tree into a fragment with its bound values
    fn render(&self, expr: &Expr) -> QueryResult<Self::Output>;
}

/// Output from any renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderedQuery {
    Sql(SqlFragment),
    Partiql(PartiqlFragment),
}

impl RenderedQuery {
    /// The filter text
    pub fn text(&self) -> &str {
        match self {
            Self::Sql(f) => &f.sql,
            Self::Partiql(f) => &f.statement,
        }
    }

    /// Number of values that travel alongside the text
    pub fn value_count(&self) -> usize {
        match self {
            Self::Sql(f) => f.params.len(),
            Self::Partiql(f) => f.attribute_values.len(),
        }
    }
}
