//! Expression tree produced by the grammar and consumed by the renderers.
//!
//! The variant set is closed: renderers match exhaustively and never inspect
//! operand types at runtime.

use serde::Serialize;
use std::fmt;

/// A literal operand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    /// Grouped clause for `field:(a OR b)`, already bound to the field
    Expr(Box<Expr>),
}

impl Value {
    /// `null` in any case means "no value" for equality
    pub fn is_null(&self) -> bool {
        matches!(self, Self::String(s) if s.eq_ignore_ascii_case("null"))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A field reference, either `name` or `base.sub`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Column(pub String);

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `(base, Some(sub))` for nested references
    pub fn split(&self) -> (&str, Option<&str>) {
        match self.0.split_once('.') {
            Some((base, sub)) => (base, Some(sub)),
            None => (&self.0, None),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    /// A value with no field (only when the schema has no default field)
    Literal { value: Value },
    Equals { column: Column, value: Value },
    Greater { column: Column, value: Value },
    Less { column: Column, value: Value },
    GreaterEq { column: Column, value: Value },
    LessEq { column: Column, value: Value },
    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
    Must { operand: Box<Expr> },
    MustNot { operand: Box<Expr> },
    /// Pattern with `*` wildcards, kept in escaped query form
    Like { column: Column, pattern: String },
    /// Pattern whose only wildcard is `?`
    Wild { column: Column, pattern: String },
    Fuzzy { term: Box<Expr>, distance: Option<u32> },
    /// `None` bounds are open (`*`)
    Range {
        column: Column,
        min: Option<Value>,
        max: Option<Value>,
        inclusive: bool,
    },
    Boost { operand: Box<Expr>, power: f64 },
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn must(operand: Expr) -> Self {
        Self::Must {
            operand: Box::new(operand),
        }
    }

    pub fn must_not(operand: Expr) -> Self {
        Self::MustNot {
            operand: Box::new(operand),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            column: Column::new(column),
            value: value.into(),
        }
    }

    /// Short operator name used in error messages and logs
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "literal",
            Self::Equals { .. } => "equals",
            Self::Greater { .. } => "greater",
            Self::Less { .. } => "less",
            Self::GreaterEq { .. } => "greater_eq",
            Self::LessEq { .. } => "less_eq",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Must { .. } => "must",
            Self::MustNot { .. } => "must_not",
            Self::Like { .. } => "like",
            Self::Wild { .. } => "wild",
            Self::Fuzzy { .. } => "fuzzy",
            Self::Range { .. } => "range",
            Self::Boost { .. } => "boost",
        }
    }

    /// Number of nodes in the tree, including grouped values
    pub fn node_count(&self) -> usize {
        match self {
            Self::Equals {
                value: Value::Expr(inner),
                ..
            } => 1 + inner.node_count(),
            Self::And { left, right } | Self::Or { left, right } => {
                1 + left.node_count() + right.node_count()
            }
            Self::Must { operand }
            | Self::MustNot { operand }
            | Self::Boost { operand, .. } => 1 + operand.node_count(),
            Self::Fuzzy { term, .. } => 1 + term.node_count(),
            _ => 1,
        }
    }
}
