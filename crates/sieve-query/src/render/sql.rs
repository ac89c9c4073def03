//! SQL filter renderer.
//!
//! Renders the expression tree into a boolean SQL fragment for PostgreSQL,
//! MySQL or SQLite:
//! - every literal is bound as a parameter, never interpolated
//! - `?` placeholders, renumbered to `$1, $2, ...` for PostgreSQL
//! - `field.sub` rewritten to the dialect's JSON accessor

use crate::ast::{Column, Expr, Value};
use crate::error::{QueryError, QueryResult};
use crate::pattern::to_sql_like;
use crate::render::{is_safe_identifier, QueryRenderer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::debug;

/// Similarity cutoff for PostgreSQL fuzzy matching
const FUZZY_THRESHOLD: &str = "0.3";

/// SQL dialects with a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlProvider {
    Postgresql,
    Mysql,
    Sqlite,
}

impl SqlProvider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    fn quote_identifier(self, name: &str) -> String {
        match self {
            Self::Mysql => format!("`{}`", name.replace('`', "``")),
            Self::Postgresql | Self::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    fn json_accessor(self, base: &str, sub: &str) -> String {
        match self {
            Self::Postgresql => format!("{base}->>'{sub}'"),
            Self::Mysql => format!("JSON_UNQUOTE(JSON_EXTRACT({base},'$.{sub}'))"),
            Self::Sqlite => format!("JSON_EXTRACT({base},'$.{sub}')"),
        }
    }
}

impl fmt::Display for SqlProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `WHERE` body (without the keyword) and its positional parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<JsonValue>,
}

/// Column as it appears in rendered SQL
struct ColumnRef {
    sql: String,
    /// Already an expression (JSON accessor), not a bare column
    accessor: bool,
}

/// Renders filters for one SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlRenderer {
    provider: SqlProvider,
}

impl SqlRenderer {
    pub fn new(provider: SqlProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> SqlProvider {
        self.provider
    }

    fn column(&self, column: &Column) -> QueryResult<ColumnRef> {
        match column.split() {
            (base, Some(sub)) => {
                if !is_safe_identifier(base) || !is_safe_identifier(sub) {
                    return Err(QueryError::UnsafeIdentifier {
                        identifier: column.to_string(),
                    });
                }
                Ok(ColumnRef {
                    sql: self.provider.json_accessor(base, sub),
                    accessor: true,
                })
            }
            (name, None) => Ok(ColumnRef {
                sql: self.provider.quote_identifier(name),
                accessor: false,
            }),
        }
    }

    fn render_expr(&self, expr: &Expr, params: &mut Vec<JsonValue>) -> QueryResult<String> {
        match expr {
            Expr::Literal { .. } => Err(QueryError::unsupported(
                "literal",
                "a bare value needs a field; write it as field:value",
            )),
            Expr::Equals { column, value } => self.render_equals(column, value, params),
            Expr::Greater { column, value } => self.render_compare(column, ">", value, params),
            Expr::Less { column, value } => self.render_compare(column, "<", value, params),
            Expr::GreaterEq { column, value } => self.render_compare(column, ">=", value, params),
            Expr::LessEq { column, value } => self.render_compare(column, "<=", value, params),
            Expr::And { left, right } => Ok(format!(
                "({}) AND ({})",
                self.render_expr(left, params)?,
                self.render_expr(right, params)?
            )),
            Expr::Or { left, right } => Ok(format!(
                "({}) OR ({})",
                self.render_expr(left, params)?,
                self.render_expr(right, params)?
            )),
            Expr::Must { operand } => self.render_expr(operand, params),
            Expr::MustNot { operand } => {
                Ok(format!("NOT ({})", self.render_expr(operand, params)?))
            }
            Expr::Like { column, pattern } | Expr::Wild { column, pattern } => {
                self.render_like(column, pattern, params)
            }
            Expr::Fuzzy { term, distance } => self.render_fuzzy(term, *distance, params),
            Expr::Range {
                column,
                min,
                max,
                inclusive,
            } => self.render_range(column, min.as_ref(), max.as_ref(), *inclusive, params),
            Expr::Boost { .. } => Err(QueryError::unsupported(
                "boost",
                "boosting affects relevance ranking and has no filter equivalent; remove the ^ suffix",
            )),
        }
    }

    fn render_equals(
        &self,
        column: &Column,
        value: &Value,
        params: &mut Vec<JsonValue>,
    ) -> QueryResult<String> {
        if let Value::Expr(inner) = value {
            return Ok(format!("({})", self.render_expr(inner, params)?));
        }
        let col = self.column(column)?;
        if value.is_null() {
            return Ok(format!("{} IS NULL", col.sql));
        }
        params.push(bind(value)?);
        Ok(format!("{} = ?", col.sql))
    }

    fn render_compare(
        &self,
        column: &Column,
        op: &str,
        value: &Value,
        params: &mut Vec<JsonValue>,
    ) -> QueryResult<String> {
        if value.is_null() {
            return Err(QueryError::unsupported(
                "comparison",
                format!("'{column}' cannot be ordered against null"),
            ));
        }
        let col = self.column(column)?;
        params.push(bind(value)?);
        Ok(format!("{} {op} ?", col.sql))
    }

    fn render_like(
        &self,
        column: &Column,
        pattern: &str,
        params: &mut Vec<JsonValue>,
    ) -> QueryResult<String> {
        let col = self.column(column)?;
        params.push(JsonValue::String(to_sql_like(pattern)));
        Ok(match self.provider {
            SqlProvider::Postgresql if col.accessor => format!("{} ILIKE ?", col.sql),
            SqlProvider::Postgresql => format!("{}::text ILIKE ?", col.sql),
            SqlProvider::Mysql => format!("LOWER({}) LIKE LOWER(?)", col.sql),
            SqlProvider::Sqlite => format!("{} LIKE ? ESCAPE '\\'", col.sql),
        })
    }

    fn render_fuzzy(
        &self,
        term: &Expr,
        distance: Option<u32>,
        params: &mut Vec<JsonValue>,
    ) -> QueryResult<String> {
        let Expr::Equals {
            column,
            value: value @ Value::String(_),
        } = term
        else {
            return Err(QueryError::unsupported(
                "fuzzy",
                "fuzzy matching applies to a single field:term",
            ));
        };
        if value.is_null() {
            return Err(QueryError::unsupported(
                "fuzzy",
                "fuzzy matching against null is undefined",
            ));
        }

        if distance.is_some() {
            debug!(
                ?distance,
                threshold = FUZZY_THRESHOLD,
                "edit distance not used, fixed similarity threshold applies"
            );
        }

        let col = self.column(column)?;
        let sql = match self.provider {
            SqlProvider::Postgresql => {
                format!("similarity({}, ?) > {FUZZY_THRESHOLD}", col.sql)
            }
            SqlProvider::Mysql => format!("SOUNDEX({}) = SOUNDEX(?)", col.sql),
            SqlProvider::Sqlite => {
                return Err(QueryError::unsupported(
                    "fuzzy",
                    "sqlite has no fuzzy matching; use wildcards such as term* instead",
                ));
            }
        };
        params.push(bind(value)?);
        Ok(sql)
    }

    fn render_range(
        &self,
        column: &Column,
        min: Option<&Value>,
        max: Option<&Value>,
        inclusive: bool,
        params: &mut Vec<JsonValue>,
    ) -> QueryResult<String> {
        if min.is_some_and(Value::is_null) || max.is_some_and(Value::is_null) {
            return Err(QueryError::unsupported(
                "range",
                format!("'{column}' cannot be ordered against null"),
            ));
        }
        let col = self.column(column)?;
        let (lower_op, upper_op) = if inclusive { (">=", "<=") } else { (">", "<") };

        match (min, max) {
            (None, None) => Err(QueryError::unsupported(
                "range",
                "a range needs at least one bound; [* TO *] matches everything",
            )),
            (Some(min), None) => {
                params.push(bind(min)?);
                Ok(format!("{} {lower_op} ?", col.sql))
            }
            (None, Some(max)) => {
                params.push(bind(max)?);
                Ok(format!("{} {upper_op} ?", col.sql))
            }
            (Some(min), Some(max)) => {
                params.push(bind(min)?);
                params.push(bind(max)?);
                if inclusive {
                    Ok(format!("{} BETWEEN ? AND ?", col.sql))
                } else {
                    Ok(format!("({0} > ? AND {0} < ?)", col.sql))
                }
            }
        }
    }
}

impl QueryRenderer for SqlRenderer {
    type Output = SqlFragment;

    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn render(&self, expr: &Expr) -> QueryResult<SqlFragment> {
        let mut params = Vec::new();
        let sql = self.render_expr(expr, &mut params)?;
        let sql = match self.provider {
            SqlProvider::Postgresql => number_placeholders(&sql),
            SqlProvider::Mysql | SqlProvider::Sqlite => sql,
        };
        Ok(SqlFragment { sql, params })
    }
}

/// Convert a literal into a bound parameter
fn bind(value: &Value) -> QueryResult<JsonValue> {
    match value {
        Value::String(s) => Ok(JsonValue::String(s.clone())),
        Value::Number(n) => number_param(*n),
        Value::Expr(_) => Err(QueryError::unsupported(
            "group",
            "a grouped clause can only be matched with field:(...)",
        )),
    }
}

fn number_param(n: f64) -> QueryResult<JsonValue> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(JsonValue::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(JsonValue::Number)
        .ok_or_else(|| QueryError::unsupported("number", format!("{n} cannot be bound")))
}

/// Replace `?` outside string literals with `$1, $2, ...`
fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut quoted = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                out.push(c);
            }
            '?' if !quoted => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}
