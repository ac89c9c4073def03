//! DynamoDB PartiQL renderer.
//!
//! PartiQL has no identifier binding and no `LIKE`, so:
//! - identifiers are checked against a strict pattern and interpolated
//! - string values are interpolated with single quotes doubled
//! - wildcard patterns map onto `contains`/`begins_with`

use crate::ast::{Column, Expr, Value};
use crate::error::{QueryError, QueryResult};
use crate::pattern::{like_shape, LikeShape};
use crate::render::{is_safe_identifier, QueryRenderer};
use serde::Serialize;

/// Typed value in DynamoDB attribute-value form: `{"S": "john"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttributeValue {
    S(String),
    N(String),
}

/// A PartiQL condition and the values interpolated into it, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartiqlFragment {
    pub statement: String,
    pub attribute_values: Vec<AttributeValue>,
}

/// Renders filters for DynamoDB PartiQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartiqlRenderer;

impl PartiqlRenderer {
    pub fn new() -> Self {
        Self
    }

    fn path(&self, column: &Column) -> QueryResult<String> {
        if column.name().split('.').all(is_safe_identifier) {
            Ok(column.name().to_string())
        } else {
            Err(QueryError::UnsafeIdentifier {
                identifier: column.to_string(),
            })
        }
    }

    fn render_expr(&self, expr: &Expr, values: &mut Vec<AttributeValue>) -> QueryResult<String> {
        match expr {
            Expr::Literal { .. } => Err(QueryError::unsupported(
                "literal",
                "a bare value needs a field; write it as field:value",
            )),
            Expr::Equals { column, value } => self.render_equals(column, value, values),
            Expr::Greater { column, value } => self.render_compare(column, ">", value, values),
            Expr::Less { column, value } => self.render_compare(column, "<", value, values),
            Expr::GreaterEq { column, value } => self.render_compare(column, ">=", value, values),
            Expr::LessEq { column, value } => self.render_compare(column, "<=", value, values),
            Expr::And { left, right } => Ok(format!(
                "({}) AND ({})",
                self.render_expr(left, values)?,
                self.render_expr(right, values)?
            )),
            Expr::Or { left, right } => Ok(format!(
                "({}) OR ({})",
                self.render_expr(left, values)?,
                self.render_expr(right, values)?
            )),
            Expr::Must { operand } => self.render_expr(operand, values),
            Expr::MustNot { operand } => {
                Ok(format!("NOT ({})", self.render_expr(operand, values)?))
            }
            Expr::Like { column, pattern } => self.render_like(column, pattern, values),
            Expr::Wild { .. } => Err(QueryError::unsupported(
                "wildcard",
                "PartiQL has no single-character wildcard; use * instead of ?",
            )),
            Expr::Fuzzy { .. } => Err(QueryError::unsupported(
                "fuzzy",
                "PartiQL has no fuzzy matching; use wildcards such as term* instead",
            )),
            Expr::Range {
                column,
                min,
                max,
                inclusive,
            } => self.render_range(column, min.as_ref(), max.as_ref(), *inclusive, values),
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
        values: &mut Vec<AttributeValue>,
    ) -> QueryResult<String> {
        if let Value::Expr(inner) = value {
            return Ok(format!("({})", self.render_expr(inner, values)?));
        }
        let path = self.path(column)?;
        if value.is_null() {
            return Ok(format!("({path} IS NULL OR {path} IS MISSING)"));
        }
        Ok(format!("{path} = {}", literal(value, values)?))
    }

    fn render_compare(
        &self,
        column: &Column,
        op: &str,
        value: &Value,
        values: &mut Vec<AttributeValue>,
    ) -> QueryResult<String> {
        if value.is_null() {
            return Err(QueryError::unsupported(
                "comparison",
                format!("'{column}' cannot be ordered against null"),
            ));
        }
        let path = self.path(column)?;
        Ok(format!("{path} {op} {}", literal(value, values)?))
    }

    fn render_like(
        &self,
        column: &Column,
        pattern: &str,
        values: &mut Vec<AttributeValue>,
    ) -> QueryResult<String> {
        let path = self.path(column)?;
        let shape = like_shape(pattern).ok_or_else(|| {
            QueryError::unsupported(
                "wildcard",
                format!(
                    "'{pattern}' has no PartiQL equivalent; \
                     wildcards are only supported at the start or end"
                ),
            )
        })?;

        Ok(match shape {
            LikeShape::Contains(text) => {
                format!("contains({path}, {})", string_literal(text, values))
            }
            LikeShape::BeginsWith(text) => {
                format!("begins_with({path}, {})", string_literal(text, values))
            }
            LikeShape::Exact(text) => format!("{path} = {}", string_literal(text, values)),
            LikeShape::Any => format!("{path} IS NOT MISSING"),
        })
    }

    fn render_range(
        &self,
        column: &Column,
        min: Option<&Value>,
        max: Option<&Value>,
        inclusive: bool,
        values: &mut Vec<AttributeValue>,
    ) -> QueryResult<String> {
        if min.is_some_and(Value::is_null) || max.is_some_and(Value::is_null) {
            return Err(QueryError::unsupported(
                "range",
                format!("'{column}' cannot be ordered against null"),
            ));
        }
        let path = self.path(column)?;
        let (lower_op, upper_op) = if inclusive { (">=", "<=") } else { (">", "<") };

        match (min, max) {
            (None, None) => Err(QueryError::unsupported(
                "range",
                "a range needs at least one bound; [* TO *] matches everything",
            )),
            (Some(min), None) => Ok(format!("{path} {lower_op} {}", bound(min, values)?)),
            (None, Some(max)) => Ok(format!("{path} {upper_op} {}", bound(max, values)?)),
            (Some(min), Some(max)) => {
                let min = bound(min, values)?;
                let max = bound(max, values)?;
                if inclusive {
                    Ok(format!("{path} BETWEEN {min} AND {max}"))
                } else {
                    Ok(format!("({path} > {min} AND {path} < {max})"))
                }
            }
        }
    }
}

impl QueryRenderer for PartiqlRenderer {
    type Output = PartiqlFragment;

    fn name(&self) -> &'static str {
        "dynamodb"
    }

    fn render(&self, expr: &Expr) -> QueryResult<PartiqlFragment> {
        let mut attribute_values = Vec::new();
        let statement = self.render_expr(expr, &mut attribute_values)?;
        Ok(PartiqlFragment {
            statement,
            attribute_values,
        })
    }
}

fn string_literal(text: String, values: &mut Vec<AttributeValue>) -> String {
    let quoted = format!("'{}'", text.replace('\'', "''"));
    values.push(AttributeValue::S(text));
    quoted
}

fn literal(value: &Value, values: &mut Vec<AttributeValue>) -> QueryResult<String> {
    match value {
        Value::String(s) => Ok(string_literal(s.clone(), values)),
        Value::Number(n) => {
            let text = if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                (*n as i64).to_string()
            } else {
                n.to_string()
            };
            values.push(AttributeValue::N(text.clone()));
            Ok(text)
        }
        Value::Expr(_) => Err(QueryError::unsupported(
            "group",
            "a grouped clause can only be matched with field:(...)",
        )),
    }
}

/// Range bounds are parsed as text; numeric ones compare as `N` so they
/// match number attributes.
fn bound(value: &Value, values: &mut Vec<AttributeValue>) -> QueryResult<String> {
    match value {
        Value::String(s) => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => literal(&Value::Number(n), values),
            _ => literal(value, values),
        },
        _ => literal(value, values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> PartiqlFragment {
        PartiqlRenderer::new().render(expr).unwrap()
    }

    fn like(pattern: &str) -> Expr {
        Expr::Like {
            column: Column::new("name"),
            pattern: pattern.to_string(),
        }
    }

    #[test]
    fn test_like_shapes() {
        let out = render(&like("*john*"));
        assert_eq!(out.statement, "contains(name, 'john')");
        assert_eq!(out.attribute_values, vec![AttributeValue::S("john".into())]);

        assert_eq!(render(&like("*john")).statement, "contains(name, 'john')");
        assert_eq!(render(&like("john*")).statement, "begins_with(name, 'john')");
        assert_eq!(render(&like("*")).statement, "name IS NOT MISSING");
        assert!(render(&like("*")).attribute_values.is_empty());
    }

    #[test]
    fn test_interior_wildcard_unsupported() {
        let err = PartiqlRenderer::new().render(&like("jo*hn")).unwrap_err();
        assert_eq!(err.kind(), "unsupported_operator");
    }

    #[test]
    fn test_quotes_doubled() {
        let out = render(&Expr::equals("name", "o'brien"));
        assert_eq!(out.statement, "name = 'o''brien'");
        assert_eq!(out.attribute_values, vec![AttributeValue::S("o'brien".into())]);
    }

    #[test]
    fn test_unsafe_identifier() {
        let err = PartiqlRenderer::new()
            .render(&Expr::equals("na-me", "x"))
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::UnsafeIdentifier {
                identifier: "na-me".to_string()
            }
        );
    }

    #[test]
    fn test_nested_path_and_numbers() {
        let out = render(&Expr::and(
            Expr::equals("meta.team", "core"),
            Expr::GreaterEq {
                column: Column::new("age"),
                value: Value::Number(21.0),
            },
        ));
        assert_eq!(out.statement, "(meta.team = 'core') AND (age >= 21)");
        assert_eq!(
            out.attribute_values,
            vec![
                AttributeValue::S("core".into()),
                AttributeValue::N("21".into())
            ]
        );
    }

    #[test]
    fn test_null_and_range() {
        assert_eq!(
            render(&Expr::equals("name", "null")).statement,
            "(name IS NULL OR name IS MISSING)"
        );
        let range = Expr::Range {
            column: Column::new("age"),
            min: Some(Value::from("1")),
            max: Some(Value::from("5")),
            inclusive: false,
        };
        let out = render(&range);
        assert_eq!(out.statement, "(age > 1 AND age < 5)");
        assert_eq!(
            out.attribute_values,
            vec![AttributeValue::N("1".into()), AttributeValue::N("5".into())]
        );

        let range = Expr::Range {
            column: Column::new("name"),
            min: Some(Value::from("a")),
            max: None,
            inclusive: true,
        };
        assert_eq!(render(&range).statement, "name >= 'a'");
    }

    #[test]
    fn test_attribute_value_json_shape() {
        let json = serde_json::to_value(AttributeValue::S("x".into())).unwrap();
        assert_eq!(json, serde_json::json!({"S": "x"}));
    }

    #[test]
    fn test_fuzzy_and_boost_rejected() {
        let fuzzy = Expr::Fuzzy {
            term: Box::new(Expr::equals("name", "jon")),
            distance: None,
        };
        assert!(PartiqlRenderer::new().render(&fuzzy).is_err());
        let boost = Expr::Boost {
            operand: Box::new(Expr::equals("name", "jon")),
            power: 3.0,
        };
        let err = PartiqlRenderer::new().render(&boost).unwrap_err();
        assert!(err.to_string().contains("boosting"));
    }
}
