//! Field reference validator.
//!
//! Checks every `field:` and `field.sub:` reference in the expanded query
//! against the schema before the grammar runs, and every column of the
//! parsed tree after it.

use crate::ast::{Column, Expr, Value};
use crate::error::{InvalidFieldError, InvalidFieldReason};
use crate::schema::FieldSchema;
use once_cell::sync::Lazy;
use regex::Regex;

/// `name:` or `base.sub:` at a clause boundary, tolerating whitespace around
/// the dot and before the colon so it can be reported instead of skipped.
static FIELD_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s(+\-!])([A-Za-z_][A-Za-z0-9_]*)(\s*\.\s*[A-Za-z0-9_]*)?(\s*):")
        .expect("field reference pattern is valid")
});

#[derive(Debug, Clone)]
pub struct FieldValidator {
    schema: FieldSchema,
}

impl FieldValidator {
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema }
    }

    pub fn validate(&self, query: &str) -> Result<(), InvalidFieldError> {
        let masked = mask_literals(query);
        for caps in FIELD_REF_RE.captures_iter(&masked) {
            let base = caps.get(1).map_or("", |m| m.as_str());
            let dotted = caps.get(2).map_or("", |m| m.as_str());
            let trailing = caps.get(3).map_or("", |m| m.as_str());

            if dotted.chars().any(char::is_whitespace) || !trailing.is_empty() {
                return Err(self.error(
                    format!("{base}{dotted}{trailing}"),
                    InvalidFieldReason::Whitespace,
                ));
            }

            let name = format!("{base}{dotted}");
            match self.schema.get(base) {
                None => return Err(self.error(name, InvalidFieldReason::Unknown)),
                Some(field) if !dotted.is_empty() => {
                    if !field.supports_nested() {
                        return Err(self.error(name, InvalidFieldReason::NotNested));
                    }
                    if dotted.len() == 1 {
                        // `base.:` with nothing after the dot
                        return Err(self.error(name, InvalidFieldReason::Unknown));
                    }
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Check every column the grammar produced, including ones the text scan
    /// cannot see at a clause boundary.
    pub fn validate_expr(&self, expr: &Expr) -> Result<(), InvalidFieldError> {
        match expr {
            Expr::Literal { .. } => Ok(()),
            Expr::Equals { column, value } => {
                self.validate_column(column)?;
                match value {
                    Value::Expr(inner) => self.validate_expr(inner),
                    _ => Ok(()),
                }
            }
            Expr::Greater { column, .. }
            | Expr::Less { column, .. }
            | Expr::GreaterEq { column, .. }
            | Expr::LessEq { column, .. }
            | Expr::Like { column, .. }
            | Expr::Wild { column, .. }
            | Expr::Range { column, .. } => self.validate_column(column),
            Expr::And { left, right } | Expr::Or { left, right } => {
                self.validate_expr(left)?;
                self.validate_expr(right)
            }
            Expr::Must { operand }
            | Expr::MustNot { operand }
            | Expr::Boost { operand, .. } => self.validate_expr(operand),
            Expr::Fuzzy { term, .. } => self.validate_expr(term),
        }
    }

    fn validate_column(&self, column: &Column) -> Result<(), InvalidFieldError> {
        let (base, sub) = column.split();
        match (self.schema.get(base), sub) {
            (None, _) => Err(self.error(column.to_string(), InvalidFieldReason::Unknown)),
            (Some(field), Some(_)) if !field.supports_nested() => {
                Err(self.error(column.to_string(), InvalidFieldReason::NotNested))
            }
            _ => Ok(()),
        }
    }

    fn error(&self, field: String, reason: InvalidFieldReason) -> InvalidFieldError {
        InvalidFieldError {
            field,
            reason,
            valid_fields: self.schema.valid_field_names(),
        }
    }
}

/// Blank out escapes, quoted phrases and range bodies so colons inside them
/// are never read as field qualifiers. Delimiters are kept.
fn mask_literals(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars();
    let mut in_quote = false;
    let mut in_range = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
                out.push_str("  ");
            }
            '"' => {
                in_quote = !in_quote;
                out.push('"');
            }
            _ if in_quote => out.push(' '),
            '[' | '{' => {
                in_range = true;
                out.push(c);
            }
            ']' | '}' => {
                in_range = false;
                out.push(c);
            }
            _ if in_range => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}
