//! Lucene-style filter grammar using chumsky.
//!
//! Supports:
//! - `field:value`, `field.sub:value`, quoted phrases
//! - wildcards (`*`, `?`) and backslash escapes
//! - inclusive `[a TO b]` and exclusive `{a TO b}` ranges, `*` for open ends
//! - comparison shorthand `field:>=10`
//! - `+`/`-` prefixes and case-insensitive `AND`/`OR`/`NOT`
//! - fuzzy `~`/`~N` and boost `^N` suffixes
//! - grouping, including field groups `field:(a OR b)`

use crate::ast::{Column, Expr, Value};
use crate::error::{QueryError, QueryResult};
use crate::pattern::{has_unescaped, unescape};
use crate::syntax::common::{
    decimal, field_name, format_errors, integer, is_reserved, keyword, phrase, term_raw, Extra,
};
use chumsky::prelude::*;

// ============================================================================
// Intermediate types (before lowering to Expr)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Quoted(String),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
enum LeafValue {
    /// Raw term, escapes preserved
    Term(String),
    Phrase(String),
    Range {
        min: Option<Value>,
        max: Option<Value>,
        inclusive: bool,
    },
    Compare {
        op: CompareOp,
        operand: Operand,
    },
    Group(Box<Clause>),
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Leaf {
        field: Option<String>,
        value: LeafValue,
    },
    And(Box<Clause>, Box<Clause>),
    Or(Box<Clause>, Box<Clause>),
    Must(Box<Clause>),
    MustNot(Box<Clause>),
    Fuzzy(Box<Clause>, Option<u32>),
    Boost(Box<Clause>, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Must,
    MustNot,
}

/// Collapse a run of prefixes into at most one: an odd number of negations
/// negates, otherwise any `+` requires. Keeps tree depth independent of how
/// many prefixes are stacked on one clause.
fn apply_prefixes(prefixes: &[Prefix], clause: Clause) -> Clause {
    let negations = prefixes.iter().filter(|p| **p == Prefix::MustNot).count();
    if negations % 2 == 1 {
        Clause::MustNot(Box::new(clause))
    } else if prefixes.contains(&Prefix::Must) {
        Clause::Must(Box::new(clause))
    } else {
        clause
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// Range bound: phrase, `*` (open) or raw term
fn bound<'src>() -> impl Parser<'src, &'src str, Option<Value>, Extra<'src>> + Clone {
    choice((
        phrase().map(|p| Some(Value::String(p))),
        term_raw().map(|s: &str| {
            if s == "*" {
                None
            } else {
                Some(Value::String(unescape(s)))
            }
        }),
    ))
}

fn range<'src>() -> impl Parser<'src, &'src str, LeafValue, Extra<'src>> + Clone {
    let body = bound()
        .padded()
        .then_ignore(keyword("TO", "TO"))
        .then(bound().padded());

    let inclusive = just('[')
        .ignore_then(body.clone())
        .then_ignore(just(']'))
        .map(|(min, max)| LeafValue::Range {
            min,
            max,
            inclusive: true,
        });

    let exclusive = just('{')
        .ignore_then(body)
        .then_ignore(just('}'))
        .map(|(min, max)| LeafValue::Range {
            min,
            max,
            inclusive: false,
        });

    choice((inclusive, exclusive)).labelled("range like [a TO b]")
}

fn comparison<'src>() -> impl Parser<'src, &'src str, LeafValue, Extra<'src>> + Clone {
    let op = choice((
        just(">=").to(CompareOp::GreaterEq),
        just("<=").to(CompareOp::LessEq),
        just('>').to(CompareOp::Greater),
        just('<').to(CompareOp::Less),
    ));

    let operand = choice((
        phrase().map(Operand::Quoted),
        term_raw().map(|s: &str| Operand::Raw(s.to_string())),
    ));

    op.then(operand)
        .map(|(op, operand)| LeafValue::Compare { op, operand })
        .labelled("comparison like >=10")
}

/// Bare term that is not an operator keyword
fn bare_term<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    term_raw().try_map(|s: &str, span| {
        if is_reserved(s) {
            Err(Rich::custom(span, format!("unexpected operator '{s}'")))
        } else {
            Ok(s.to_string())
        }
    })
}

fn suffixes<'src>(
) -> impl Parser<'src, &'src str, (Option<Option<u32>>, Option<f64>), Extra<'src>> + Clone {
    let fuzzy = just('~').ignore_then(integer().or_not()).labelled("fuzzy like ~2");
    let boost = just('^').ignore_then(decimal()).labelled("boost like ^2");
    fuzzy.or_not().then(boost.or_not())
}

fn clause_parser<'src>() -> impl Parser<'src, &'src str, Clause, Extra<'src>> {
    recursive(|clause| {
        let group = just('(')
            .ignore_then(clause.padded())
            .then_ignore(just(')'))
            .labelled("parenthesized group");

        let field_value = choice((
            group.clone().map(|inner| LeafValue::Group(Box::new(inner))),
            range(),
            comparison(),
            phrase().map(LeafValue::Phrase),
            term_raw().map(|s: &str| LeafValue::Term(s.to_string())),
        ));

        let fielded = field_name()
            .then_ignore(just(':'))
            .then(field_value)
            .map(|(field, value)| Clause::Leaf {
                field: Some(field),
                value,
            });

        let unfielded = choice((
            group,
            range().map(|value| Clause::Leaf { field: None, value }),
            phrase().map(|p| Clause::Leaf {
                field: None,
                value: LeafValue::Phrase(p),
            }),
            bare_term().map(|t| Clause::Leaf {
                field: None,
                value: LeafValue::Term(t),
            }),
        ));

        // A clause must end at whitespace, a parenthesis or the end of input
        let boundary = choice((
            any()
                .filter(|c: &char| c.is_whitespace() || *c == '(' || *c == ')')
                .ignored(),
            end(),
        ))
        .rewind()
        .labelled("whitespace between clauses");

        let modified = choice((fielded, unfielded))
            .then(suffixes())
            .map(|(clause, (fuzzy, boost))| {
                let clause = match fuzzy {
                    Some(distance) => Clause::Fuzzy(Box::new(clause), distance),
                    None => clause,
                };
                match boost {
                    Some(power) => Clause::Boost(Box::new(clause), power),
                    None => clause,
                }
            })
            .then_ignore(boundary);

        // Single-character prefixes first so a run of `!` never rescans as a term
        let prefix = choice((
            just('!').to(Prefix::MustNot),
            just('+').to(Prefix::Must),
            just('-').to(Prefix::MustNot),
            keyword("NOT", "!").to(Prefix::MustNot),
        ))
        .padded();

        let unary = prefix
            .repeated()
            .collect::<Vec<_>>()
            .then(modified)
            .map(|(prefixes, clause)| apply_prefixes(&prefixes, clause))
            .padded();

        // Adjacent clauses are conjoined
        let and_clause = unary.clone().foldl(
            keyword("AND", "&&")
                .padded()
                .or_not()
                .ignore_then(unary)
                .repeated(),
            |left, right| Clause::And(Box::new(left), Box::new(right)),
        );

        and_clause.clone().foldl(
            keyword("OR", "||")
                .padded()
                .ignore_then(and_clause)
                .repeated(),
            |left, right| Clause::Or(Box::new(left), Box::new(right)),
        )
    })
}

// ============================================================================
// Lowering
// ============================================================================

fn term_value(raw: &str) -> Value {
    Value::String(unescape(raw))
}

fn compare_value(operand: Operand) -> Value {
    match operand {
        Operand::Quoted(s) => Value::String(s),
        Operand::Raw(raw) => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && !raw.contains('\\') => Value::Number(n),
            _ => term_value(&raw),
        },
    }
}

fn no_field(what: &str) -> QueryError {
    QueryError::Syntax {
        message: format!("{what} needs a field and the schema declares no default field"),
    }
}

/// Convert a parsed clause into an expression, binding unfielded leaves to
/// `field` (the enclosing field group or the schema default).
fn lower(clause: Clause, field: Option<&str>) -> QueryResult<Expr> {
    Ok(match clause {
        Clause::Leaf {
            field: own,
            value,
        } => {
            let column = own.as_deref().or(field).map(Column::new);
            lower_leaf(column, value)?
        }
        Clause::And(left, right) => Expr::and(lower(*left, field)?, lower(*right, field)?),
        Clause::Or(left, right) => Expr::or(lower(*left, field)?, lower(*right, field)?),
        Clause::Must(inner) => Expr::must(lower(*inner, field)?),
        Clause::MustNot(inner) => Expr::must_not(lower(*inner, field)?),
        Clause::Fuzzy(inner, distance) => Expr::Fuzzy {
            term: Box::new(lower(*inner, field)?),
            distance,
        },
        Clause::Boost(inner, power) => Expr::Boost {
            operand: Box::new(lower(*inner, field)?),
            power,
        },
    })
}

fn lower_leaf(column: Option<Column>, value: LeafValue) -> QueryResult<Expr> {
    let Some(column) = column else {
        // Nothing to bind to: bare values survive as literals
        return match value {
            LeafValue::Term(raw) => Ok(Expr::Literal {
                value: term_value(&raw),
            }),
            LeafValue::Phrase(p) => Ok(Expr::Literal {
                value: Value::String(p),
            }),
            LeafValue::Range { .. } => Err(no_field("range")),
            LeafValue::Compare { .. } => Err(no_field("comparison")),
            LeafValue::Group(_) => Err(no_field("group")),
        };
    };

    Ok(match value {
        LeafValue::Term(raw) => {
            if has_unescaped(&raw, '*') {
                Expr::Like {
                    column,
                    pattern: raw,
                }
            } else if has_unescaped(&raw, '?') {
                Expr::Wild {
                    column,
                    pattern: raw,
                }
            } else {
                Expr::Equals {
                    column,
                    value: term_value(&raw),
                }
            }
        }
        LeafValue::Phrase(p) => Expr::Equals {
            column,
            value: Value::String(p),
        },
        LeafValue::Range {
            min,
            max,
            inclusive,
        } => Expr::Range {
            column,
            min,
            max,
            inclusive,
        },
        LeafValue::Compare { op, operand } => {
            let value = compare_value(operand);
            match op {
                CompareOp::Greater => Expr::Greater { column, value },
                CompareOp::GreaterEq => Expr::GreaterEq { column, value },
                CompareOp::Less => Expr::Less { column, value },
                CompareOp::LessEq => Expr::LessEq { column, value },
            }
        }
        LeafValue::Group(inner) => {
            let grouped = lower(*inner, Some(column.name()))?;
            Expr::Equals {
                column,
                value: Value::Expr(Box::new(grouped)),
            }
        }
    })
}

// ============================================================================
// Entry point
// ============================================================================

/// Lucene-style query syntax bound to a fallback field.
#[derive(Debug, Clone, Default)]
pub struct LuceneSyntax {
    default_field: Option<String>,
}

impl LuceneSyntax {
    pub fn new(default_field: Option<String>) -> Self {
        Self { default_field }
    }

    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    /// Parse query text into an expression; blank input means "no filter".
    pub fn parse(&self, input: &str) -> QueryResult<Option<Expr>> {
        if input.trim().is_empty() {
            return Ok(None);
        }

        let clause = clause_parser()
            .padded()
            .then_ignore(end())
            .parse(input)
            .into_result()
            .map_err(|errs| QueryError::Syntax {
                message: format_errors(&errs, input),
            })?;

        lower(clause, self.default_field.as_deref()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        LuceneSyntax::new(Some("name".to_string()))
            .parse(input)
            .unwrap()
            .unwrap()
    }

    fn parse_err(input: &str) -> QueryError {
        LuceneSyntax::new(Some("name".to_string()))
            .parse(input)
            .unwrap_err()
    }

    #[test]
    fn test_empty_input_is_no_filter() {
        let syntax = LuceneSyntax::default();
        assert_eq!(syntax.parse("").unwrap(), None);
        assert_eq!(syntax.parse("   \t").unwrap(), None);
    }

    #[test]
    fn test_field_value() {
        assert_eq!(parse("name:john"), Expr::equals("name", "john"));
    }

    #[test]
    fn test_phrase_keeps_wildcards_literal() {
        assert_eq!(
            parse(r#"name:"john *smith""#),
            Expr::equals("name", "john *smith")
        );
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(
            parse("name:jo*"),
            Expr::Like {
                column: Column::new("name"),
                pattern: "jo*".to_string()
            }
        );
        assert_eq!(
            parse("name:jo?n"),
            Expr::Wild {
                column: Column::new("name"),
                pattern: "jo?n".to_string()
            }
        );
        assert_eq!(parse(r"name:jo\*"), Expr::equals("name", "jo*"));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(
            parse("age:[25 TO *]"),
            Expr::Range {
                column: Column::new("age"),
                min: Some(Value::from("25")),
                max: None,
                inclusive: true,
            }
        );
        assert_eq!(
            parse(r#"age:{"a b" TO z}"#),
            Expr::Range {
                column: Column::new("age"),
                min: Some(Value::from("a b")),
                max: Some(Value::from("z")),
                inclusive: false,
            }
        );
        assert!(matches!(parse_err("age:[1 TO 2}"), QueryError::Syntax { .. }));
    }

    #[test]
    fn test_boolean_operators_case_insensitive() {
        assert_eq!(
            parse("name:a and name:b OR name:c"),
            Expr::or(
                Expr::and(Expr::equals("name", "a"), Expr::equals("name", "b")),
                Expr::equals("name", "c"),
            )
        );
        assert_eq!(
            parse("name:a || name:b"),
            Expr::or(Expr::equals("name", "a"), Expr::equals("name", "b"))
        );
    }

    #[test]
    fn test_implicit_conjunction() {
        assert_eq!(
            parse("name:a name:b"),
            Expr::and(Expr::equals("name", "a"), Expr::equals("name", "b"))
        );
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(
            parse("+name:a -name:b"),
            Expr::and(
                Expr::must(Expr::equals("name", "a")),
                Expr::must_not(Expr::equals("name", "b")),
            )
        );
        assert_eq!(
            parse("NOT name:a"),
            Expr::must_not(Expr::equals("name", "a"))
        );
        assert_eq!(
            parse("name:a AND !name:b"),
            Expr::and(
                Expr::equals("name", "a"),
                Expr::must_not(Expr::equals("name", "b")),
            )
        );
    }

    #[test]
    fn test_prefix_runs_collapse() {
        let inner = || Expr::equals("name", "a");
        assert_eq!(parse("!!name:a"), inner());
        assert_eq!(parse("NOT NOT NOT name:a"), Expr::must_not(inner()));
        assert_eq!(parse("+-name:a"), Expr::must_not(inner()));
        assert_eq!(parse("- - + name:a"), Expr::must(inner()));

        let deep = format!("{}name:a", "!".repeat(9_001));
        assert_eq!(parse(&deep), Expr::must_not(inner()));
    }

    #[test]
    fn test_glued_clauses_rejected() {
        for input in [
            r#"name:"a"secret:1"#,
            "name:x~secret:1",
            "name:x^2secret:1",
            "age:[1 TO 2]secret:1",
            "name:(a)secret:1",
            "(name:a)secret:1",
        ] {
            assert!(
                matches!(parse_err(input), QueryError::Syntax { .. }),
                "{input}"
            );
        }
        assert_eq!(
            parse("name:a(name:b)"),
            Expr::and(Expr::equals("name", "a"), Expr::equals("name", "b"))
        );
    }

    #[test]
    fn test_grouping() {
        assert_eq!(
            parse("(name:a OR name:b) AND age:1"),
            Expr::and(
                Expr::or(Expr::equals("name", "a"), Expr::equals("name", "b")),
                Expr::equals("age", "1"),
            )
        );
    }

    #[test]
    fn test_field_group_binds_field() {
        assert_eq!(
            parse("tag:(a OR b)"),
            Expr::Equals {
                column: Column::new("tag"),
                value: Value::Expr(Box::new(Expr::or(
                    Expr::equals("tag", "a"),
                    Expr::equals("tag", "b"),
                ))),
            }
        );
    }

    #[test]
    fn test_fuzzy_and_boost() {
        assert_eq!(
            parse("name:john~2"),
            Expr::Fuzzy {
                term: Box::new(Expr::equals("name", "john")),
                distance: Some(2),
            }
        );
        assert_eq!(
            parse("name:john~"),
            Expr::Fuzzy {
                term: Box::new(Expr::equals("name", "john")),
                distance: None,
            }
        );
        assert_eq!(
            parse("name:john^2"),
            Expr::Boost {
                operand: Box::new(Expr::equals("name", "john")),
                power: 2.0,
            }
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            parse("age:>=10"),
            Expr::GreaterEq {
                column: Column::new("age"),
                value: Value::Number(10.0),
            }
        );
        assert_eq!(
            parse("name:<m"),
            Expr::Less {
                column: Column::new("name"),
                value: Value::from("m"),
            }
        );
    }

    #[test]
    fn test_nested_field() {
        assert_eq!(parse("meta.team:core"), Expr::equals("meta.team", "core"));
    }

    #[test]
    fn test_default_field_fallback() {
        assert_eq!(parse("john"), Expr::equals("name", "john"));

        let bare = LuceneSyntax::default().parse("john").unwrap().unwrap();
        assert_eq!(
            bare,
            Expr::Literal {
                value: Value::from("john")
            }
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse(r"name:a\:b\ c"), Expr::equals("name", "a:b c"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_err("name:(a"), QueryError::Syntax { .. }));
        assert!(matches!(parse_err("name:a)"), QueryError::Syntax { .. }));
        assert!(matches!(parse_err("name:a AND"), QueryError::Syntax { .. }));
        assert!(matches!(parse_err(r#"name:"open"#), QueryError::Syntax { .. }));
    }
}
