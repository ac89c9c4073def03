//! Shared parser primitives for the query grammar.

use chumsky::extra;
use chumsky::prelude::*;

/// Extra type for parsers - uses Rich errors for better messages
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Characters that end a bare term unless escaped
const TERM_DELIMITERS: &str = "()[]{}\"^~:\\";

// ============================================================================
// Primitive parsers
// ============================================================================

/// Raw term text with escapes preserved: `jo\:hn*`
pub fn term_raw<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    let escaped = just('\\').then(any()).ignored();
    let plain = any()
        .filter(|c: &char| !c.is_whitespace() && !TERM_DELIMITERS.contains(*c))
        .ignored();

    escaped
        .or(plain)
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("term")
}

/// Case-insensitive keyword, or its symbolic alias
pub fn keyword<'src>(
    word: &'static str,
    symbol: &'static str,
) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    term_raw()
        .try_map(move |s: &str, span| {
            if s.eq_ignore_ascii_case(word) || s == symbol {
                Ok(())
            } else {
                Err(Rich::custom(span, format!("expected {word}")))
            }
        })
        .labelled(word)
}

/// Whether a bare word would be read as an operator
pub fn is_reserved(word: &str) -> bool {
    ["AND", "OR", "NOT"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
        || matches!(word, "&&" | "||")
}

/// Double-quoted phrase with backslash escapes: "john \"jj\" smith"
pub fn phrase<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escaped = just('\\').ignore_then(any());
    let plain = none_of("\\\"");

    just('"')
        .ignore_then(escaped.or(plain).repeated().collect::<String>())
        .then_ignore(just('"'))
        .labelled("quoted phrase")
}

/// Field reference: `name` or `base.sub`
pub fn field_name<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let head = any().filter(|c: &char| c.is_ascii_alphabetic() || *c == '_');
    let tail = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated();
    let segment = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1);

    head.then(tail)
        .then(just('.').then(segment).or_not())
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("field name")
}

fn digits<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .to_slice()
}

/// Unsigned integer, e.g. the `2` in `~2`
pub fn integer<'src>() -> impl Parser<'src, &'src str, u32, Extra<'src>> + Clone {
    digits()
        .try_map(|s: &str, span| {
            s.parse::<u32>()
                .map_err(|_| Rich::custom(span, "integer overflow"))
        })
        .labelled("integer")
}

/// Decimal number, e.g. the `1.5` in `^1.5`
pub fn decimal<'src>() -> impl Parser<'src, &'src str, f64, Extra<'src>> + Clone {
    digits()
        .then(just('.').then(digits()).or_not())
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<f64>()
                .map_err(|_| Rich::custom(span, "invalid number"))
        })
        .labelled("number")
}

// ============================================================================
// Error formatting
// ============================================================================

/// Format chumsky errors with line and column positions
pub fn format_errors(errs: &[Rich<'_, char>], input: &str) -> String {
    errs.iter()
        .map(|e| {
            let start = e.span().start.min(input.len());
            let line = input[..start].matches('\n').count() + 1;
            let col = input[..start]
                .rfind('\n')
                .map_or(input[..start].chars().count(), |i| {
                    input[i + 1..start].chars().count()
                });

            let found = e
                .found()
                .map_or("end of input".to_string(), |c| format!("'{}'", c));

            format!(
                "line {}, column {}: {} (found {})",
                line,
                col + 1,
                e.reason(),
                found
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_raw_keeps_escapes() {
        let result = term_raw().parse(r"jo\:hn*").into_result();
        assert_eq!(result.unwrap(), r"jo\:hn*");
    }

    #[test]
    fn test_term_raw_stops_at_delimiters() {
        let result = term_raw().then_ignore(any().repeated()).parse("john^2").into_result();
        assert_eq!(result.unwrap(), "john");
    }

    #[test]
    fn test_keyword_case_insensitive() {
        assert!(keyword("AND", "&&").parse("and").into_result().is_ok());
        assert!(keyword("AND", "&&").parse("&&").into_result().is_ok());
        assert!(keyword("AND", "&&").parse("android").into_result().is_err());
    }

    #[test]
    fn test_phrase_with_escaped_quote() {
        let result = phrase().parse(r#""say \"hi\"""#).into_result();
        assert_eq!(result.unwrap(), r#"say "hi""#);
    }

    #[test]
    fn test_field_name_nested() {
        assert_eq!(field_name().parse("meta.team").into_result().unwrap(), "meta.team");
        assert_eq!(field_name().parse("_id").into_result().unwrap(), "_id");
        assert!(field_name().parse("1abc").into_result().is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(integer().parse("2").into_result().unwrap(), 2);
        assert_eq!(decimal().parse("1.5").into_result().unwrap(), 1.5);
        assert!(integer().parse("99999999999").into_result().is_err());
    }

    fn a_then_b<'src>() -> impl Parser<'src, &'src str, (char, char), Extra<'src>> {
        just('a').then(just('b'))
    }

    #[test]
    fn test_format_errors_position() {
        let errs = a_then_b().parse("ax").into_result().unwrap_err();
        let msg = format_errors(&errs, "ax");
        assert!(msg.starts_with("line 1, column 2"));
        assert!(msg.contains("'x'"));
    }
}
