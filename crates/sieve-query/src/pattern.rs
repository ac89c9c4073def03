//! Escape and wildcard handling for raw query terms.
//!
//! Terms keep their backslash escapes until rendering so an escaped `\*`
//! stays a literal star while a bare `*` stays a wildcard.

/// Whether `raw` contains `target` outside an escape
pub fn has_unescaped(raw: &str, target: char) -> bool {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == target {
            return true;
        }
    }
    false
}

/// Whether a raw term contains an unescaped `*` or `?`
pub fn has_wildcard(raw: &str) -> bool {
    has_unescaped(raw, '*') || has_unescaped(raw, '?')
}

/// Drop escape backslashes, keeping the escaped characters
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Rewrite a query pattern into a SQL `LIKE` value.
///
/// `*` becomes `%`, `?` becomes `_`, and literal `%`, `_` and `\` are
/// escaped with a backslash.
pub fn to_sql_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        let literal = match c {
            '\\' => match chars.next() {
                Some(next) => next,
                None => continue,
            },
            '*' => {
                out.push('%');
                continue;
            }
            '?' => {
                out.push('_');
                continue;
            }
            other => other,
        };
        if matches!(literal, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(literal);
    }
    out
}

/// Shape of a wildcard pattern that has a PartiQL equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeShape {
    /// `*t*` or `*t`
    Contains(String),
    /// `t*`
    BeginsWith(String),
    /// No wildcards at all
    Exact(String),
    /// Only stars, matches any present value
    Any,
}

/// Classify a pattern for engines without `LIKE`.
///
/// Returns `None` for `?` wildcards and interior stars, which have no
/// equivalent.
pub fn like_shape(raw: &str) -> Option<LikeShape> {
    if has_unescaped(raw, '?') {
        return None;
    }

    let leading = raw.starts_with('*');
    let core_start = raw.len() - raw.trim_start_matches('*').len();
    let body = &raw[core_start..];

    // A trailing star is a wildcard unless it is escaped
    let mut core = body;
    let mut trailing = false;
    while core.ends_with('*') && !ends_escaped(&core[..core.len() - 1]) {
        core = &core[..core.len() - 1];
        trailing = true;
    }

    if has_unescaped(core, '*') {
        return None;
    }
    let text = unescape(core);
    Some(match (leading, trailing) {
        _ if text.is_empty() && (leading || trailing) => LikeShape::Any,
        (true, _) => LikeShape::Contains(text),
        (false, true) => LikeShape::BeginsWith(text),
        (false, false) => LikeShape::Exact(text),
    })
}

/// Whether `s` ends in an odd run of backslashes (escaping the next char)
fn ends_escaped(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\:b\\c\*"), r"a:b\c*");
    }

    #[test]
    fn test_sql_like_conversion() {
        assert_eq!(to_sql_like("john*"), "john%");
        assert_eq!(to_sql_like("j?hn"), "j_hn");
        assert_eq!(to_sql_like(r"50\%*"), r"50\%%");
        assert_eq!(to_sql_like("a_b*"), r"a\_b%");
        assert_eq!(to_sql_like(r"lit\*"), "lit*");
    }

    #[test]
    fn test_like_shapes() {
        assert_eq!(like_shape("*john*"), Some(LikeShape::Contains("john".into())));
        assert_eq!(like_shape("*john"), Some(LikeShape::Contains("john".into())));
        assert_eq!(like_shape("john*"), Some(LikeShape::BeginsWith("john".into())));
        assert_eq!(like_shape("john"), Some(LikeShape::Exact("john".into())));
        assert_eq!(like_shape("*"), Some(LikeShape::Any));
        assert_eq!(like_shape(r"jo\*hn*"), Some(LikeShape::BeginsWith("jo*hn".into())));
        assert_eq!(like_shape(r"john\*"), Some(LikeShape::Exact("john*".into())));
    }

    #[test]
    fn test_like_shape_unsupported() {
        assert_eq!(like_shape("jo*hn"), None);
        assert_eq!(like_shape("jo?n"), None);
    }
}
