//! Implicit-term expander.
//!
//! Rewrites bare tokens into field-qualified `OR` groups over every
//! implicit-eligible field, so `john` against `name` and `email` becomes
//! `(name:*john* OR email:*john*)`.

use crate::pattern::has_wildcard;
use crate::scan::{scan, split_sign, TokenKind};
use crate::schema::FieldSchema;

/// Expands unfielded terms across a fixed list of fields.
#[derive(Debug, Clone)]
pub struct ImplicitExpander {
    fields: Vec<String>,
}

impl ImplicitExpander {
    pub fn new(schema: &FieldSchema) -> Self {
        Self {
            fields: schema.implicit_fields().map(|f| f.name.clone()).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn expand(&self, raw: &str) -> String {
        if self.fields.is_empty() {
            return raw.to_string();
        }
        let scanned = scan(raw);

        let mut out = String::with_capacity(raw.len() * 2);
        let mut glue = false;
        // One entry per open paren: whether it opened a `field:(...)` group
        let mut groups: Vec<bool> = Vec::new();
        let mut after_prefix = false;

        for token in &scanned.tokens {
            let in_field_group = groups.iter().any(|g| *g);
            let piece = match token.kind {
                TokenKind::Open => {
                    groups.push(after_prefix);
                    token.text.to_string()
                }
                TokenKind::Close => {
                    groups.pop();
                    token.text.to_string()
                }
                TokenKind::Term | TokenKind::Phrase if !in_field_group => {
                    self.expand_token(token.text, token.kind == TokenKind::Phrase)
                }
                _ => token.text.to_string(),
            };

            if glue && token.kind != TokenKind::Close {
                out.push(' ');
            }
            out.push_str(&piece);

            after_prefix = token.kind == TokenKind::FieldPrefix;
            glue = !matches!(
                token.kind,
                TokenKind::Open | TokenKind::Sign | TokenKind::FieldPrefix
            );
        }
        out
    }

    fn expand_token(&self, text: &str, is_phrase: bool) -> String {
        let (sign, body) = split_sign(text);
        let (core, suffix) = split_modifiers(body, is_phrase);

        let value = if is_phrase || has_wildcard(core) || suffix.starts_with('~') {
            core.to_string()
        } else {
            format!("*{core}*")
        };

        let alternatives: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{field}:{value}{suffix}"))
            .collect();

        if alternatives.len() == 1 {
            format!("{sign}{}", alternatives[0])
        } else {
            format!("{sign}({})", alternatives.join(" OR "))
        }
    }
}

/// Split trailing `~N` / `^N` modifiers off a bare term or phrase.
fn split_modifiers(body: &str, is_phrase: bool) -> (&str, &str) {
    if is_phrase {
        // Phrase ends at its closing quote; anything after is a modifier
        let mut chars = body.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => return body.split_at(i + 1),
                _ => {}
            }
        }
        return (body, "");
    }

    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '~' | '^' if i > 0 => return body.split_at(i),
            _ => {}
        }
    }
    (body, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind};

    fn expander(names: &[&str]) -> ImplicitExpander {
        let mut fields: Vec<FieldDescriptor> =
            names.iter().map(|n| FieldDescriptor::text(*n)).collect();
        fields.push(FieldDescriptor::new("age", FieldKind::Number));
        ImplicitExpander::new(&FieldSchema::new(fields).unwrap())
    }

    #[test]
    fn test_expand_multiple_fields() {
        let e = expander(&["name", "email"]);
        assert_eq!(e.expand("john"), "(name:*john* OR email:*john*)");
    }

    #[test]
    fn test_expand_single_field_unparenthesized() {
        let e = expander(&["name"]);
        assert_eq!(e.expand("john"), "name:*john*");
    }

    #[test]
    fn test_expand_no_implicit_fields() {
        let e = expander(&[]);
        assert_eq!(e.expand("john  AND x"), "john  AND x");
    }

    #[test]
    fn test_fielded_and_operators_untouched() {
        let e = expander(&["name", "email"]);
        assert_eq!(
            e.expand("age:[1 TO 5] AND name:bob"),
            "age:[1 TO 5] AND name:bob"
        );
    }

    #[test]
    fn test_phrase_and_wildcards_pass_through() {
        let e = expander(&["name", "email"]);
        assert_eq!(
            e.expand(r#""john smith""#),
            r#"(name:"john smith" OR email:"john smith")"#
        );
        assert_eq!(e.expand("jo*"), "(name:jo* OR email:jo*)");
        assert_eq!(e.expand("jo?n"), "(name:jo?n OR email:jo?n)");
    }

    #[test]
    fn test_sign_reapplied() {
        let e = expander(&["name", "email"]);
        assert_eq!(e.expand("-john"), "-(name:*john* OR email:*john*)");
        assert_eq!(expander(&["name"]).expand("+john"), "+name:*john*");
        assert_eq!(expander(&["name"]).expand("!john"), "!name:*john*");
    }

    #[test]
    fn test_modifiers_kept_per_alternative() {
        let e = expander(&["name", "email"]);
        assert_eq!(e.expand("john~"), "(name:john~ OR email:john~)");
        assert_eq!(e.expand("john^2"), "(name:*john*^2 OR email:*john*^2)");
    }

    #[test]
    fn test_groups_and_field_groups() {
        let e = expander(&["name"]);
        assert_eq!(e.expand("(a OR b)"), "(name:*a* OR name:*b*)");
        assert_eq!(e.expand("name:(a OR b)"), "name:(a OR b)");
        assert_eq!(e.expand("- (a)"), "-(name:*a*)");
    }

    #[test]
    fn test_bare_range_untouched() {
        let e = expander(&["name"]);
        assert_eq!(e.expand("[a TO b]"), "[a TO b]");
    }
}
