//! Single-pass tokenizer shared by the safety validator and the expander.
//!
//! Quoted phrases and bracketed ranges are kept as atomic tokens, backslash
//! escapes are honored, and bracket depth is measured in the same pass so the
//! depth and term-count limits never disagree about quoting.

/// Classification of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `(`
    Open,
    /// `)`
    Close,
    /// `AND`, `OR`, `NOT`, `&&`, `||`, `!`
    Operator,
    /// A lone `+` or `-` applied to the following group
    Sign,
    /// `field:` immediately followed by a grouped value
    FieldPrefix,
    /// `field:value`, `field:"phrase"`, `field:[a TO b]`
    Fielded,
    /// `"phrase"`, optionally signed
    Phrase,
    /// `[a TO b]` or `{a TO b}` without a field
    Range,
    /// A bare word
    Term,
}

impl TokenKind {
    /// Whether the token counts against the term limit
    pub fn is_term(self) -> bool {
        matches!(
            self,
            Self::Fielded | Self::Phrase | Self::Range | Self::Term
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
}

/// Result of scanning a query.
#[derive(Debug, Clone, Default)]
pub struct Scan<'a> {
    pub tokens: Vec<Token<'a>>,
    pub max_depth: usize,
}

impl Scan<'_> {
    pub fn term_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.kind.is_term()).count()
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn open(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Consume through the closing quote (or end of input)
    fn skip_quoted(&mut self) {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '"' => return,
                _ => {}
            }
        }
    }

    /// Consume a bracketed range body through its closing bracket
    fn skip_range(&mut self) {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '"' => self.skip_quoted(),
                ']' | '}' => {
                    self.close();
                    return;
                }
                _ => {}
            }
        }
    }

    /// Consume one word, keeping embedded phrases and ranges intact
    fn word(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                return;
            }
            self.bump();
            match c {
                '\\' => {
                    self.bump();
                }
                '"' => self.skip_quoted(),
                '[' | '{' => {
                    self.open();
                    self.skip_range();
                }
                ']' | '}' => self.close(),
                _ => {}
            }
        }
    }
}

/// Tokenize `input` and measure its bracket depth.
pub fn scan(input: &str) -> Scan<'_> {
    let mut cursor = Cursor {
        input,
        pos: 0,
        depth: 0,
        max_depth: 0,
    };
    let mut tokens = Vec::new();

    while let Some(c) = cursor.peek() {
        let start = cursor.pos;
        if c.is_whitespace() {
            cursor.bump();
            continue;
        }
        let kind = match c {
            '(' => {
                cursor.bump();
                cursor.open();
                TokenKind::Open
            }
            ')' => {
                cursor.bump();
                cursor.close();
                TokenKind::Close
            }
            _ => {
                cursor.word();
                let text = &input[start..cursor.pos];
                let next_is_group = cursor.peek() == Some('(');
                classify(text, next_is_group)
            }
        };
        tokens.push(Token {
            text: &input[start..cursor.pos],
            kind,
        });
    }

    Scan {
        tokens,
        max_depth: cursor.max_depth,
    }
}

/// Whether `word` is a boolean operator (case-insensitive)
pub fn is_operator(word: &str) -> bool {
    ["AND", "OR", "NOT"]
        .iter()
        .any(|op| word.eq_ignore_ascii_case(op))
        || matches!(word, "&&" | "||" | "!")
}

fn classify(text: &str, next_is_group: bool) -> TokenKind {
    if is_operator(text) {
        return TokenKind::Operator;
    }
    if matches!(text, "+" | "-") {
        return TokenKind::Sign;
    }
    if let Some(colon) = qualifier_colon(text) {
        return if colon + 1 == text.len() && next_is_group {
            TokenKind::FieldPrefix
        } else {
            TokenKind::Fielded
        };
    }
    let (_, body) = split_sign(text);
    match body.chars().next() {
        Some('"') => TokenKind::Phrase,
        Some('[') | Some('{') => TokenKind::Range,
        _ => TokenKind::Term,
    }
}

/// Split a leading `+`, `-` or `!` off a token
pub fn split_sign(text: &str) -> (&str, &str) {
    match text.as_bytes().first() {
        Some(b'+') | Some(b'-') | Some(b'!') => text.split_at(1),
        _ => ("", text),
    }
}

/// Byte offset of the colon that makes a token field-qualified.
///
/// Only a colon reached before any quote or bracket qualifies, and escaped
/// colons never do.
pub fn qualifier_colon(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ':' if i > 0 => return Some(i),
            '"' | '[' | '{' => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(String, TokenKind)> {
        scan(input)
            .tokens
            .into_iter()
            .map(|t| (t.text.to_string(), t.kind))
            .collect()
    }

    #[test]
    fn test_scan_keeps_phrases_and_ranges_atomic() {
        let tokens = kinds(r#"name:"john smith" AND age:[25 TO 30] "x y""#);
        assert_eq!(
            tokens,
            vec![
                (r#"name:"john smith""#.to_string(), TokenKind::Fielded),
                ("AND".to_string(), TokenKind::Operator),
                ("age:[25 TO 30]".to_string(), TokenKind::Fielded),
                (r#""x y""#.to_string(), TokenKind::Phrase),
            ]
        );
    }

    #[test]
    fn test_scan_parens_and_signs() {
        let tokens = kinds("-(a OR +b)");
        let k: Vec<_> = tokens.iter().map(|(_, k)| *k).collect();
        assert_eq!(
            k,
            vec![
                TokenKind::Sign,
                TokenKind::Open,
                TokenKind::Term,
                TokenKind::Operator,
                TokenKind::Term,
                TokenKind::Close,
            ]
        );
    }

    #[test]
    fn test_scan_field_prefix_before_group() {
        let tokens = kinds("name:(a OR b)");
        assert_eq!(tokens[0], ("name:".to_string(), TokenKind::FieldPrefix));
        assert_eq!(tokens[1].1, TokenKind::Open);
    }

    #[test]
    fn test_scan_depth_counts_all_brackets() {
        assert_eq!(scan("((a:[1 TO 2]))").max_depth, 3);
        assert_eq!(scan("a b c").max_depth, 0);
    }

    #[test]
    fn test_scan_ignores_brackets_in_quotes_and_escapes() {
        assert_eq!(scan(r#""((((" a\(\("#).max_depth, 0);
        assert_eq!(scan(r#"a:"\"(" b"#).tokens.len(), 2);
    }

    #[test]
    fn test_term_count_excludes_operators_and_parens() {
        let scan = scan(r#"(a OR b) AND NOT name:c "d e" [1 TO 2]"#);
        assert_eq!(scan.term_count(), 5);
    }

    #[test]
    fn test_escaped_colon_is_not_a_qualifier() {
        assert_eq!(qualifier_colon(r"a\:b"), None);
        assert_eq!(qualifier_colon("a:b"), Some(1));
        assert_eq!(qualifier_colon(r#""a:b""#), None);
        assert_eq!(qualifier_colon(":b"), None);
    }

    #[test]
    fn test_operators_case_insensitive() {
        assert!(is_operator("and"));
        assert!(is_operator("Or"));
        assert!(is_operator("||"));
        assert!(!is_operator("android"));
    }
}
