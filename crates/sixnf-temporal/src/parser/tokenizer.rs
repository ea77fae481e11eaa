//! SQL tokenizer.
//!
//! Produces just enough structure for statement classification: words,
//! quoted identifiers, literals, parameters and punctuation, each with its
//! byte span in the source. Whitespace and comments are dropped but remain
//! recoverable through the spans.

use std::ops::Range;

use sixnf_core::models::ParamRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Keyword or bare identifier.
    Word,
    /// `"..."`, `[...]` or `` `...` ``.
    QuotedIdent,
    /// `'...'`.
    String,
    Number,
    Param(ParamRef),
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn text<'a>(&self, sql: &'a str) -> &'a str {
        &sql[self.span.clone()]
    }

    pub fn is_keyword(&self, sql: &str, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text(sql).eq_ignore_ascii_case(keyword)
    }

    pub fn is_punct(&self, sql: &str, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(sql) == punct
    }

    /// The identifier this token names, unquoted. `None` for non-identifiers.
    pub fn ident(&self, sql: &str) -> Option<String> {
        let text = self.text(sql);
        match self.kind {
            TokenKind::Word => Some(text.to_string()),
            TokenKind::QuotedIdent => {
                let inner = &text[1..text.len() - 1];
                Some(match text.as_bytes()[0] {
                    b'"' => inner.replace("\"\"", "\""),
                    b'`' => inner.replace("``", "`"),
                    _ => inner.to_string(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError {
    pub offset: usize,
    pub reason: &'static str,
}

/// Tokenize one statement (or a script).
///
/// Anonymous `?` placeholders are numbered after the largest index seen so
/// far, the way SQLite numbers them.
pub fn tokenize(sql: &str) -> Result<Vec<Token>, TokenizeError> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut max_index = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' => {
                i += 1;
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = find_byte(bytes, i, b'\n').map_or(bytes.len(), |p| p + 1);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                // An unterminated block comment runs to the end, as in SQLite.
                i = find_seq(bytes, i + 2, b"*/").map_or(bytes.len(), |p| p + 2);
                continue;
            }
            b'\'' => {
                i = close_quote(bytes, i, b'\'').ok_or(TokenizeError {
                    offset: start,
                    reason: "unterminated string literal",
                })?;
                TokenKind::String
            }
            b'"' | b'`' => {
                i = close_quote(bytes, i, c).ok_or(TokenizeError {
                    offset: start,
                    reason: "unterminated quoted identifier",
                })?;
                TokenKind::QuotedIdent
            }
            b'[' => {
                i = find_byte(bytes, i, b']').ok_or(TokenizeError {
                    offset: start,
                    reason: "unterminated bracket identifier",
                })? + 1;
                TokenKind::QuotedIdent
            }
            b'0'..=b'9' => {
                i = scan_number(bytes, i);
                TokenKind::Number
            }
            b'.' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                i = scan_number(bytes, i);
                TokenKind::Number
            }
            b'?' => {
                i += 1;
                let digits = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let index = if i > digits {
                    sql[digits..i].parse::<usize>().map_err(|_| TokenizeError {
                        offset: start,
                        reason: "parameter index out of range",
                    })?
                } else {
                    max_index + 1
                };
                if index == 0 {
                    return Err(TokenizeError {
                        offset: start,
                        reason: "parameter index must be positive",
                    });
                }
                max_index = max_index.max(index);
                TokenKind::Param(ParamRef::Positional(index - 1))
            }
            b':' | b'@' | b'$' if bytes.get(i + 1).is_some_and(|b| is_ident_byte(*b)) => {
                i = scan_ident(bytes, i + 1);
                TokenKind::Param(ParamRef::Named(sql[start..i].to_string()))
            }
            c if is_ident_start(c) => {
                i = scan_ident(bytes, i);
                TokenKind::Word
            }
            _ => {
                i += punct_len(bytes, i);
                TokenKind::Punct
            }
        };
        tokens.push(Token {
            kind,
            span: start..i,
        });
    }

    Ok(tokens)
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

fn scan_ident(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    i
}

fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    if bytes[i] == b'0' && matches!(bytes.get(i + 1), Some(b'x' | b'X')) {
        i += 2;
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        return i;
    }
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.' || bytes[i] == b'_') {
        i += 1;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

/// End offset (exclusive) of a quoted run starting at `start`; doubled quotes escape.
fn close_quote(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|b| *b == needle).map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn punct_len(bytes: &[u8], i: usize) -> usize {
    const TWO: [&[u8]; 8] = [b"||", b"<=", b">=", b"<>", b"!=", b"==", b"<<", b">>"];
    if let Some(pair) = bytes.get(i..i + 2) {
        if TWO.contains(&pair) {
            return 2;
        }
    }
    // Keep multi-byte characters whole so spans stay on char boundaries.
    match bytes[i] {
        b if b < 0x80 => 1,
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<(TokenKind, String)> {
        tokenize(sql)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind.clone(), t.text(sql).to_string()))
            .collect()
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        let toks = kinds("SELECT -- hi\n a /* x; */ FROM t");
        let texts: Vec<_> = toks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["SELECT", "a", "FROM", "t"]);
    }

    #[test]
    fn quoting_styles() {
        let sql = r#"SELECT "a""b", [c d], `e`, 'it''s' FROM t"#;
        let toks = tokenize(sql).unwrap();
        assert_eq!(toks[1].ident(sql).unwrap(), "a\"b");
        assert_eq!(toks[3].ident(sql).unwrap(), "c d");
        assert_eq!(toks[5].ident(sql).unwrap(), "e");
        assert_eq!(toks[7].kind, TokenKind::String);
    }

    #[test]
    fn anonymous_parameters_follow_numbered_ones() {
        let toks = tokenize("SELECT ?, ?5, ?, :n, @m, $o").unwrap();
        let params: Vec<_> = toks
            .into_iter()
            .filter_map(|t| match t.kind {
                TokenKind::Param(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(
            params,
            vec![
                ParamRef::Positional(0),
                ParamRef::Positional(4),
                ParamRef::Positional(5),
                ParamRef::Named(":n".into()),
                ParamRef::Named("@m".into()),
                ParamRef::Named("$o".into()),
            ]
        );
    }

    #[test]
    fn operators_and_numbers() {
        let toks = kinds("a<=1.5e3||b<>0x1F");
        let texts: Vec<_> = toks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["a", "<=", "1.5e3", "||", "b", "<>", "0x1F"]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("SELECT 'abc").is_err());
        assert!(tokenize("SELECT ?0").is_err());
    }
}
