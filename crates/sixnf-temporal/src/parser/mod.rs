//! Statement parsing: tokenizer, token cursor, script splitting and
//! decomposition into intents.

pub mod decompose;
mod tokenizer;

pub use decompose::{decompose, StatementKind};
pub use tokenizer::{tokenize, Token, TokenKind, TokenizeError};

use sixnf_core::models::{ObjectName, ParamRef, SqlFragment};

/// Split a script into statements at top-level `;`.
///
/// Semicolons inside literals, comments and trigger bodies do not split.
/// Empty statements are dropped. A script that fails to tokenize is returned
/// whole so the engine can report the error.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let Ok(tokens) = tokenize(sql) else {
        return vec![sql.trim()].into_iter().filter(|s| !s.is_empty()).collect();
    };

    let mut statements = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_trigger = false;
    let mut head_words = 0usize;
    let mut creates = false;
    let mut last_was_end = false;

    for token in &tokens {
        if token.is_punct(sql, ";") {
            if !in_trigger || last_was_end {
                if let Some(s) = start.take() {
                    statements.push(sql[s..token.span.start].trim());
                }
                in_trigger = false;
                head_words = 0;
            }
            last_was_end = false;
            continue;
        }
        if start.is_none() {
            start = Some(token.span.start);
        }
        if token.kind == TokenKind::Word && head_words < 3 {
            if head_words == 0 {
                creates = token.is_keyword(sql, "CREATE");
            } else if creates && token.is_keyword(sql, "TRIGGER") {
                in_trigger = true;
            }
            head_words += 1;
        }
        last_was_end = token.is_keyword(sql, "END");
    }
    if let Some(s) = start {
        statements.push(sql[s..].trim());
    }
    statements.retain(|s| !s.is_empty());
    statements
}

/// Forward-only cursor over a statement's tokens.
pub(crate) struct Cursor<'a> {
    pub sql: &'a str,
    pub tokens: &'a [Token],
    pub pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(sql: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            sql,
            tokens,
            pos: 0,
        }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(self.sql, keyword))
    }

    pub fn at_punct(&self, punct: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(self.sql, punct))
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a sequence of keywords, all or nothing.
    pub fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let matched = keywords.iter().enumerate().all(|(i, kw)| {
            self.peek_at(i)
                .is_some_and(|t| t.is_keyword(self.sql, kw))
        });
        if matched {
            self.pos += keywords.len();
        }
        matched
    }

    pub fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Option<()> {
        self.eat_keyword(keyword).then_some(())
    }

    pub fn expect_punct(&mut self, punct: &str) -> Option<()> {
        self.eat_punct(punct).then_some(())
    }

    pub fn ident(&mut self) -> Option<String> {
        let name = self.peek()?.ident(self.sql)?;
        self.pos += 1;
        Some(name)
    }

    /// `[schema .] name`
    pub fn object_name(&mut self) -> Option<ObjectName> {
        let first = self.ident()?;
        if self.eat_punct(".") {
            let name = self.ident()?;
            return Some(ObjectName {
                schema: Some(first),
                name,
            });
        }
        Some(ObjectName::bare(first))
    }

    /// `( ident [, ident]* )`
    pub fn ident_list(&mut self) -> Option<Vec<String>> {
        self.expect_punct("(")?;
        let mut names = vec![self.ident()?];
        while self.eat_punct(",") {
            names.push(self.ident()?);
        }
        self.expect_punct(")")?;
        Some(names)
    }

    /// Consume tokens up to (not including) the first depth-0 token matching
    /// `stop`. Returns `None` on unbalanced parentheses.
    pub fn take_until(&mut self, stop: impl Fn(&Token, &str) -> bool) -> Option<&'a [Token]> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && stop(token, self.sql) {
                break;
            }
            if token.is_punct(self.sql, "(") {
                depth += 1;
            } else if token.is_punct(self.sql, ")") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            self.pos += 1;
        }
        (depth == 0).then(|| &self.tokens[start..self.pos])
    }

    /// Consume tokens up to the first depth-0 occurrence of any keyword in `stops`.
    pub fn take_until_keywords(&mut self, stops: &[&str]) -> Option<&'a [Token]> {
        self.take_until(|t, sql| stops.iter().any(|kw| t.is_keyword(sql, kw)))
    }

    /// Everything remaining.
    pub fn rest(&mut self) -> &'a [Token] {
        let rest = &self.tokens[self.pos.min(self.tokens.len())..];
        self.pos = self.tokens.len();
        rest
    }

    pub fn fragment(&self, tokens: &[Token]) -> SqlFragment {
        fragment(self.sql, tokens)
    }
}

/// Build a fragment from a contiguous token run, keeping the source text
/// between tokens and normalizing positional placeholders to `?`.
pub fn fragment(sql: &str, tokens: &[Token]) -> SqlFragment {
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return SqlFragment::default();
    };
    let mut text = String::with_capacity(last.span.end - first.span.start);
    let mut params = Vec::new();
    let mut cursor = first.span.start;
    for token in tokens {
        text.push_str(&sql[cursor..token.span.start]);
        match &token.kind {
            TokenKind::Param(ParamRef::Positional(i)) => {
                text.push('?');
                params.push(ParamRef::Positional(*i));
            }
            TokenKind::Param(named) => {
                text.push_str(token.text(sql));
                params.push(named.clone());
            }
            _ => text.push_str(token.text(sql)),
        }
        cursor = token.span.end;
    }
    SqlFragment::new(text, params)
}

/// Whether any depth-0 token in `tokens` is one of `keywords`.
pub(crate) fn has_top_level_keyword(sql: &str, tokens: &[Token], keywords: &[&str]) -> bool {
    let mut depth = 0i32;
    for token in tokens {
        if token.is_punct(sql, "(") {
            depth += 1;
        } else if token.is_punct(sql, ")") {
            depth -= 1;
        } else if depth == 0 && keywords.iter().any(|kw| token.is_keyword(sql, kw)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_literals_and_comments() {
        let script = "CREATE TABLE a (x); INSERT INTO a VALUES ('1;2'); -- c;\n SELECT 1 /* ; */ ;;";
        assert_eq!(
            split_statements(script),
            vec![
                "CREATE TABLE a (x)",
                "INSERT INTO a VALUES ('1;2')",
                "SELECT 1 /* ; */",
            ]
        );
    }

    #[test]
    fn split_keeps_trigger_bodies_whole() {
        let script = "CREATE TRIGGER t AFTER INSERT ON a BEGIN SELECT 1; SELECT 2; END; SELECT 3";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("END"));
        assert_eq!(statements[1], "SELECT 3");
    }

    #[test]
    fn fragments_normalize_numbered_placeholders() {
        let sql = "x = ?3 AND y = :name";
        let tokens = tokenize(sql).unwrap();
        let frag = fragment(sql, &tokens);
        assert_eq!(frag.text, "x = ? AND y = :name");
        assert_eq!(
            frag.params,
            vec![ParamRef::Positional(2), ParamRef::Named(":name".into())]
        );
    }
}
