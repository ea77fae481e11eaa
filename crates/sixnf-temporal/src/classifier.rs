//! Statement classification.
//!
//! A `RegexSet` over the normalized keyword head picks the statement family,
//! then structural decomposition extracts the intent. Anything that does not
//! fit is `Unrecognized` and reaches the engine untouched.

use regex::RegexSet;
use tracing::trace;

use sixnf_core::models::StatementIntent;

use crate::parser::{decompose, tokenize, StatementKind, TokenKind};

/// Number of leading words that make up a statement's head.
const HEAD_WORDS: usize = 4;

/// Head patterns, indexed like `KINDS`.
const HEAD_PATTERNS: [&str; 6] = [
    r"^CREATE TABLE\b",
    r"^INSERT INTO\b",
    r"^UPDATE\b",
    r"^DELETE FROM\b",
    r"^SELECT\b",
    r"^(BEGIN|COMMIT|END|ROLLBACK|SAVEPOINT|RELEASE)\b",
];

const KINDS: [StatementKind; 6] = [
    StatementKind::CreateTable,
    StatementKind::Insert,
    StatementKind::Update,
    StatementKind::Delete,
    StatementKind::Select,
    StatementKind::Transaction,
];

/// Classifies statement text into intents.
pub struct Classifier {
    heads: RegexSet,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            heads: RegexSet::new(HEAD_PATTERNS).unwrap_or_else(|_| RegexSet::empty()),
        }
    }

    /// Classify one statement. Never fails: malformed input is `Unrecognized`.
    pub fn classify(&self, sql: &str) -> StatementIntent {
        let Ok(mut tokens) = tokenize(sql) else {
            return StatementIntent::Unrecognized;
        };
        while tokens.last().is_some_and(|t| t.is_punct(sql, ";")) {
            tokens.pop();
        }
        if tokens.iter().any(|t| t.is_punct(sql, ";")) {
            return StatementIntent::Unrecognized;
        }

        let head = tokens
            .iter()
            .take_while(|t| t.kind == TokenKind::Word)
            .take(HEAD_WORDS)
            .map(|t| t.text(sql).to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(" ");

        let Some(kind) = self.heads.matches(&head).iter().next().map(|i| KINDS[i]) else {
            trace!(head = %head, "no head pattern matched");
            return StatementIntent::Unrecognized;
        };

        let intent = decompose(sql, &tokens, kind);
        if let Some(target) = intent.target() {
            if !target.is_main() {
                return StatementIntent::Unrecognized;
            }
        }
        trace!(kind = intent.kind(), "classified statement");
        intent
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_core::models::TransactionControl;

    #[test]
    fn heads_pick_the_right_family() {
        let classifier = Classifier::new();
        assert_eq!(classifier.classify("select * from t").kind(), "select");
        assert_eq!(classifier.classify("  Insert Into t VALUES (1);").kind(), "insert");
        assert_eq!(classifier.classify("DELETE FROM t;;").kind(), "delete");
        assert_eq!(
            classifier.classify("savepoint a"),
            StatementIntent::Transaction(TransactionControl::Savepoint("a".into()))
        );
    }

    #[test]
    fn everything_else_passes_through() {
        let classifier = Classifier::new();
        for sql in [
            "CREATE TEMP TABLE t (a)",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "DROP TABLE t",
            "PRAGMA table_info(t)",
            "SELECT 1; SELECT 2",
            "SELECT 'unterminated",
            "SELECT * FROM aux.t",
            "",
        ] {
            assert_eq!(classifier.classify(sql), StatementIntent::Unrecognized, "{sql}");
        }
    }
}
