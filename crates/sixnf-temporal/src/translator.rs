//! Period predicate translation.
//!
//! `FOR SYSTEM_TIME` clauses become boundary comparisons on the physical
//! transaction columns; period predicates in WHERE (`valid OVERLAPS PERIOD
//! (a, b)`, `valid CONTAINS ?`, ...) become boundary comparisons rendered by
//! the interval algebra. Instants are canonicalized with `strftime` so text
//! comparison orders them correctly.

use std::ops::Range;

use tracing::debug;

use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{
    physical, BoundSql, CatalogEntry, ParamRef, Params, PeriodDef, PeriodKind, SelectIntent,
    SqlBuilder, SqlFragment, SqlValue, TemporalClause, Timestamp, SYSTEM_TIME,
};
use sixnf_core::traits::ISqlEngine;

use crate::algebra::{Operand, Relation};
use crate::parser::{tokenize, Token, TokenKind};
use crate::views::reconstruction_sql;

/// Which system-time versions a read sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTimeFilter {
    Current,
    AsOf(Timestamp),
    FromTo(Timestamp, Timestamp),
    Between(Timestamp, Timestamp),
}

impl SystemTimeFilter {
    /// Boundary predicate over the given start/end column expressions.
    pub fn predicate(&self, start: &str, end: &str) -> String {
        match self {
            SystemTimeFilter::Current => {
                format!("{end} = {}", Timestamp::Infinity.sql_literal())
            }
            SystemTimeFilter::AsOf(t) => Relation::Contains.render(
                &Operand::Period {
                    start: start.to_string(),
                    end: end.to_string(),
                },
                &Operand::Instant(t.sql_literal()),
            ),
            SystemTimeFilter::FromTo(s, e) => {
                format!("{start} <= {} AND {end} < {}", s.sql_literal(), e.sql_literal())
            }
            SystemTimeFilter::Between(s, e) => {
                format!("{start} <= {} AND {end} <= {}", s.sql_literal(), e.sql_literal())
            }
        }
    }

    /// Whether several versions of one fact may qualify.
    pub fn is_range(&self) -> bool {
        matches!(self, SystemTimeFilter::FromTo(..) | SystemTimeFilter::Between(..))
    }
}

/// Wrap an instant expression so it compares as canonical text.
pub fn canonical_instant(expr: &str) -> String {
    format!("strftime('%Y-%m-%d %H:%M:%f', {expr})")
}

/// Evaluate a caller expression to a timestamp using the engine.
pub fn evaluate_instant(
    engine: &dyn ISqlEngine,
    expr: &SqlFragment,
    params: &Params,
) -> SixnfResult<Timestamp> {
    let mut builder = SqlBuilder::new();
    builder.push_str("SELECT ");
    builder.push_fragment(expr, params)?;
    let bound = builder.finish();
    let rows = engine.query(&bound.sql, &bound.params)?;
    let value = rows.scalar().cloned().unwrap_or(SqlValue::Null);
    Ok(Timestamp::from_value(&value)?)
}

/// Resolve a `FOR SYSTEM_TIME` clause against `entry`.
pub fn system_time_filter(
    engine: &dyn ISqlEngine,
    entry: &CatalogEntry,
    clause: Option<&TemporalClause>,
    params: &Params,
) -> SixnfResult<SystemTimeFilter> {
    let Some(clause) = clause else {
        return Ok(SystemTimeFilter::Current);
    };
    if !entry.is_system_versioned() {
        return Err(TemporalError::UnknownPeriod {
            table: entry.name().to_string(),
            period: SYSTEM_TIME.to_string(),
        }
        .into());
    }
    let instant = |f: &SqlFragment| evaluate_instant(engine, f, params);
    Ok(match clause {
        TemporalClause::AsOf(t) => SystemTimeFilter::AsOf(instant(t)?),
        TemporalClause::FromTo(s, e) => SystemTimeFilter::FromTo(instant(s)?, instant(e)?),
        TemporalClause::Between(s, e) => SystemTimeFilter::Between(instant(s)?, instant(e)?),
    })
}

/// Rewrite a SELECT on a registered table. `None` means the statement can run as written.
pub fn rewrite_select(
    engine: &dyn ISqlEngine,
    entry: &CatalogEntry,
    intent: &SelectIntent,
    params: &Params,
) -> SixnfResult<Option<BoundSql>> {
    let translated = match &intent.predicate {
        Some(predicate) => translate_predicate(entry, predicate)?,
        None => None,
    };
    if intent.temporal.is_none() && translated.is_none() {
        return Ok(None);
    }

    let filter = system_time_filter(engine, entry, intent.temporal.as_ref(), params)?;
    let alias = physical::quote(intent.alias.as_deref().unwrap_or(&intent.table.name));
    let source = match intent.temporal {
        Some(_) => format!("({})", reconstruction_sql(entry, &filter, false)),
        None => physical::quote(entry.name()),
    };

    let mut builder = SqlBuilder::new();
    builder.push_str("SELECT ");
    builder.push_fragment(&intent.projection, params)?;
    builder.push_str(&format!(" FROM {source} AS {alias}"));
    if let Some(predicate) = translated.as_ref().or(intent.predicate.as_ref()) {
        builder.push_str(" WHERE ");
        builder.push_fragment(predicate, params)?;
    }
    if !intent.tail.is_empty() {
        builder.push_str(" ");
        builder.push_fragment(&intent.tail, params)?;
    }

    let bound = builder.finish();
    debug!(table = %entry.name(), ?filter, sql = %bound.sql, "rewrote select");
    Ok(Some(bound))
}

/// One side of a period predicate, as caller SQL.
#[derive(Debug, Clone)]
enum OperandSql {
    Period { start: SqlFragment, end: SqlFragment },
    Instant(SqlFragment),
}

impl OperandSql {
    fn is_period(&self) -> bool {
        matches!(self, OperandSql::Period { .. })
    }
}

/// Marker delimiting operand placeholders inside rendered SQL.
const MARK: char = '\u{1}';

/// A re-tokenized fragment with each token's parameter reference.
struct Scanned<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    params: Vec<Option<ParamRef>>,
}

impl<'a> Scanned<'a> {
    fn new(fragment: &'a SqlFragment) -> SixnfResult<Option<Self>> {
        let Ok(tokens) = tokenize(&fragment.text) else {
            return Ok(None);
        };
        let mut refs = fragment.params.iter();
        let mut params = Vec::with_capacity(tokens.len());
        for token in &tokens {
            params.push(match token.kind {
                TokenKind::Param(_) => Some(refs.next().cloned().ok_or_else(|| {
                    TemporalError::ParameterMismatch(
                        "predicate placeholder without a reference".to_string(),
                    )
                })?),
                _ => None,
            });
        }
        Ok(Some(Self {
            text: &fragment.text,
            tokens,
            params,
        }))
    }

    fn slice(&self, range: Range<usize>) -> SqlFragment {
        let text = &self.text[self.tokens[range.start].span.start..self.tokens[range.end - 1].span.end];
        SqlFragment::new(text, self.params[range].iter().flatten().cloned().collect())
    }

    fn is(&self, i: usize, punct: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_punct(self.text, punct))
    }

    fn is_name(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| {
            matches!(t.kind, TokenKind::Word | TokenKind::QuotedIdent)
                && !STRUCTURAL_WORDS.iter().any(|kw| t.is_keyword(self.text, kw))
        })
    }

    fn is_literal(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| {
            matches!(t.kind, TokenKind::String | TokenKind::Number | TokenKind::Param(_))
        })
    }

    /// Index of the `)` matching the `(` at `open`.
    fn closing(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            if self.is(i, "(") {
                depth += 1;
            } else if self.is(i, ")") {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Index of the `(` matching the `)` at `close`.
    fn opening(&self, close: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in (0..=close).rev() {
            if self.is(i, ")") {
                depth += 1;
            } else if self.is(i, "(") {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    /// `PERIOD ( a , b )` bounds between the parens at `open..=close`.
    fn constructor(&self, open: usize, close: usize) -> Option<OperandSql> {
        let mut depth = 0usize;
        let mut comma = None;
        for i in open + 1..close {
            if self.is(i, "(") {
                depth += 1;
            } else if self.is(i, ")") {
                depth -= 1;
            } else if depth == 0 && self.is(i, ",") {
                if comma.is_some() {
                    return None;
                }
                comma = Some(i);
            }
        }
        let comma = comma?;
        if comma == open + 1 || comma + 1 == close {
            return None;
        }
        Some(OperandSql::Period {
            start: instant(self.slice(open + 1..comma)),
            end: instant(self.slice(comma + 1..close)),
        })
    }

    /// A column or period reference spanning `range` (`name` or `qual.name`).
    fn reference(&self, entry: &CatalogEntry, range: Range<usize>) -> OperandSql {
        let last = &self.tokens[range.end - 1];
        let name = last.ident(self.text).unwrap_or_default();
        match predicate_period(entry, &name) {
            Some(period) => {
                let qualifier = if range.len() == 3 {
                    format!("{}.", self.tokens[range.start].text(self.text))
                } else {
                    String::new()
                };
                OperandSql::Period {
                    start: SqlFragment::literal(format!(
                        "{qualifier}{}",
                        physical::quote(&period.start_column)
                    )),
                    end: SqlFragment::literal(format!(
                        "{qualifier}{}",
                        physical::quote(&period.end_column)
                    )),
                }
            }
            None => OperandSql::Instant(instant(self.slice(range))),
        }
    }

    /// The operand ending just before token `end`; returns its start index.
    fn operand_before(&self, entry: &CatalogEntry, end: usize) -> Option<(usize, OperandSql)> {
        let last = end.checked_sub(1)?;
        if self.is(last, ")") {
            let open = self.opening(last)?;
            if open > 0 && self.tokens[open - 1].is_keyword(self.text, "PERIOD") {
                return Some((open - 1, self.constructor(open, last)?));
            }
            let start = if open > 0 && self.is_name(open - 1) { open - 1 } else { open };
            return Some((start, OperandSql::Instant(instant(self.slice(start..end)))));
        }
        if self.is_literal(last) {
            let start = if last > 0 && (self.is(last - 1, "-") || self.is(last - 1, "+"))
                && (last < 2 || !self.is_operand_end(last - 2))
            {
                last - 1
            } else {
                last
            };
            return Some((start, OperandSql::Instant(instant(self.slice(start..end)))));
        }
        if self.is_name(last) {
            let start = if last >= 2 && self.is(last - 1, ".") && self.is_name(last - 2) {
                last - 2
            } else {
                last
            };
            return Some((start, self.reference(entry, start..end)));
        }
        None
    }

    fn is_operand_end(&self, i: usize) -> bool {
        self.is(i, ")") || self.is_literal(i) || self.is_name(i)
    }

    /// The operand starting at token `start`; returns its end index (exclusive).
    fn operand_after(&self, entry: &CatalogEntry, start: usize) -> Option<(usize, OperandSql)> {
        if self.tokens.get(start)?.is_keyword(self.text, "PERIOD") && self.is(start + 1, "(") {
            let close = self.closing(start + 1)?;
            return Some((close + 1, self.constructor(start + 1, close)?));
        }
        if self.is(start, "(") || (self.is_name(start) && self.is(start + 1, "(")) {
            let open = if self.is(start, "(") { start } else { start + 1 };
            let end = self.closing(open)? + 1;
            return Some((end, OperandSql::Instant(instant(self.slice(start..end)))));
        }
        if (self.is(start, "-") || self.is(start, "+")) && self.is_literal(start + 1) {
            return Some((start + 2, OperandSql::Instant(instant(self.slice(start..start + 2)))));
        }
        if self.is_literal(start) {
            return Some((start + 1, OperandSql::Instant(instant(self.slice(start..start + 1)))));
        }
        if self.is_name(start) {
            let end = if self.is(start + 1, ".") && self.is_name(start + 2) {
                start + 3
            } else {
                start + 1
            };
            return Some((end, self.reference(entry, start..end)));
        }
        None
    }

    fn relation_at(&self, i: usize) -> Option<(Relation, usize)> {
        let token = &self.tokens[i];
        if token.kind != TokenKind::Word {
            return None;
        }
        let next = self
            .tokens
            .get(i + 1)
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text(self.text));
        Relation::from_keywords(token.text(self.text), next)
    }
}

/// Keywords that never name an operand.
const STRUCTURAL_WORDS: [&str; 21] = [
    "AND", "OR", "NOT", "WHERE", "SELECT", "FROM", "IS", "IN", "LIKE", "BETWEEN", "CASE", "WHEN",
    "THEN", "ELSE", "END", "EQUALS", "CONTAINS", "OVERLAPS", "PRECEDES", "SUCCEEDS", "IMMEDIATELY",
];

fn instant(expr: SqlFragment) -> SqlFragment {
    SqlFragment::new(canonical_instant(&expr.text), expr.params)
}

/// Periods usable by name in predicates: application periods, and the system
/// period when both of its columns are declared.
fn predicate_period<'e>(entry: &'e CatalogEntry, name: &str) -> Option<&'e PeriodDef> {
    let period = entry.table.period(name)?;
    match period.kind {
        PeriodKind::Application => Some(period),
        PeriodKind::System => (entry.table.column(&period.start_column).is_some()
            && entry.table.column(&period.end_column).is_some())
        .then_some(period),
    }
}

/// Render one relation with operand placeholders spliced back in.
fn render(relation: Relation, a: OperandSql, b: OperandSql) -> SqlFragment {
    let mut parts: Vec<SqlFragment> = Vec::new();
    let mut placeholder = |fragment: SqlFragment| {
        parts.push(fragment);
        format!("{MARK}{}{MARK}", parts.len() - 1)
    };
    let mut to_operand = |side: OperandSql| match side {
        OperandSql::Period { start, end } => Operand::Period {
            start: placeholder(start),
            end: placeholder(end),
        },
        OperandSql::Instant(expr) => Operand::Instant(placeholder(expr)),
    };
    let a = to_operand(a);
    let b = to_operand(b);
    let rendered = relation.render(&a, &b);

    let mut out = SqlFragment::default();
    for (n, piece) in rendered.split(MARK).enumerate() {
        if n % 2 == 0 {
            out.text.push_str(piece);
        } else if let Some(part) = piece.parse::<usize>().ok().and_then(|i| parts.get(i)) {
            out.text.push_str(&part.text);
            out.params.extend(part.params.iter().cloned());
        }
    }
    out
}

/// Rewrite period predicates inside `predicate`. `None` when there are none.
pub fn translate_predicate(
    entry: &CatalogEntry,
    predicate: &SqlFragment,
) -> SixnfResult<Option<SqlFragment>> {
    let Some(scanned) = Scanned::new(predicate)? else {
        return Ok(None);
    };

    let mut replacements: Vec<(Range<usize>, SqlFragment)> = Vec::new();
    let mut floor = 0usize;
    let mut i = 0usize;
    while i < scanned.tokens.len() {
        let Some((relation, width)) = scanned.relation_at(i) else {
            i += 1;
            continue;
        };
        let left = scanned.operand_before(entry, i);
        let right = scanned.operand_after(entry, i + width);
        match (left, right) {
            (Some((start, a)), Some((end, b)))
                if start >= floor && (a.is_period() || b.is_period()) =>
            {
                replacements.push((start..end, render(relation, a, b)));
                floor = end;
                i = end;
            }
            _ => i += 1,
        }
    }

    if replacements.is_empty() {
        return Ok(None);
    }

    let mut out = SqlFragment::default();
    let mut byte = 0usize;
    let mut token = 0usize;
    for (range, replacement) in replacements {
        out.text
            .push_str(&scanned.text[byte..scanned.tokens[range.start].span.start]);
        out.params
            .extend(scanned.params[token..range.start].iter().flatten().cloned());
        out.text.push_str(&replacement.text);
        out.params.extend(replacement.params);
        byte = scanned.tokens[range.end - 1].span.end;
        token = range.end;
    }
    out.text.push_str(&scanned.text[byte..]);
    out.params
        .extend(scanned.params[token..].iter().flatten().cloned());
    Ok(Some(out))
}
