//! Structural decomposition of classified statements into intents.
//!
//! Each decomposer returns `None` for anything outside the supported shape;
//! the caller turns that into `StatementIntent::Unrecognized` so the engine
//! sees the original text.

use sixnf_core::models::{
    Assignment, ColumnDef, CreateTableIntent, DeleteIntent, ForeignKeyDef, InsertIntent,
    InsertSource, KeyDef, PeriodDef, PeriodKind, PortionClause, RowBoundary, SelectIntent,
    SqlFragment, StatementIntent, TemporalClause, TransactionControl, UpdateIntent, SYSTEM_TIME,
};

use super::{fragment, has_top_level_keyword, Cursor, Token, TokenKind};

/// Statement families recognized by the keyword head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    Insert,
    Update,
    Delete,
    Select,
    Transaction,
}

pub fn decompose(sql: &str, tokens: &[Token], kind: StatementKind) -> StatementIntent {
    let intent = match kind {
        StatementKind::CreateTable => create_table(sql, tokens).map(StatementIntent::CreateTable),
        StatementKind::Insert => insert(sql, tokens).map(StatementIntent::Insert),
        StatementKind::Update => update(sql, tokens).map(StatementIntent::Update),
        StatementKind::Delete => delete(sql, tokens).map(StatementIntent::Delete),
        StatementKind::Select => select(sql, tokens).map(StatementIntent::Select),
        StatementKind::Transaction => transaction(sql, tokens).map(StatementIntent::Transaction),
    };
    intent.unwrap_or(StatementIntent::Unrecognized)
}

const COLUMN_CONSTRAINTS: [&str; 11] = [
    "CONSTRAINT", "PRIMARY", "NOT", "NULL", "UNIQUE", "CHECK", "DEFAULT", "COLLATE",
    "REFERENCES", "GENERATED", "AS",
];

const SELECT_CLAUSES: [&str; 4] = ["GROUP", "ORDER", "LIMIT", "WINDOW"];

/// Words that end a table reference in a FROM clause.
const NOT_AN_ALIAS: [&str; 21] = [
    "WHERE", "GROUP", "ORDER", "LIMIT", "WINDOW", "HAVING", "FOR", "JOIN", "INNER", "LEFT",
    "RIGHT", "FULL", "CROSS", "NATURAL", "OUTER", "ON", "USING", "INDEXED", "NOT", "UNION",
    "EXCEPT",
];

const JOINS: [&str; 8] = ["JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "OUTER"];

fn create_table(sql: &str, tokens: &[Token]) -> Option<CreateTableIntent> {
    let mut c = Cursor::new(sql, tokens);
    c.expect_keyword("CREATE")?;
    c.expect_keyword("TABLE")?;
    let if_not_exists = c.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = c.object_name()?;

    let mut intent = CreateTableIntent {
        name,
        columns: Vec::new(),
        periods: Vec::new(),
        primary_key: None,
        foreign_keys: Vec::new(),
        constraints: Vec::new(),
        system_versioned: false,
        if_not_exists,
    };

    c.expect_punct("(")?;
    loop {
        let element = c.take_until(|t, sql| t.is_punct(sql, ","))?;
        table_element(sql, element, &mut intent)?;
        if !c.eat_punct(",") {
            break;
        }
    }
    c.expect_punct(")")?;

    while !c.at_end() {
        if c.eat_keywords(&["WITH", "SYSTEM", "VERSIONING"]) {
            intent.system_versioned = true;
        } else if !(c.eat_keywords(&["WITHOUT", "ROWID"]) || c.eat_keyword("STRICT")) {
            return None;
        }
        c.eat_punct(",");
    }
    Some(intent)
}

fn table_element(sql: &str, tokens: &[Token], intent: &mut CreateTableIntent) -> Option<()> {
    let mut c = Cursor::new(sql, tokens);
    if c.eat_keyword("CONSTRAINT") {
        c.ident()?;
    }

    if c.eat_keywords(&["PERIOD", "FOR"]) {
        let name = c.ident()?;
        c.expect_punct("(")?;
        let start_column = c.ident()?;
        c.expect_punct(",")?;
        let end_column = c.ident()?;
        c.expect_punct(")")?;
        let kind = if name.eq_ignore_ascii_case(SYSTEM_TIME) {
            PeriodKind::System
        } else {
            PeriodKind::Application
        };
        let name = if kind == PeriodKind::System {
            SYSTEM_TIME.to_string()
        } else {
            name
        };
        intent.periods.push(PeriodDef {
            name,
            start_column,
            end_column,
            kind,
        });
    } else if c.eat_keywords(&["PRIMARY", "KEY"]) {
        if intent.primary_key.is_some() || intent.columns.iter().any(|c| c.primary_key) {
            return None;
        }
        c.expect_punct("(")?;
        let mut columns = Vec::new();
        let mut period = None;
        loop {
            let name = c.ident()?;
            if c.eat_keywords(&["WITHOUT", "OVERLAPS"]) {
                period = Some(name);
            } else {
                let _ = c.eat_keyword("ASC") || c.eat_keyword("DESC");
                columns.push(name);
            }
            if !c.eat_punct(",") {
                break;
            }
        }
        c.expect_punct(")")?;
        conflict_clause(&mut c)?;
        intent.primary_key = Some(KeyDef { columns, period });
    } else if c.eat_keywords(&["FOREIGN", "KEY"]) {
        let (columns, period) = key_with_period(&mut c)?;
        c.expect_keyword("REFERENCES")?;
        let referenced_table = c.ident()?;
        let (referenced_columns, referenced_period) = if c.at_punct("(") {
            key_with_period(&mut c)?
        } else {
            (Vec::new(), None)
        };
        skip_foreign_key_actions(&mut c)?;
        intent.foreign_keys.push(ForeignKeyDef {
            columns,
            period,
            referenced_table,
            referenced_columns,
            referenced_period,
        });
    } else if c.at_keyword("UNIQUE") || c.at_keyword("CHECK") {
        intent.constraints.push(fragment(sql, c.rest()).text);
    } else {
        column_def(&mut c, intent)?;
    }

    c.at_end().then_some(())
}

/// `( col [, col]* [, PERIOD p] )`
fn key_with_period(c: &mut Cursor<'_>) -> Option<(Vec<String>, Option<String>)> {
    c.expect_punct("(")?;
    let mut columns = Vec::new();
    let mut period = None;
    loop {
        if c.eat_keyword("PERIOD") {
            period = Some(c.ident()?);
        } else {
            columns.push(c.ident()?);
        }
        if !c.eat_punct(",") {
            break;
        }
    }
    c.expect_punct(")")?;
    Some((columns, period))
}

fn skip_foreign_key_actions(c: &mut Cursor<'_>) -> Option<()> {
    loop {
        if c.eat_keyword("ON") {
            c.next()?;
            if c.eat_keyword("SET") || c.eat_keyword("NO") {
                c.next()?;
            } else {
                c.next()?;
            }
        } else if c.eat_keyword("MATCH") {
            c.ident()?;
        } else if c.eat_keywords(&["NOT", "DEFERRABLE"]) || c.eat_keyword("DEFERRABLE") {
            if c.eat_keyword("INITIALLY") {
                c.next()?;
            }
        } else {
            return Some(());
        }
    }
}

fn conflict_clause(c: &mut Cursor<'_>) -> Option<()> {
    if c.eat_keywords(&["ON", "CONFLICT"]) {
        c.ident()?;
    }
    Some(())
}

fn column_def(c: &mut Cursor<'_>, intent: &mut CreateTableIntent) -> Option<()> {
    let sql = c.sql;
    let name = c.ident()?;
    let type_tokens =
        c.take_until(|t, sql| COLUMN_CONSTRAINTS.iter().any(|kw| t.is_keyword(sql, kw)))?;
    let mut column = ColumnDef::new(name.clone(), fragment(sql, type_tokens).text);

    while !c.at_end() {
        if c.eat_keyword("CONSTRAINT") {
            c.ident()?;
        } else if c.eat_keywords(&["PRIMARY", "KEY"]) {
            column.primary_key = true;
            let _ = c.eat_keyword("ASC") || c.eat_keyword("DESC");
            conflict_clause(c)?;
            c.eat_keyword("AUTOINCREMENT");
        } else if c.eat_keywords(&["NOT", "NULL"]) {
            column.not_null = true;
            conflict_clause(c)?;
        } else if c.eat_keyword("NULL") {
            conflict_clause(c)?;
        } else if c.eat_keyword("UNIQUE") {
            conflict_clause(c)?;
            intent.constraints.push(format!("UNIQUE ({name})"));
        } else if c.at_keyword("CHECK") {
            let start = c.pos;
            c.next()?;
            paren_group(c)?;
            intent
                .constraints
                .push(fragment(sql, &c.tokens[start..c.pos]).text);
        } else if c.eat_keyword("DEFAULT") {
            let default = default_expr(c)?;
            if !default.params.is_empty() {
                return None;
            }
            column.default_sql = Some(default.text);
        } else if c.eat_keyword("COLLATE") {
            c.ident()?;
        } else if c.eat_keyword("REFERENCES") {
            let referenced_table = c.ident()?;
            let referenced_columns = if c.at_punct("(") {
                c.ident_list()?
            } else {
                Vec::new()
            };
            skip_foreign_key_actions(c)?;
            intent.foreign_keys.push(ForeignKeyDef {
                columns: vec![name.clone()],
                period: None,
                referenced_table,
                referenced_columns,
                referenced_period: None,
            });
        } else if c.eat_keywords(&["GENERATED", "ALWAYS", "AS", "ROW"]) {
            column.generated = Some(if c.eat_keyword("START") {
                RowBoundary::Start
            } else {
                c.expect_keyword("END")?;
                RowBoundary::End
            });
        } else {
            // Computed columns and anything unknown.
            return None;
        }
    }

    intent.columns.push(column);
    Some(())
}

/// Consume a parenthesized group, returning its tokens including the parens.
fn paren_group<'a>(c: &mut Cursor<'a>) -> Option<&'a [Token]> {
    let start = c.pos;
    c.expect_punct("(")?;
    c.take_until(|_, _| false)?;
    c.expect_punct(")")?;
    Some(&c.tokens[start..c.pos])
}

fn default_expr(c: &mut Cursor<'_>) -> Option<SqlFragment> {
    let start = c.pos;
    if c.at_punct("(") {
        paren_group(c)?;
    } else {
        if c.at_punct("-") || c.at_punct("+") {
            c.next()?;
        }
        c.next()?;
    }
    Some(c.fragment(&c.tokens[start..c.pos]))
}

fn insert(sql: &str, tokens: &[Token]) -> Option<InsertIntent> {
    let mut c = Cursor::new(sql, tokens);
    c.expect_keyword("INSERT")?;
    c.expect_keyword("INTO")?;
    let table = c.object_name()?;
    let columns = if c.at_punct("(") {
        Some(c.ident_list()?)
    } else {
        None
    };

    let source = if c.eat_keywords(&["DEFAULT", "VALUES"]) {
        InsertSource::DefaultValues
    } else if c.eat_keyword("VALUES") {
        let mut rows = Vec::new();
        loop {
            c.expect_punct("(")?;
            let mut row = Vec::new();
            loop {
                let expr = c.take_until(|t, sql| t.is_punct(sql, ","))?;
                if expr.is_empty() {
                    return None;
                }
                row.push(c.fragment(expr));
                if !c.eat_punct(",") {
                    break;
                }
            }
            c.expect_punct(")")?;
            rows.push(row);
            if !c.eat_punct(",") {
                break;
            }
        }
        InsertSource::Values(rows)
    } else if c.at_keyword("SELECT") || c.at_keyword("WITH") {
        let rest = c.rest();
        if has_top_level_keyword(sql, rest, &["RETURNING"]) || has_upsert(sql, rest) {
            return None;
        }
        InsertSource::Select(c.fragment(rest))
    } else {
        return None;
    };

    c.at_end().then_some(InsertIntent {
        table,
        columns,
        source,
    })
}

fn has_upsert(sql: &str, tokens: &[Token]) -> bool {
    tokens
        .windows(2)
        .any(|w| w[0].is_keyword(sql, "ON") && w[1].is_keyword(sql, "CONFLICT"))
}

fn update(sql: &str, tokens: &[Token]) -> Option<UpdateIntent> {
    let mut c = Cursor::new(sql, tokens);
    c.expect_keyword("UPDATE")?;
    let table = c.object_name()?;
    let portion = portion_clause(&mut c, &["SET"])?;
    c.expect_keyword("SET")?;

    let mut assignments = Vec::new();
    loop {
        let column = c.ident()?;
        c.expect_punct("=")?;
        let expr = c.take_until(|t, sql| {
            t.is_punct(sql, ",")
                || ["FROM", "WHERE", "RETURNING", "ORDER", "LIMIT"]
                    .iter()
                    .any(|kw| t.is_keyword(sql, kw))
        })?;
        if expr.is_empty() {
            return None;
        }
        assignments.push(Assignment {
            column,
            value: c.fragment(expr),
        });
        if !c.eat_punct(",") {
            break;
        }
    }

    let predicate = where_clause(&mut c)?;
    c.at_end().then_some(UpdateIntent {
        table,
        portion,
        assignments,
        predicate,
    })
}

fn delete(sql: &str, tokens: &[Token]) -> Option<DeleteIntent> {
    let mut c = Cursor::new(sql, tokens);
    c.expect_keyword("DELETE")?;
    c.expect_keyword("FROM")?;
    let table = c.object_name()?;
    let portion = portion_clause(&mut c, &["WHERE", "RETURNING", "ORDER", "LIMIT"])?;
    let predicate = where_clause(&mut c)?;
    c.at_end().then_some(DeleteIntent {
        table,
        portion,
        predicate,
    })
}

/// `[WHERE expr]`, stopping before clauses that are not supported.
fn where_clause(c: &mut Cursor<'_>) -> Option<Option<SqlFragment>> {
    if !c.eat_keyword("WHERE") {
        return Some(None);
    }
    let expr = c.take_until_keywords(&["RETURNING", "ORDER", "LIMIT"])?;
    if expr.is_empty() {
        return None;
    }
    Some(Some(c.fragment(expr)))
}

/// `[FOR PORTION OF period FROM expr TO expr]`; the TO expression ends at `stops`.
fn portion_clause(c: &mut Cursor<'_>, stops: &[&str]) -> Option<Option<PortionClause>> {
    if !c.eat_keywords(&["FOR", "PORTION", "OF"]) {
        return Some(None);
    }
    let period = c.ident()?;
    c.expect_keyword("FROM")?;
    let from = c.take_until_keywords(&["TO"])?;
    c.expect_keyword("TO")?;
    let to = c.take_until_keywords(stops)?;
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some(Some(PortionClause {
        period,
        from: c.fragment(from),
        to: c.fragment(to),
    }))
}

fn select(sql: &str, tokens: &[Token]) -> Option<SelectIntent> {
    if has_top_level_keyword(sql, tokens, &["UNION", "INTERSECT", "EXCEPT"]) {
        return None;
    }
    let mut c = Cursor::new(sql, tokens);
    c.expect_keyword("SELECT")?;
    let projection = c.take_until_keywords(&["FROM"])?;
    if projection.is_empty() {
        return None;
    }
    let projection = c.fragment(projection);
    c.expect_keyword("FROM")?;
    if c.at_punct("(") {
        return None;
    }
    let table = c.object_name()?;

    let mut temporal = system_time_clause(&mut c)?;
    let alias = if c.eat_keyword("AS") {
        Some(c.ident()?)
    } else {
        match c.peek() {
            Some(t)
                if matches!(t.kind, TokenKind::Word | TokenKind::QuotedIdent)
                    && !NOT_AN_ALIAS.iter().any(|kw| t.is_keyword(sql, kw)) =>
            {
                c.ident()
            }
            _ => None,
        }
    };
    if temporal.is_none() {
        temporal = system_time_clause(&mut c)?;
    }

    if c.at_punct(",") || JOINS.iter().any(|kw| c.at_keyword(kw)) {
        return None;
    }

    let predicate = if c.eat_keyword("WHERE") {
        let expr = c.take_until_keywords(&SELECT_CLAUSES)?;
        if expr.is_empty() {
            return None;
        }
        Some(c.fragment(expr))
    } else {
        None
    };

    if !c.at_end() && !SELECT_CLAUSES.iter().any(|kw| c.at_keyword(kw)) {
        return None;
    }
    let rest = c.rest();
    let tail = c.fragment(rest);

    Some(SelectIntent {
        table,
        alias,
        projection,
        temporal,
        predicate,
        tail,
    })
}

fn system_time_clause(c: &mut Cursor<'_>) -> Option<Option<TemporalClause>> {
    if !c.eat_keywords(&["FOR", "SYSTEM_TIME"]) {
        return Some(None);
    }
    let end_of_value = |t: &Token, sql: &str| {
        t.is_punct(sql, ",")
            || ["WHERE", "GROUP", "ORDER", "LIMIT", "WINDOW", "AS"]
                .iter()
                .chain(JOINS.iter())
                .any(|kw| t.is_keyword(sql, kw))
    };

    let clause = if c.eat_keywords(&["AS", "OF"]) {
        let at = c.take_until(end_of_value)?;
        non_empty(at)?;
        TemporalClause::AsOf(c.fragment(at))
    } else if c.eat_keyword("FROM") {
        let from = c.take_until_keywords(&["TO"])?;
        c.expect_keyword("TO")?;
        let to = c.take_until(end_of_value)?;
        non_empty(from)?;
        non_empty(to)?;
        TemporalClause::FromTo(c.fragment(from), c.fragment(to))
    } else if c.eat_keyword("BETWEEN") {
        let _ = c.eat_keyword("ASYMMETRIC") || c.eat_keyword("SYMMETRIC");
        let from = c.take_until_keywords(&["AND"])?;
        c.expect_keyword("AND")?;
        let to = c.take_until(end_of_value)?;
        non_empty(from)?;
        non_empty(to)?;
        TemporalClause::Between(c.fragment(from), c.fragment(to))
    } else {
        return None;
    };
    Some(Some(clause))
}

fn non_empty(tokens: &[Token]) -> Option<()> {
    (!tokens.is_empty()).then_some(())
}

fn transaction(sql: &str, tokens: &[Token]) -> Option<TransactionControl> {
    let mut c = Cursor::new(sql, tokens);
    let control = if c.eat_keyword("BEGIN") {
        let _ = c.eat_keyword("DEFERRED") || c.eat_keyword("IMMEDIATE") || c.eat_keyword("EXCLUSIVE");
        c.eat_keyword("TRANSACTION");
        TransactionControl::Begin
    } else if c.eat_keyword("COMMIT") || c.eat_keyword("END") {
        c.eat_keyword("TRANSACTION");
        TransactionControl::Commit
    } else if c.eat_keyword("ROLLBACK") {
        c.eat_keyword("TRANSACTION");
        if c.eat_keyword("TO") {
            c.eat_keyword("SAVEPOINT");
            TransactionControl::RollbackTo(c.ident()?)
        } else {
            TransactionControl::Rollback
        }
    } else if c.eat_keyword("SAVEPOINT") {
        TransactionControl::Savepoint(c.ident()?)
    } else if c.eat_keyword("RELEASE") {
        c.eat_keyword("SAVEPOINT");
        TransactionControl::Release(c.ident()?)
    } else {
        return None;
    };
    c.at_end().then_some(control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;
    use sixnf_core::models::ParamRef;

    fn run(sql: &str, kind: StatementKind) -> StatementIntent {
        decompose(sql, &tokenize(sql).unwrap(), kind)
    }

    #[test]
    fn create_table_with_periods_and_keys() {
        let sql = "CREATE TABLE IF NOT EXISTS emp (
            id INTEGER,
            dept INTEGER REFERENCES depts (id),
            salary DECIMAL(10, 2) NOT NULL DEFAULT 0,
            vs TEXT, ve TEXT,
            sys_start TEXT GENERATED ALWAYS AS ROW START,
            sys_end TEXT GENERATED ALWAYS AS ROW END,
            PERIOD FOR valid (vs, ve),
            PERIOD FOR system_time (sys_start, sys_end),
            PRIMARY KEY (id, valid WITHOUT OVERLAPS),
            FOREIGN KEY (dept, PERIOD valid) REFERENCES depts (id, PERIOD valid)
        ) WITH SYSTEM VERSIONING";
        let StatementIntent::CreateTable(t) = run(sql, StatementKind::CreateTable) else {
            panic!("not a create table");
        };
        assert!(t.if_not_exists && t.system_versioned);
        assert_eq!(t.columns.len(), 7);
        assert_eq!(t.columns[2].declared_type, "DECIMAL(10, 2)");
        assert_eq!(t.columns[2].default_sql.as_deref(), Some("0"));
        assert!(t.columns[2].not_null);
        assert_eq!(t.columns[5].generated, Some(RowBoundary::Start));
        assert_eq!(t.periods[1].name, SYSTEM_TIME);
        assert_eq!(t.periods[1].kind, PeriodKind::System);
        let pk = t.primary_key.unwrap();
        assert_eq!(pk.columns, vec!["id"]);
        assert_eq!(pk.period.as_deref(), Some("valid"));
        assert_eq!(t.foreign_keys.len(), 2);
        assert_eq!(t.foreign_keys[1].referenced_period.as_deref(), Some("valid"));
    }

    #[test]
    fn computed_columns_are_unrecognized() {
        let sql = "CREATE TABLE t (a INT, b INT GENERATED ALWAYS AS (a * 2), PERIOD FOR p (a, b))";
        assert_eq!(run(sql, StatementKind::CreateTable), StatementIntent::Unrecognized);
    }

    #[test]
    fn insert_values_keeps_parameters_per_expression() {
        let sql = "INSERT INTO main.\"Emp\" (id, name) VALUES (?, upper(?)), (?3, 'x')";
        let StatementIntent::Insert(i) = run(sql, StatementKind::Insert) else {
            panic!("not an insert");
        };
        assert_eq!(i.table.name, "Emp");
        assert!(i.table.is_main());
        let InsertSource::Values(rows) = i.source else {
            panic!("not values");
        };
        assert_eq!(rows[0][1].text, "upper(?)");
        assert_eq!(rows[0][1].params, vec![ParamRef::Positional(1)]);
        assert_eq!(rows[1][0].params, vec![ParamRef::Positional(2)]);
    }

    #[test]
    fn unsupported_writes_are_unrecognized() {
        for sql in [
            "INSERT OR REPLACE INTO t VALUES (1)",
            "INSERT INTO t VALUES (1) ON CONFLICT DO NOTHING",
            "INSERT INTO t VALUES (1) RETURNING id",
            "INSERT INTO t SELECT * FROM s ON CONFLICT (id) DO NOTHING",
        ] {
            assert_eq!(run(sql, StatementKind::Insert), StatementIntent::Unrecognized, "{sql}");
        }
        assert_eq!(
            run("UPDATE t SET (a, b) = (1, 2)", StatementKind::Update),
            StatementIntent::Unrecognized
        );
        assert_eq!(
            run("DELETE FROM t WHERE a = 1 RETURNING *", StatementKind::Delete),
            StatementIntent::Unrecognized
        );
    }

    #[test]
    fn update_with_portion() {
        let sql = "UPDATE emp FOR PORTION OF valid FROM '2021-01-01' TO date(?) \
                   SET name = 'B', salary = salary * 2 WHERE id = :id";
        let StatementIntent::Update(u) = run(sql, StatementKind::Update) else {
            panic!("not an update");
        };
        let portion = u.portion.unwrap();
        assert_eq!(portion.period, "valid");
        assert_eq!(portion.from.text, "'2021-01-01'");
        assert_eq!(portion.to.text, "date(?)");
        assert_eq!(u.assignments[1].value.text, "salary * 2");
        assert_eq!(u.predicate.unwrap().params, vec![ParamRef::Named(":id".into())]);
    }

    #[test]
    fn delete_with_portion_and_no_predicate() {
        let sql = "delete from emp for portion of valid from '2020-01-01' to '2030-01-01'";
        let StatementIntent::Delete(d) = run(sql, StatementKind::Delete) else {
            panic!("not a delete");
        };
        assert!(d.predicate.is_none());
        assert_eq!(d.portion.unwrap().to.text, "'2030-01-01'");
    }

    #[test]
    fn select_with_system_time() {
        let sql = "SELECT DISTINCT name FROM emp FOR SYSTEM_TIME BETWEEN ? AND ? AS e \
                   WHERE e.id = 1 ORDER BY name LIMIT 3";
        let StatementIntent::Select(s) = run(sql, StatementKind::Select) else {
            panic!("not a select");
        };
        assert_eq!(s.alias.as_deref(), Some("e"));
        assert_eq!(s.projection.text, "DISTINCT name");
        assert!(matches!(s.temporal, Some(TemporalClause::Between(_, _))));
        assert_eq!(s.predicate.unwrap().text, "e.id = 1");
        assert_eq!(s.tail.text, "ORDER BY name LIMIT 3");
    }

    #[test]
    fn joins_and_compounds_are_unrecognized() {
        for sql in [
            "SELECT * FROM a FOR SYSTEM_TIME AS OF '2020-01-01' JOIN b ON a.id = b.id",
            "SELECT * FROM a, b",
            "SELECT 1 FROM a UNION SELECT 2 FROM b",
            "SELECT * FROM (SELECT 1)",
        ] {
            assert_eq!(run(sql, StatementKind::Select), StatementIntent::Unrecognized, "{sql}");
        }
    }

    #[test]
    fn transaction_control() {
        assert_eq!(
            run("BEGIN IMMEDIATE TRANSACTION", StatementKind::Transaction),
            StatementIntent::Transaction(TransactionControl::Begin)
        );
        assert_eq!(
            run("rollback transaction to savepoint \"sp 1\"", StatementKind::Transaction),
            StatementIntent::Transaction(TransactionControl::RollbackTo("sp 1".into()))
        );
        assert_eq!(
            run("END", StatementKind::Transaction),
            StatementIntent::Transaction(TransactionControl::Commit)
        );
    }
}
