//! Structured statement intents produced by the classifier.

use super::{ColumnDef, ForeignKeyDef, KeyDef, LogicalTable, PeriodDef, SqlFragment};
use crate::errors::TemporalError;

/// A possibly schema-qualified object name, unquoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub schema: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Only the main database is rewritten.
    pub fn is_main(&self) -> bool {
        self.schema
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("main"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableIntent {
    pub name: ObjectName,
    pub columns: Vec<ColumnDef>,
    pub periods: Vec<PeriodDef>,
    pub primary_key: Option<KeyDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Table constraints kept as text (CHECK, UNIQUE); recorded but not enforced.
    pub constraints: Vec<String>,
    pub system_versioned: bool,
    pub if_not_exists: bool,
}

impl CreateTableIntent {
    /// Whether the statement declares any temporal feature at all.
    pub fn is_temporal(&self) -> bool {
        self.system_versioned || !self.periods.is_empty()
    }

    pub fn to_logical_table(&self) -> Result<LogicalTable, TemporalError> {
        LogicalTable {
            name: self.name.name.clone(),
            columns: self.columns.clone(),
            periods: self.periods.clone(),
            primary_key: self.primary_key.clone(),
            foreign_keys: self.foreign_keys.clone(),
            system_versioned: self.system_versioned,
        }
        .finalize()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<SqlFragment>>),
    Select(SqlFragment),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertIntent {
    pub table: ObjectName,
    pub columns: Option<Vec<String>>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: SqlFragment,
}

/// `FOR PORTION OF period FROM a TO b`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortionClause {
    pub period: String,
    pub from: SqlFragment,
    pub to: SqlFragment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateIntent {
    pub table: ObjectName,
    pub portion: Option<PortionClause>,
    pub assignments: Vec<Assignment>,
    pub predicate: Option<SqlFragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteIntent {
    pub table: ObjectName,
    pub portion: Option<PortionClause>,
    pub predicate: Option<SqlFragment>,
}

/// `FOR SYSTEM_TIME ...` on a table reference.
#[derive(Debug, Clone, PartialEq)]
pub enum TemporalClause {
    AsOf(SqlFragment),
    FromTo(SqlFragment, SqlFragment),
    Between(SqlFragment, SqlFragment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectIntent {
    pub table: ObjectName,
    pub alias: Option<String>,
    /// Everything between `SELECT` and `FROM`, including `DISTINCT`.
    pub projection: SqlFragment,
    pub temporal: Option<TemporalClause>,
    pub predicate: Option<SqlFragment>,
    /// `GROUP BY`, `ORDER BY`, `LIMIT`, ... as written.
    pub tail: SqlFragment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionControl {
    Begin,
    Commit,
    Rollback,
    Savepoint(String),
    Release(String),
    RollbackTo(String),
}

/// What a statement asks for, as far as the rewriter is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementIntent {
    CreateTable(CreateTableIntent),
    Insert(InsertIntent),
    Update(UpdateIntent),
    Delete(DeleteIntent),
    Select(SelectIntent),
    Transaction(TransactionControl),
    /// Passed to the engine untouched.
    Unrecognized,
}

impl StatementIntent {
    /// The logical table the statement targets, if any.
    pub fn target(&self) -> Option<&ObjectName> {
        match self {
            StatementIntent::CreateTable(i) => Some(&i.name),
            StatementIntent::Insert(i) => Some(&i.table),
            StatementIntent::Update(i) => Some(&i.table),
            StatementIntent::Delete(i) => Some(&i.table),
            StatementIntent::Select(i) => Some(&i.table),
            StatementIntent::Transaction(_) | StatementIntent::Unrecognized => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StatementIntent::CreateTable(_) => "create_table",
            StatementIntent::Insert(_) => "insert",
            StatementIntent::Update(_) => "update",
            StatementIntent::Delete(_) => "delete",
            StatementIntent::Select(_) => "select",
            StatementIntent::Transaction(_) => "transaction",
            StatementIntent::Unrecognized => "unrecognized",
        }
    }
}
