//! `ISqlEngine`: the storage engine seam.
//!
//! Everything the rewriter needs from the embedded engine: statement
//! execution, transaction boundaries, the engine's clock and schema
//! introspection. Implemented by `sixnf-storage::SqliteEngine`.

use std::sync::Arc;

use crate::errors::SixnfResult;
use crate::models::{ExecOutcome, Params, ResultSet, Timestamp};

/// One column of a plain table, as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_sql: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key_position: u32,
}

pub trait ISqlEngine: Send + Sync {
    /// Execute one statement. Returns rows if the statement produces columns.
    fn execute(&self, sql: &str, params: &Params) -> SixnfResult<ExecOutcome>;

    /// Run one statement and collect its rows.
    fn query(&self, sql: &str, params: &Params) -> SixnfResult<ResultSet>;

    /// Run several parameterless statements.
    fn execute_batch(&self, sql: &str) -> SixnfResult<()>;

    fn begin(&self) -> SixnfResult<()>;
    fn commit(&self) -> SixnfResult<()>;
    fn rollback(&self) -> SixnfResult<()>;
    fn savepoint(&self, name: &str) -> SixnfResult<()>;
    fn release(&self, name: &str) -> SixnfResult<()>;
    fn rollback_to(&self, name: &str) -> SixnfResult<()>;

    /// True when no transaction is open on the connection.
    fn is_autocommit(&self) -> SixnfResult<bool>;

    /// The engine's current time at millisecond precision.
    fn now(&self) -> SixnfResult<Timestamp>;

    /// Columns of a plain table, empty when the table does not exist.
    fn table_columns(&self, table: &str) -> SixnfResult<Vec<ColumnInfo>>;

    /// Names of ordinary user tables, excluding SQLite and reserved objects.
    fn list_user_tables(&self) -> SixnfResult<Vec<String>>;

    /// Whether any table or view is named `name`, ignoring case.
    fn object_exists(&self, name: &str) -> SixnfResult<bool>;
}

impl<T: ISqlEngine + ?Sized> ISqlEngine for Arc<T> {
    fn execute(&self, sql: &str, params: &Params) -> SixnfResult<ExecOutcome> {
        (**self).execute(sql, params)
    }
    fn query(&self, sql: &str, params: &Params) -> SixnfResult<ResultSet> {
        (**self).query(sql, params)
    }
    fn execute_batch(&self, sql: &str) -> SixnfResult<()> {
        (**self).execute_batch(sql)
    }
    fn begin(&self) -> SixnfResult<()> {
        (**self).begin()
    }
    fn commit(&self) -> SixnfResult<()> {
        (**self).commit()
    }
    fn rollback(&self) -> SixnfResult<()> {
        (**self).rollback()
    }
    fn savepoint(&self, name: &str) -> SixnfResult<()> {
        (**self).savepoint(name)
    }
    fn release(&self, name: &str) -> SixnfResult<()> {
        (**self).release(name)
    }
    fn rollback_to(&self, name: &str) -> SixnfResult<()> {
        (**self).rollback_to(name)
    }
    fn is_autocommit(&self) -> SixnfResult<bool> {
        (**self).is_autocommit()
    }
    fn now(&self) -> SixnfResult<Timestamp> {
        (**self).now()
    }
    fn table_columns(&self, table: &str) -> SixnfResult<Vec<ColumnInfo>> {
        (**self).table_columns(table)
    }
    fn list_user_tables(&self) -> SixnfResult<Vec<String>> {
        (**self).list_user_tables()
    }
    fn object_exists(&self, name: &str) -> SixnfResult<bool> {
        (**self).object_exists(name)
    }
}
