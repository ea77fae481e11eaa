//! SQLite engine: the one place in sixnf that holds a `Mutex<Connection>`.
//!
//! All other crates reach storage through `ISqlEngine` and `ICatalogStore`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::debug;

use sixnf_core::config::StorageConfig;
use sixnf_core::errors::{SixnfResult, StorageError};
use sixnf_core::models::{
    physical, ExecOutcome, LogicalTable, Params, ResultSet, StoredTable, Timestamp,
};
use sixnf_core::traits::{ColumnInfo, ICatalogStore, ISqlEngine};

use crate::migrations;
use crate::pragmas::configure_connection;
use crate::queries::{catalog_ops, schema_ops, statement_ops};

/// Canonical millisecond clock, identical to the timestamps stored in shadow tables.
const NOW_SQL: &str = "SELECT strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// A single SQLite connection with migrations applied.
///
/// Transactions span calls: `begin` leaves the connection inside a
/// transaction until `commit` or `rollback`.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
}

impl SqliteEngine {
    /// Open the database described by `config` (in-memory when no path is set).
    pub fn open(config: &StorageConfig) -> SixnfResult<Self> {
        let conn = match &config.db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Self::from_connection(conn, config)
    }

    /// Open a file-backed database with default settings.
    pub fn open_path(path: &Path) -> SixnfResult<Self> {
        Self::from_connection(Connection::open(path)?, &StorageConfig::default())
    }

    pub fn open_in_memory() -> SixnfResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, &StorageConfig::default())
    }

    fn from_connection(conn: Connection, config: &StorageConfig) -> SixnfResult<Self> {
        configure_connection(&conn, config)?;
        let applied = migrations::run_migrations(&conn)?;
        debug!(applied, "sqlite engine ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure with the connection.
    pub fn with_conn<F, T>(&self, f: F) -> SixnfResult<T>
    where
        F: FnOnce(&Connection) -> SixnfResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> SixnfResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()).into())
    }
}

impl ISqlEngine for SqliteEngine {
    fn execute(&self, sql: &str, params: &Params) -> SixnfResult<ExecOutcome> {
        self.with_conn(|conn| statement_ops::execute(conn, sql, params))
    }

    fn query(&self, sql: &str, params: &Params) -> SixnfResult<ResultSet> {
        self.with_conn(|conn| statement_ops::query(conn, sql, params))
    }

    fn execute_batch(&self, sql: &str) -> SixnfResult<()> {
        self.with_conn(|conn| Ok(conn.execute_batch(sql)?))
    }

    fn begin(&self) -> SixnfResult<()> {
        self.execute_batch("BEGIN")
    }

    fn commit(&self) -> SixnfResult<()> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&self) -> SixnfResult<()> {
        self.execute_batch("ROLLBACK")
    }

    fn savepoint(&self, name: &str) -> SixnfResult<()> {
        self.execute_batch(&format!("SAVEPOINT {}", physical::quote(name)))
    }

    fn release(&self, name: &str) -> SixnfResult<()> {
        self.execute_batch(&format!("RELEASE SAVEPOINT {}", physical::quote(name)))
    }

    fn rollback_to(&self, name: &str) -> SixnfResult<()> {
        self.execute_batch(&format!("ROLLBACK TO SAVEPOINT {}", physical::quote(name)))
    }

    fn is_autocommit(&self) -> SixnfResult<bool> {
        self.with_conn(|conn| Ok(conn.is_autocommit()))
    }

    fn now(&self) -> SixnfResult<Timestamp> {
        let text: String = self.with_conn(|conn| Ok(conn.query_row(NOW_SQL, [], |row| row.get(0))?))?;
        Ok(Timestamp::parse(&text)?)
    }

    fn table_columns(&self, table: &str) -> SixnfResult<Vec<ColumnInfo>> {
        self.with_conn(|conn| schema_ops::table_columns(conn, table))
    }

    fn list_user_tables(&self) -> SixnfResult<Vec<String>> {
        self.with_conn(schema_ops::list_user_tables)
    }

    fn object_exists(&self, name: &str) -> SixnfResult<bool> {
        self.with_conn(|conn| schema_ops::object_exists(conn, name))
    }
}

impl ICatalogStore for SqliteEngine {
    fn load_table(&self, name: &str) -> SixnfResult<Option<StoredTable>> {
        self.with_conn(|conn| catalog_ops::load_table(conn, name))
    }

    fn insert_table(&self, table: &LogicalTable) -> SixnfResult<StoredTable> {
        self.with_conn(|conn| catalog_ops::insert_table(conn, table))
    }

    fn list_tables(&self) -> SixnfResult<Vec<StoredTable>> {
        self.with_conn(catalog_ops::list_tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_core::models::SqlValue;

    #[test]
    fn test_transactions_span_calls() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine.execute_batch("CREATE TABLE t (x)").unwrap();
        assert!(engine.is_autocommit().unwrap());

        engine.begin().unwrap();
        assert!(!engine.is_autocommit().unwrap());
        engine
            .execute("INSERT INTO t VALUES (?)", &Params::positional([1i64]))
            .unwrap();
        engine.rollback().unwrap();

        let rows = engine.query("SELECT count(*) FROM t", &Params::None).unwrap();
        assert_eq!(rows.scalar(), Some(&SqlValue::Integer(0)));
    }

    #[test]
    fn test_savepoint_names_are_quoted() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine.savepoint("odd \"name\"").unwrap();
        assert!(!engine.is_autocommit().unwrap());
        engine.rollback_to("odd \"name\"").unwrap();
        engine.release("odd \"name\"").unwrap();
        assert!(engine.is_autocommit().unwrap());
    }

    #[test]
    fn test_now_is_canonical() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let now = engine.now().unwrap();
        assert!(!now.is_infinity());
        assert_eq!(now.to_string().len(), "2024-01-01 00:00:00.000".len());
    }
}
