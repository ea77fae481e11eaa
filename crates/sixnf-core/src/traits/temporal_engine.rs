//! The rewrite-and-execute interface exposed to callers.

use crate::errors::SixnfResult;
use crate::models::{CatalogEntry, ExecOutcome, Params};

/// Temporal rewriting engine.
///
/// Statements against registered tables are rewritten into operations on
/// their shadow tables; everything else reaches the storage engine unchanged.
pub trait ITemporalEngine: Send + Sync {
    // Statement interception
    fn execute_intercepted(&self, sql: &str, params: &Params) -> SixnfResult<ExecOutcome>;

    /// Split a script at top-level `;` and intercept each statement.
    /// Returns the outcome of every statement in order.
    fn execute_script(&self, sql: &str) -> SixnfResult<Vec<ExecOutcome>>;

    // Normalization of plain tables
    fn normalize_existing_table(&self, name: &str) -> SixnfResult<CatalogEntry>;
    fn normalize_all_existing_tables(&self) -> SixnfResult<Vec<CatalogEntry>>;

    // Transaction boundaries, kept in sync with the transaction clock
    fn begin(&self) -> SixnfResult<()>;
    fn commit(&self) -> SixnfResult<()>;
    fn rollback(&self) -> SixnfResult<()>;
    fn savepoint(&self, name: &str) -> SixnfResult<()>;
    fn release(&self, name: &str) -> SixnfResult<()>;
    fn rollback_to(&self, name: &str) -> SixnfResult<()>;
}
