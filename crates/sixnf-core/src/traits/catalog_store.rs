//! Persistence of registered logical tables.

use std::sync::Arc;

use crate::errors::SixnfResult;
use crate::models::{LogicalTable, StoredTable};

pub trait ICatalogStore: Send + Sync {
    /// Load a registered table by case-insensitive name.
    fn load_table(&self, name: &str) -> SixnfResult<Option<StoredTable>>;

    /// Persist a new table and return it with its allocated id.
    fn insert_table(&self, table: &LogicalTable) -> SixnfResult<StoredTable>;

    fn list_tables(&self) -> SixnfResult<Vec<StoredTable>>;
}

impl<T: ICatalogStore + ?Sized> ICatalogStore for Arc<T> {
    fn load_table(&self, name: &str) -> SixnfResult<Option<StoredTable>> {
        (**self).load_table(name)
    }
    fn insert_table(&self, table: &LogicalTable) -> SixnfResult<StoredTable> {
        (**self).insert_table(table)
    }
    fn list_tables(&self) -> SixnfResult<Vec<StoredTable>> {
        (**self).list_tables()
    }
}
