//! Schema catalog: registered logical tables and their physical layouts.
//!
//! Backed by `ICatalogStore`; entries are cached in memory. Lookups of
//! unregistered names are cached too (most statements target plain tables),
//! and every registration clears that negative cache. The caches belong to
//! one catalog: a table registered through another engine on the same
//! database stays unknown here until `invalidate` is called.

use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, info};

use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{CatalogEntry, LogicalTable, PeriodDef};
use sixnf_core::traits::ICatalogStore;

pub struct SchemaCatalog {
    store: Arc<dyn ICatalogStore>,
    entries: Cache<String, Arc<CatalogEntry>>,
    missing: Cache<String, ()>,
}

impl SchemaCatalog {
    pub fn new(store: Arc<dyn ICatalogStore>, capacity: u64) -> Self {
        Self {
            store,
            entries: Cache::new(capacity),
            missing: Cache::new(capacity),
        }
    }

    /// Register a new logical table. Fails with `DuplicateTable` if the name is taken.
    pub fn register(&self, table: LogicalTable) -> SixnfResult<Arc<CatalogEntry>> {
        let key = cache_key(&table.name);
        if self.lookup(&table.name)?.is_some() {
            return Err(TemporalError::DuplicateTable { table: table.name }.into());
        }

        let stored = self.store.insert_table(&table)?;
        let entry = Arc::new(CatalogEntry::from_stored(stored));
        self.missing.invalidate_all();
        self.entries.insert(key, entry.clone());

        info!(
            table = %entry.name(),
            id = entry.id,
            shadows = entry.shadows.len(),
            "registered temporal table"
        );
        Ok(entry)
    }

    /// Resolve a registered table or fail with `UnknownTable`.
    pub fn resolve(&self, name: &str) -> SixnfResult<Arc<CatalogEntry>> {
        self.lookup(name)?.ok_or_else(|| {
            TemporalError::UnknownTable {
                table: name.to_string(),
            }
            .into()
        })
    }

    /// Non-failing resolution used for pass-through decisions.
    pub fn lookup(&self, name: &str) -> SixnfResult<Option<Arc<CatalogEntry>>> {
        let key = cache_key(name);
        if let Some(entry) = self.entries.get(&key) {
            return Ok(Some(entry));
        }
        if self.missing.contains_key(&key) {
            return Ok(None);
        }

        match self.store.load_table(name)? {
            Some(stored) => {
                let entry = Arc::new(CatalogEntry::from_stored(stored));
                self.entries.insert(key, entry.clone());
                Ok(Some(entry))
            }
            None => {
                debug!(table = name, "not a registered table");
                self.missing.insert(key, ());
                Ok(None)
            }
        }
    }

    /// Resolve a period of a registered table or fail with `UnknownPeriod`.
    pub fn resolve_period(&self, table: &str, period: &str) -> SixnfResult<PeriodDef> {
        let entry = self.resolve(table)?;
        entry.table.period(period).cloned().ok_or_else(|| {
            TemporalError::UnknownPeriod {
                table: entry.name().to_string(),
                period: period.to_string(),
            }
            .into()
        })
    }

    /// All registered logical tables in registration order.
    pub fn list(&self) -> SixnfResult<Vec<LogicalTable>> {
        Ok(self
            .store
            .list_tables()?
            .into_iter()
            .map(|stored| stored.table)
            .collect())
    }

    /// Drop every cached entry, e.g. after a rollback undid registrations or
    /// after another engine registered tables in the same database.
    pub fn invalidate(&self) {
        self.entries.invalidate_all();
        self.missing.invalidate_all();
    }
}

fn cache_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_core::models::{ColumnDef, PeriodKind};
    use sixnf_storage::SqliteEngine;

    fn catalog() -> SchemaCatalog {
        let engine = Arc::new(SqliteEngine::open_in_memory().unwrap());
        SchemaCatalog::new(engine, 64)
    }

    fn table(name: &str) -> LogicalTable {
        LogicalTable {
            name: name.to_string(),
            columns: vec![ColumnDef::new("a", "TEXT")],
            periods: vec![],
            primary_key: None,
            foreign_keys: vec![],
            system_versioned: true,
        }
        .finalize()
        .unwrap()
    }

    #[test]
    fn register_then_resolve_any_case() {
        let catalog = catalog();
        assert!(catalog.lookup("Things").unwrap().is_none());
        let entry = catalog.register(table("Things")).unwrap();
        assert_eq!(catalog.resolve("THINGS").unwrap().id, entry.id);
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn registrations_elsewhere_need_invalidate() {
        let engine = Arc::new(SqliteEngine::open_in_memory().unwrap());
        let first = SchemaCatalog::new(engine.clone(), 64);
        let second = SchemaCatalog::new(engine, 64);

        assert!(second.lookup("t").unwrap().is_none());
        first.register(table("t")).unwrap();
        assert!(second.lookup("t").unwrap().is_none());

        second.invalidate();
        assert_eq!(second.lookup("t").unwrap().unwrap().id, first.resolve("t").unwrap().id);
    }

    #[test]
    fn duplicate_and_unknown() {
        let catalog = catalog();
        catalog.register(table("t")).unwrap();
        assert!(matches!(
            catalog.register(table("T")),
            Err(sixnf_core::SixnfError::TemporalError(
                TemporalError::DuplicateTable { .. }
            ))
        ));
        assert!(matches!(
            catalog.resolve("nope"),
            Err(sixnf_core::SixnfError::TemporalError(
                TemporalError::UnknownTable { .. }
            ))
        ));
    }

    #[test]
    fn periods_resolve_by_name() {
        let catalog = catalog();
        catalog.register(table("t")).unwrap();
        let period = catalog.resolve_period("t", "system_time").unwrap();
        assert_eq!(period.kind, PeriodKind::System);
        assert!(catalog.resolve_period("t", "valid").is_err());
    }
}
