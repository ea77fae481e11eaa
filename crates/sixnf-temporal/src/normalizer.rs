//! Schema normalization.
//!
//! A temporal CREATE TABLE becomes one root log, one shadow log per value
//! column, a resolving `_facts` view per log and a view under the logical
//! name that rebuilds current rows. Existing plain tables can be converted
//! in place; their current rows become the first facts.

use std::sync::Arc;

use tracing::{info, warn};

use sixnf_core::config::TemporalConfig;
use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{
    physical, CatalogEntry, ColumnDef, CreateTableIntent, KeyDef, KeyLayout, LogicalTable, Params,
    SqlValue, Timestamp,
};
use sixnf_core::traits::{ColumnInfo, ISqlEngine};

use crate::catalog::SchemaCatalog;
use crate::pipeline::{self, plan_insert, NewRow};
use crate::views::layout_ddl;

/// Physical DDL for one registered table, in execution order.
#[derive(Debug, Clone)]
pub struct NormalizationPlan {
    pub entry: Arc<CatalogEntry>,
    pub statements: Vec<String>,
}

/// Register a temporal CREATE TABLE and derive its layout.
///
/// `None` when the table exists and the statement said IF NOT EXISTS. A
/// plain table or view already holding the name counts as existing.
pub fn normalize(
    engine: &dyn ISqlEngine,
    catalog: &SchemaCatalog,
    intent: &CreateTableIntent,
) -> SixnfResult<Option<NormalizationPlan>> {
    let name = &intent.name.name;
    let exists = catalog.lookup(name)?.is_some() || engine.object_exists(name)?;
    if exists {
        if intent.if_not_exists {
            return Ok(None);
        }
        return Err(TemporalError::DuplicateTable {
            table: name.to_string(),
        }
        .into());
    }
    let table = intent.to_logical_table()?;
    for constraint in &intent.constraints {
        warn!(table = %table.name, constraint = %constraint, "table constraint recorded but not enforced");
    }
    let entry = catalog.register(table)?;
    Ok(Some(plan(entry)))
}

pub fn plan(entry: Arc<CatalogEntry>) -> NormalizationPlan {
    let statements = layout_ddl(&entry);
    NormalizationPlan { entry, statements }
}

pub fn execute_plan(engine: &dyn ISqlEngine, plan: &NormalizationPlan) -> SixnfResult<()> {
    for statement in &plan.statements {
        engine.execute(statement, &Params::None)?;
    }
    info!(
        table = %plan.entry.name(),
        statements = plan.statements.len(),
        "created physical layout"
    );
    Ok(())
}

/// Logical definition of a plain table from its introspected columns.
pub fn existing_table_definition(name: &str, columns: &[ColumnInfo], system_versioned: bool) -> LogicalTable {
    let mut key: Vec<&ColumnInfo> = columns.iter().filter(|c| c.primary_key_position > 0).collect();
    key.sort_by_key(|c| c.primary_key_position);
    let single_key = key.len() == 1;

    LogicalTable {
        name: name.to_string(),
        columns: columns
            .iter()
            .map(|c| ColumnDef {
                name: c.name.clone(),
                declared_type: c.declared_type.clone(),
                not_null: c.not_null,
                primary_key: single_key && c.primary_key_position > 0,
                default_sql: c.default_sql.clone(),
                generated: None,
            })
            .collect(),
        periods: Vec::new(),
        primary_key: (key.len() > 1).then(|| KeyDef {
            columns: key.iter().map(|c| c.name.clone()).collect(),
            period: None,
        }),
        foreign_keys: Vec::new(),
        system_versioned,
    }
}

/// Convert the plain table `name` into a registered temporal table.
///
/// The original table is kept as `sixnf_legacy_{id}`; with back-filling on,
/// each of its rows becomes an open fact recorded at `now`.
pub fn normalize_existing_table(
    engine: &dyn ISqlEngine,
    catalog: &SchemaCatalog,
    config: &TemporalConfig,
    name: &str,
    now: Timestamp,
) -> SixnfResult<Arc<CatalogEntry>> {
    if catalog.lookup(name)?.is_some() {
        return Err(TemporalError::DuplicateTable {
            table: name.to_string(),
        }
        .into());
    }
    let columns = engine.table_columns(name)?;
    if columns.is_empty() || physical::is_reserved(name) {
        return Err(TemporalError::UnknownTable {
            table: name.to_string(),
        }
        .into());
    }

    let table = existing_table_definition(name, &columns, config.normalize_with_system_versioning).finalize()?;
    let entry = catalog.register(table)?;
    let legacy = physical::legacy_table(entry.id);
    engine.execute(
        &format!(
            "ALTER TABLE {} RENAME TO {}",
            physical::quote(name),
            physical::quote(&legacy)
        ),
        &Params::None,
    )?;
    execute_plan(engine, &plan(entry.clone()))?;

    let rows = if config.backfill_on_normalize {
        backfill(engine, &entry, &legacy, now)?
    } else {
        0
    };
    info!(table = %name, legacy = %legacy, rows, "normalized existing table");
    Ok(entry)
}

/// Copy the current rows of `legacy` into the logs of `entry`.
fn backfill(engine: &dyn ISqlEngine, entry: &CatalogEntry, legacy: &str, now: Timestamp) -> SixnfResult<usize> {
    let key = entry.key.column();
    let mut select: Vec<String> = entry.shadows.iter().map(|s| physical::quote(&s.column)).collect();
    if let Some(key) = key {
        select.push(physical::quote(key));
    }
    if select.is_empty() {
        return Ok(0);
    }
    let rows = engine.query(
        &format!("SELECT {} FROM {}", select.join(", "), physical::quote(legacy)),
        &Params::None,
    )?;

    let mut next_owner = 0i64;
    let mut new_rows = Vec::with_capacity(rows.len());
    for row in rows.rows {
        let owner = match entry.key {
            KeyLayout::Column { .. } => row.last().cloned().unwrap_or(SqlValue::Null),
            KeyLayout::Synthetic => {
                next_owner += 1;
                SqlValue::Integer(next_owner)
            }
        };
        if owner.is_null() {
            warn!(table = %entry.name(), "skipping row with NULL key");
            continue;
        }
        new_rows.push(NewRow {
            owner,
            valid: None,
            values: entry
                .shadows
                .iter()
                .zip(row)
                .map(|(shadow, value)| (shadow.column.clone(), value))
                .collect(),
        });
    }

    pipeline::apply(engine, entry, plan_insert(&new_rows, now))?;
    Ok(new_rows.len())
}

/// Convert every plain user table that is not registered yet.
pub fn normalize_all_existing_tables(
    engine: &dyn ISqlEngine,
    catalog: &SchemaCatalog,
    config: &TemporalConfig,
    now: Timestamp,
) -> SixnfResult<Vec<Arc<CatalogEntry>>> {
    let mut converted = Vec::new();
    for name in engine.list_user_tables()? {
        if catalog.lookup(&name)?.is_some() {
            continue;
        }
        converted.push(normalize_existing_table(engine, catalog, config, &name, now)?);
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, declared_type: &str, pk: u32) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            not_null: false,
            default_sql: None,
            primary_key_position: pk,
        }
    }

    #[test]
    fn single_column_key_becomes_owner() {
        let table = existing_table_definition(
            "users",
            &[info("id", "INTEGER", 1), info("email", "TEXT", 0)],
            true,
        )
        .finalize()
        .unwrap();
        let entry = CatalogEntry::build(1, table, "");
        assert_eq!(entry.key.column(), Some("id"));
        assert_eq!(entry.shadows.len(), 1);
        assert!(entry.is_system_versioned());
    }

    #[test]
    fn composite_key_is_synthetic() {
        let table = existing_table_definition(
            "lines",
            &[info("order_id", "INTEGER", 1), info("line", "INTEGER", 2), info("qty", "REAL", 0)],
            true,
        )
        .finalize()
        .unwrap();
        assert_eq!(table.primary_key.as_ref().unwrap().columns, vec!["order_id", "line"]);
        let entry = CatalogEntry::build(2, table, "");
        assert_eq!(entry.key, KeyLayout::Synthetic);
        assert_eq!(entry.shadows.len(), 3);
    }
}
