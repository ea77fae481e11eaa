//! Temporal write pipeline.
//!
//! INSERT, UPDATE and DELETE intents become ordered append-only physical
//! operations. Every intent is validated completely before its first
//! physical write; the caller wraps execution in a savepoint (or an implicit
//! transaction) so the operations of one intent land together.

mod execute;
mod load;
pub mod plan;
mod validate;

use tracing::debug;

use sixnf_core::config::TemporalConfig;
use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{
    Affinity, CatalogEntry, ColumnDef, DeleteIntent, InsertIntent, InsertSource, KeyLayout, Params,
    Period, PortionClause, SqlFragment, SqlValue, Timestamp, UpdateIntent, SYSTEM_TIME,
};
use sixnf_core::traits::ISqlEngine;

use crate::algebra;
use crate::catalog::SchemaCatalog;
use crate::translator::evaluate_instant;

pub use execute::render;
pub use plan::{plan_delete, plan_insert, plan_update, split, supersede, NewRow, RowChange, WritePlan};
pub use validate::{covers, RowImage};

pub struct WritePipeline<'a> {
    engine: &'a dyn ISqlEngine,
    catalog: &'a SchemaCatalog,
    config: &'a TemporalConfig,
}

impl<'a> WritePipeline<'a> {
    pub fn new(engine: &'a dyn ISqlEngine, catalog: &'a SchemaCatalog, config: &'a TemporalConfig) -> Self {
        Self {
            engine,
            catalog,
            config,
        }
    }

    /// Insert logical rows. Returns the number of rows inserted.
    pub fn insert(
        &self,
        entry: &CatalogEntry,
        intent: &InsertIntent,
        params: &Params,
        now: Timestamp,
    ) -> SixnfResult<usize> {
        let targets: Vec<&ColumnDef> = match &intent.columns {
            Some(names) => names
                .iter()
                .map(|name| insert_column(entry, name))
                .collect::<Result<_, _>>()?,
            None => entry.table.columns.iter().filter(|c| is_insertable(entry, c)).collect(),
        };

        let raw_rows = match &intent.source {
            InsertSource::Values(rows) => rows
                .iter()
                .map(|row| {
                    arity(entry, &targets, row.len())?;
                    load::evaluate_row(self.engine, row, params)
                })
                .collect::<SixnfResult<Vec<_>>>()?,
            InsertSource::Select(select) => {
                let bound = select.bind(params)?;
                let rows = self.engine.query(&bound.sql, &bound.params)?.rows;
                for row in &rows {
                    arity(entry, &targets, row.len())?;
                }
                rows
            }
            InsertSource::DefaultValues => vec![Vec::new()],
        };

        let mut next_owner: Option<i64> = None;
        let mut images = Vec::with_capacity(raw_rows.len());
        let mut rows = Vec::with_capacity(raw_rows.len());
        for raw in raw_rows {
            let mut image = RowImage::default();
            for (column, value) in targets.iter().zip(raw) {
                image.set(&column.name, value);
            }
            for column in entry.table.columns.iter().filter(|c| is_insertable(entry, c)) {
                if image.get(&column.name).is_none() {
                    let value = match &column.default_sql {
                        Some(default) => load::evaluate_row(
                            self.engine,
                            &[SqlFragment::literal(default.clone())],
                            &Params::None,
                        )?
                        .into_iter()
                        .next()
                        .unwrap_or(SqlValue::Null),
                        None => SqlValue::Null,
                    };
                    image.set(&column.name, value);
                }
            }

            let owner = self.allocate_owner(entry, &mut image, &mut next_owner)?;
            let valid = match entry.valid_period() {
                Some(period) => {
                    let bound = |column: &str, fallback: Timestamp| {
                        match image.get(column).filter(|v| !v.is_null()) {
                            Some(value) => Timestamp::from_value(value),
                            None => Ok(fallback),
                        }
                    };
                    let valid = Period::new(
                        bound(&period.start_column, now)?,
                        bound(&period.end_column, Timestamp::Infinity)?,
                    )?;
                    image.set(&period.start_column, valid.start.to_value());
                    image.set(&period.end_column, valid.end.to_value());
                    Some(valid)
                }
                None => None,
            };

            for column in entry.table.columns.iter().filter(|c| is_insertable(entry, c)) {
                if entry.valid_period().is_some_and(|p| p.covers_column(&column.name)) {
                    continue;
                }
                let value = image.get(&column.name).cloned().unwrap_or(SqlValue::Null);
                validate::check_value(entry, column, &value)?;
            }
            validate::canonicalize_secondary_periods(entry, &mut image)?;

            rows.push(NewRow {
                owner,
                valid,
                values: entry
                    .shadows
                    .iter()
                    .map(|s| {
                        let value = image.get(&s.column).cloned().unwrap_or(SqlValue::Null);
                        (s.column.clone(), value)
                    })
                    .collect(),
            });
            images.push(image);
        }

        validate::check_duplicate_keys(self.engine, entry, &images)?;
        if self.config.enforce_period_overlap {
            let periods: Vec<(RowImage, Period)> = images
                .iter()
                .zip(&rows)
                .filter_map(|(image, row)| row.valid.map(|v| (image.clone(), v)))
                .collect();
            validate::check_overlaps(self.engine, entry, &periods)?;
        }
        if self.config.enforce_foreign_key_periods {
            for image in &images {
                validate::check_foreign_keys(self.engine, self.catalog, entry, image, now)?;
            }
        }

        let plan = plan_insert(&rows, now);
        debug!(table = %entry.name(), rows = rows.len(), ops = plan.len(), "planned insert");
        execute::execute(self.engine, entry, &plan.ops())?;
        Ok(rows.len())
    }

    /// Key of a new row: the supplied key, or `max + 1` for synthetic and
    /// NULL integer keys.
    fn allocate_owner(
        &self,
        entry: &CatalogEntry,
        image: &mut RowImage,
        next_owner: &mut Option<i64>,
    ) -> SixnfResult<SqlValue> {
        let base = match *next_owner {
            Some(n) => n,
            None => load::max_owner(self.engine, entry)?,
        };

        match &entry.key {
            KeyLayout::Synthetic => {
                *next_owner = Some(base + 1);
                Ok(SqlValue::Integer(base + 1))
            }
            KeyLayout::Column { name, declared_type } => {
                let supplied = image.get(name).cloned().unwrap_or(SqlValue::Null);
                if !supplied.is_null() {
                    *next_owner = Some(supplied.as_integer().map_or(base, |n| base.max(n)));
                    return Ok(supplied);
                }
                if Affinity::of(declared_type) != Affinity::Integer {
                    return Err(TemporalError::TypeMismatch {
                        table: entry.name().to_string(),
                        column: name.clone(),
                        detail: "key cannot be NULL".to_string(),
                    }
                    .into());
                }
                *next_owner = Some(base + 1);
                let owner = SqlValue::Integer(base + 1);
                image.set(name, owner.clone());
                Ok(owner)
            }
        }
    }

    /// Update current logical rows. Returns the number of rows matched.
    pub fn update(
        &self,
        entry: &CatalogEntry,
        intent: &UpdateIntent,
        params: &Params,
        now: Timestamp,
    ) -> SixnfResult<usize> {
        let mut columns = Vec::with_capacity(intent.assignments.len());
        for assignment in &intent.assignments {
            columns.push(assignable_column(entry, &assignment.column)?);
        }
        let portion = self.portion(entry, intent.portion.as_ref(), params)?;
        let exprs: Vec<&SqlFragment> = intent.assignments.iter().map(|a| &a.value).collect();
        let matched = load::matching_rows(self.engine, entry, intent.predicate.as_ref(), &exprs, params)?;

        let fk_columns: Vec<&str> = entry
            .table
            .foreign_keys
            .iter()
            .flat_map(|fk| {
                let period = fk
                    .period
                    .as_deref()
                    .and_then(|p| entry.table.application_period(p))
                    .map(|p| [p.start_column.as_str(), p.end_column.as_str()]);
                fk.columns
                    .iter()
                    .map(String::as_str)
                    .chain(period.into_iter().flatten())
            })
            .collect();
        let checks_fk = self.config.enforce_foreign_key_periods
            && columns
                .iter()
                .any(|c| fk_columns.iter().any(|f| c.is_named(f)));

        let mut changes = Vec::with_capacity(matched.len());
        for row in matched {
            if !overlaps_portion(row.valid, portion) {
                continue;
            }
            let Some(state) = load::load_state(self.engine, entry, &row.owner, row.valid)? else {
                continue;
            };
            let mut assigned = Vec::with_capacity(columns.len());
            for (column, value) in columns.iter().zip(row.values) {
                validate::check_value(entry, column, &value)?;
                assigned.push((column.name.clone(), value));
            }
            let mut image = RowImage::from_state(entry, &state, &assigned);
            validate::canonicalize_secondary_periods(entry, &mut image)?;
            for (column, value) in assigned.iter_mut() {
                if let Some(canonical) = image.get(column) {
                    *value = canonical.clone();
                }
            }
            if checks_fk {
                validate::check_foreign_keys(self.engine, self.catalog, entry, &image, now)?;
            }
            changes.push(RowChange {
                state,
                assignments: assigned,
            });
        }

        let plan = plan_update(entry, &changes, portion, now);
        debug!(table = %entry.name(), rows = changes.len(), ops = plan.len(), "planned update");
        execute::execute(self.engine, entry, &plan.ops())?;
        Ok(changes.len())
    }

    /// Delete current logical rows. Returns the number of rows matched.
    pub fn delete(
        &self,
        entry: &CatalogEntry,
        intent: &DeleteIntent,
        params: &Params,
        now: Timestamp,
    ) -> SixnfResult<usize> {
        let portion = self.portion(entry, intent.portion.as_ref(), params)?;
        let matched = load::matching_rows(self.engine, entry, intent.predicate.as_ref(), &[], params)?;

        let mut states = Vec::with_capacity(matched.len());
        for row in matched {
            if !overlaps_portion(row.valid, portion) {
                continue;
            }
            if let Some(state) = load::load_state(self.engine, entry, &row.owner, row.valid)? {
                states.push(state);
            }
        }

        let plan = plan_delete(entry, &states, portion, now);
        debug!(table = %entry.name(), rows = states.len(), ops = plan.len(), "planned delete");
        execute::execute(self.engine, entry, &plan.ops())?;
        Ok(states.len())
    }

    /// Resolve `FOR PORTION OF p FROM s TO e` to a period.
    fn portion(
        &self,
        entry: &CatalogEntry,
        portion: Option<&PortionClause>,
        params: &Params,
    ) -> SixnfResult<Option<Period>> {
        let Some(portion) = portion else {
            return Ok(None);
        };
        let unsupported = |reason: &str| TemporalError::UnsupportedPortion {
            table: entry.name().to_string(),
            period: portion.period.clone(),
            reason: reason.to_string(),
        };
        if portion.period.eq_ignore_ascii_case(SYSTEM_TIME) {
            return Err(unsupported("system time is maintained by the engine").into());
        }
        let Some(period) = entry.table.application_period(&portion.period) else {
            return Err(TemporalError::UnknownPeriod {
                table: entry.name().to_string(),
                period: portion.period.clone(),
            }
            .into());
        };
        if !entry.valid_period().is_some_and(|v| v.is_named(&period.name)) {
            return Err(unsupported("only the primary application period can be split").into());
        }
        let from = evaluate_instant(self.engine, &portion.from, params)?;
        let to = evaluate_instant(self.engine, &portion.to, params)?;
        Ok(Some(Period::new(from, to)?))
    }
}

fn overlaps_portion(valid: Option<Period>, portion: Option<Period>) -> bool {
    match (valid, portion) {
        (Some(valid), Some(portion)) => algebra::overlaps(valid, portion),
        _ => true,
    }
}

fn is_system_column(entry: &CatalogEntry, column: &ColumnDef) -> bool {
    column.generated.is_some()
        || entry
            .table
            .system_period()
            .is_some_and(|p| p.covers_column(&column.name))
}

fn is_insertable(entry: &CatalogEntry, column: &ColumnDef) -> bool {
    !is_system_column(entry, column)
}

fn unknown_column(entry: &CatalogEntry, name: &str) -> TemporalError {
    TemporalError::UnknownColumn {
        table: entry.name().to_string(),
        column: name.to_string(),
    }
}

fn immutable(entry: &CatalogEntry, column: &ColumnDef, reason: &str) -> TemporalError {
    TemporalError::ImmutableColumn {
        table: entry.name().to_string(),
        column: column.name.clone(),
        reason: reason.to_string(),
    }
}

fn insert_column<'e>(entry: &'e CatalogEntry, name: &str) -> Result<&'e ColumnDef, TemporalError> {
    let column = entry.table.column(name).ok_or_else(|| unknown_column(entry, name))?;
    if is_system_column(entry, column) {
        return Err(immutable(entry, column, "system time is maintained by the engine"));
    }
    Ok(column)
}

fn assignable_column<'e>(entry: &'e CatalogEntry, name: &str) -> Result<&'e ColumnDef, TemporalError> {
    let column = entry.table.column(name).ok_or_else(|| unknown_column(entry, name))?;
    if is_system_column(entry, column) {
        return Err(immutable(entry, column, "system time is maintained by the engine"));
    }
    if validate::key_columns(entry).iter().any(|k| column.is_named(k))
        || entry.key.column().is_some_and(|k| column.is_named(k))
    {
        return Err(immutable(entry, column, "key columns identify the row"));
    }
    if entry.valid_period().is_some_and(|p| p.covers_column(&column.name)) {
        return Err(immutable(entry, column, "use FOR PORTION OF to change application time"));
    }
    Ok(column)
}

fn arity(entry: &CatalogEntry, targets: &[&ColumnDef], supplied: usize) -> Result<(), TemporalError> {
    if targets.len() == supplied {
        return Ok(());
    }
    Err(TemporalError::TypeMismatch {
        table: entry.name().to_string(),
        column: targets
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        detail: format!("{supplied} values for {} columns", targets.len()),
    })
}

/// Execute a plan built outside the pipeline (e.g. a back-fill).
pub fn apply(engine: &dyn ISqlEngine, entry: &CatalogEntry, plan: WritePlan) -> SixnfResult<usize> {
    execute::execute(engine, entry, &plan.ops())
}
