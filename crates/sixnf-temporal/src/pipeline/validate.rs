//! Checks run before any physical write of an intent.

use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{
    physical, CatalogEntry, ColumnDef, ForeignKeyDef, LogicalRowState, Period, SqlBuilder, SqlValue,
    Timestamp,
};
use sixnf_core::traits::ISqlEngine;

use crate::algebra;
use crate::catalog::SchemaCatalog;

/// Values of one logical row by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowImage {
    values: Vec<(String, SqlValue)>,
}

impl RowImage {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, column: &str, value: SqlValue) {
        match self.values.iter_mut().find(|(c, _)| c.eq_ignore_ascii_case(column)) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    /// The row as stored, with `assignments` applied on top.
    pub fn from_state(
        entry: &CatalogEntry,
        state: &LogicalRowState,
        assignments: &[(String, SqlValue)],
    ) -> Self {
        let mut image = RowImage::default();
        if let Some(key) = entry.key.column() {
            image.set(key, state.owner.clone());
        }
        if let (Some(period), Some(valid)) = (entry.valid_period(), state.valid) {
            image.set(&period.start_column, valid.start.to_value());
            image.set(&period.end_column, valid.end.to_value());
        }
        for column in &state.columns {
            image.set(&column.column, column.value.clone());
        }
        for (column, value) in assignments {
            image.set(column, value.clone());
        }
        image
    }

    fn tuple(&self, columns: &[String]) -> Option<Vec<SqlValue>> {
        columns
            .iter()
            .map(|c| self.get(c).filter(|v| !v.is_null()).cloned())
            .collect()
    }
}

fn describe(values: &[SqlValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// NOT NULL and affinity checks for one value.
pub fn check_value(entry: &CatalogEntry, column: &ColumnDef, value: &SqlValue) -> Result<(), TemporalError> {
    let mismatch = |detail: String| TemporalError::TypeMismatch {
        table: entry.name().to_string(),
        column: column.name.clone(),
        detail,
    };
    if value.is_null() {
        if column.not_null {
            return Err(mismatch("NOT NULL column cannot be NULL".to_string()));
        }
        return Ok(());
    }
    if !column.affinity().accepts(value) {
        return Err(mismatch(format!(
            "{value} is not a valid {} value",
            column.declared_type
        )));
    }
    Ok(())
}

/// Canonicalize the bounds of application periods stored as plain columns.
pub fn canonicalize_secondary_periods(entry: &CatalogEntry, image: &mut RowImage) -> Result<(), TemporalError> {
    let primary = entry.valid_period().map(|p| p.name.clone());
    for period in entry.table.application_periods() {
        if primary.as_deref().is_some_and(|p| period.is_named(p)) {
            continue;
        }
        let mut bounds = [None, None];
        for (slot, column) in bounds.iter_mut().zip([&period.start_column, &period.end_column]) {
            if let Some(value) = image.get(column).filter(|v| !v.is_null()) {
                let ts = Timestamp::from_value(value)?;
                image.set(column, ts.to_value());
                *slot = Some(ts);
            }
        }
        if let [Some(start), Some(end)] = bounds {
            if start >= end {
                return Err(TemporalError::InvalidPeriodBounds(format!(
                    "{}: [{start}, {end}) is empty",
                    period.name
                )));
            }
        }
    }
    Ok(())
}

/// The declared key columns, if any.
pub fn key_columns(entry: &CatalogEntry) -> Vec<String> {
    let periods: Vec<_> = entry.table.periods.iter().map(|p| p.name.as_str()).collect();
    match &entry.table.primary_key {
        Some(pk) => pk
            .columns
            .iter()
            .filter(|c| !periods.iter().any(|p| p.eq_ignore_ascii_case(c)))
            .cloned()
            .collect(),
        None => entry
            .table
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect(),
    }
}

/// Current rows of a logical table whose `columns` equal `values`.
fn select_by_columns(
    engine: &dyn ISqlEngine,
    table: &str,
    select: &str,
    columns: &[String],
    values: &[SqlValue],
) -> SixnfResult<Vec<Vec<SqlValue>>> {
    let mut sql = SqlBuilder::new();
    sql.push_str(&format!("SELECT {select} FROM {} WHERE ", physical::quote(table)));
    for (i, (column, value)) in columns.iter().zip(values).enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        sql.push_str(&format!("{} = ", physical::quote(column)));
        sql.push_value(value.clone())?;
    }
    let bound = sql.finish();
    Ok(engine.query(&bound.sql, &bound.params)?.rows)
}

/// Rows of a table without application time must have unique keys.
pub fn check_duplicate_keys(engine: &dyn ISqlEngine, entry: &CatalogEntry, images: &[RowImage]) -> SixnfResult<()> {
    if entry.has_application_time() {
        return Ok(());
    }
    let columns = key_columns(entry);
    if columns.is_empty() {
        return Ok(());
    }
    let mut seen: Vec<Vec<SqlValue>> = Vec::new();
    for image in images {
        let Some(key) = image.tuple(&columns) else {
            continue;
        };
        if seen.contains(&key)
            || !select_by_columns(engine, entry.name(), "1", &columns, &key)?.is_empty()
        {
            return Err(TemporalError::DuplicateKey {
                table: entry.name().to_string(),
                key: describe(&key),
            }
            .into());
        }
        seen.push(key);
    }
    Ok(())
}

/// Open application periods of one key must not overlap.
pub fn check_overlaps(
    engine: &dyn ISqlEngine,
    entry: &CatalogEntry,
    rows: &[(RowImage, Period)],
) -> SixnfResult<()> {
    let Some(period) = entry.valid_period() else {
        return Ok(());
    };
    let columns = key_columns(entry);
    if columns.is_empty() {
        return Ok(());
    }
    let select = format!(
        "{}, {}",
        physical::quote(&period.start_column),
        physical::quote(&period.end_column)
    );

    let mut seen: Vec<(Vec<SqlValue>, Period)> = Vec::new();
    for (image, valid) in rows {
        let Some(key) = image.tuple(&columns) else {
            continue;
        };
        let mut existing: Vec<Period> = seen
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, p)| *p)
            .collect();
        for row in select_by_columns(engine, entry.name(), &select, &columns, &key)? {
            existing.push(Period::new(
                Timestamp::from_value(&row[0])?,
                Timestamp::from_value(&row[1])?,
            )?);
        }
        if existing.iter().any(|p| algebra::overlaps(*p, *valid)) {
            return Err(TemporalError::PeriodOverlap {
                table: entry.name().to_string(),
                key: describe(&key),
                start: valid.start.to_string(),
                end: valid.end.to_string(),
            }
            .into());
        }
        seen.push((key, *valid));
    }
    Ok(())
}

/// Whether the union of `periods` covers `need`.
pub fn covers(periods: &mut [Period], need: Period) -> bool {
    periods.sort_by_key(|p| p.start);
    let mut reached = need.start;
    for p in periods.iter() {
        if p.start > reached {
            break;
        }
        if p.end > reached {
            reached = p.end;
        }
        if reached >= need.end {
            return true;
        }
    }
    reached >= need.end
}

/// Referencing-side foreign key check for one written row.
///
/// Keys with a period must be covered by the referenced key's current
/// periods; keys without one must reference an existing current row.
pub fn check_foreign_keys(
    engine: &dyn ISqlEngine,
    catalog: &SchemaCatalog,
    entry: &CatalogEntry,
    image: &RowImage,
    now: Timestamp,
) -> SixnfResult<()> {
    for fk in &entry.table.foreign_keys {
        check_foreign_key(engine, catalog, entry, fk, image, now)?;
    }
    Ok(())
}

fn check_foreign_key(
    engine: &dyn ISqlEngine,
    catalog: &SchemaCatalog,
    entry: &CatalogEntry,
    fk: &ForeignKeyDef,
    image: &RowImage,
    now: Timestamp,
) -> SixnfResult<()> {
    let Some(key) = image.tuple(&fk.columns) else {
        return Ok(());
    };

    let need = match fk.period.as_deref().and_then(|p| entry.table.application_period(p)) {
        Some(period) => {
            let bound = |column: &str| {
                image
                    .get(column)
                    .filter(|v| !v.is_null())
                    .map(Timestamp::from_value)
                    .transpose()
            };
            match (bound(&period.start_column)?, bound(&period.end_column)?) {
                (Some(start), Some(end)) => Some(Period::new(start, end)?),
                _ => None,
            }
        }
        None => None,
    };

    let referenced = catalog.lookup(&fk.referenced_table)?;
    let mut referenced_columns = fk.referenced_columns.clone();
    if referenced_columns.is_empty() {
        referenced_columns = referenced
            .as_deref()
            .map(key_columns)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| fk.columns.clone());
    }
    let referenced_period = match referenced.as_deref() {
        Some(target) => match &fk.referenced_period {
            Some(name) => Some(target.table.application_period(name).cloned().ok_or_else(|| {
                TemporalError::UnknownPeriod {
                    table: target.name().to_string(),
                    period: name.clone(),
                }
            })?),
            None => target.valid_period().cloned(),
        },
        None => None,
    };

    let covered = match (need, &referenced_period) {
        (Some(need), Some(period)) => {
            let select = format!(
                "{}, {}",
                physical::quote(&period.start_column),
                physical::quote(&period.end_column)
            );
            let mut periods = Vec::new();
            for row in select_by_columns(engine, &fk.referenced_table, &select, &referenced_columns, &key)? {
                if let (Ok(start), Ok(end)) =
                    (Timestamp::from_value(&row[0]), Timestamp::from_value(&row[1]))
                {
                    if start < end {
                        periods.push(Period { start, end });
                    }
                }
            }
            covers(&mut periods, need)
        }
        _ => !select_by_columns(engine, &fk.referenced_table, "1", &referenced_columns, &key)?
            .is_empty(),
    };

    if covered {
        return Ok(());
    }
    let span = need.unwrap_or(Period {
        start: now,
        end: Timestamp::Infinity,
    });
    Err(TemporalError::ForeignKeyPeriod {
        table: entry.name().to_string(),
        column: fk.columns.join(", "),
        key: describe(&key),
        start: span.start.to_string(),
        end: span.end.to_string(),
        referenced: fk.referenced_table.clone(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str, e: &str) -> Period {
        Period::new(Timestamp::parse(s).unwrap(), Timestamp::parse(e).unwrap()).unwrap()
    }

    #[test]
    fn coverage_joins_adjacent_periods() {
        let mut periods = vec![p("2021-01-01", "2022-01-01"), p("2020-01-01", "2021-01-01")];
        assert!(covers(&mut periods, p("2020-06-01", "2021-06-01")));
        assert!(!covers(&mut periods, p("2019-06-01", "2021-06-01")));
    }

    #[test]
    fn coverage_fails_on_gaps() {
        let mut periods = vec![p("2020-01-01", "2020-06-01"), p("2020-07-01", "2021-01-01")];
        assert!(!covers(&mut periods, p("2020-01-01", "2021-01-01")));
        assert!(covers(&mut periods, p("2020-08-01", "2020-09-01")));
    }

    #[test]
    fn images_apply_assignments_last() {
        let mut image = RowImage::default();
        image.set("Name", SqlValue::text("a"));
        image.set("name", SqlValue::text("b"));
        assert_eq!(image.get("NAME"), Some(&SqlValue::text("b")));
        assert_eq!(image.tuple(&["name".to_string()]), Some(vec![SqlValue::text("b")]));
        image.set("name", SqlValue::Null);
        assert_eq!(image.tuple(&["name".to_string()]), None);
    }
}
