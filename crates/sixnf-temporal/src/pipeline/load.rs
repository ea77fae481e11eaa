//! Reading current logical rows and their open facts.

use sixnf_core::errors::{SixnfResult, StorageError};
use sixnf_core::models::{
    physical, CatalogEntry, ColumnState, Fact, FactTarget, LogicalRowState, Params, Period,
    ResultSet, SqlBuilder, SqlFragment, SqlValue, Timestamp,
};
use sixnf_core::traits::ISqlEngine;

use crate::translator::{translate_predicate, SystemTimeFilter};
use crate::views::reconstruction_sql;

/// A current logical row matched by a statement's predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRow {
    pub owner: SqlValue,
    pub valid: Option<Period>,
    /// Values of the requested expressions, evaluated against the row.
    pub values: Vec<SqlValue>,
}

/// Evaluate `exprs` for every current row of `entry` matching `predicate`.
pub fn matching_rows(
    engine: &dyn ISqlEngine,
    entry: &CatalogEntry,
    predicate: Option<&SqlFragment>,
    exprs: &[&SqlFragment],
    params: &Params,
) -> SixnfResult<Vec<MatchedRow>> {
    let mut sql = SqlBuilder::new();
    sql.push_str(&format!("SELECT {}", physical::quote(physical::HIDDEN_OWNER)));
    let valid = entry.valid_period();
    if let Some(period) = valid {
        sql.push_str(&format!(
            ", {}, {}",
            physical::quote(&period.start_column),
            physical::quote(&period.end_column)
        ));
    }
    for expr in exprs {
        sql.push_str(", (");
        sql.push_fragment(expr, params)?;
        sql.push_str(")");
    }
    sql.push_str(&format!(
        " FROM ({}) AS {}",
        reconstruction_sql(entry, &SystemTimeFilter::Current, true),
        physical::quote(entry.name())
    ));
    if let Some(predicate) = predicate {
        let translated = translate_predicate(entry, predicate)?;
        sql.push_str(" WHERE ");
        sql.push_fragment(translated.as_ref().unwrap_or(predicate), params)?;
    }

    let bound = sql.finish();
    let rows = engine.query(&bound.sql, &bound.params)?;
    let skip = if valid.is_some() { 3 } else { 1 };
    rows.rows
        .into_iter()
        .map(|row| -> SixnfResult<MatchedRow> {
            let valid = match valid {
                Some(_) => Some(Period::new(
                    Timestamp::from_value(&row[1])?,
                    Timestamp::from_value(&row[2])?,
                )?),
                None => None,
            };
            Ok(MatchedRow {
                owner: row[0].clone(),
                valid,
                values: row[skip..].to_vec(),
            })
        })
        .collect()
}

/// Load the open facts making up one logical row.
pub fn load_state(
    engine: &dyn ISqlEngine,
    entry: &CatalogEntry,
    owner: &SqlValue,
    valid: Option<Period>,
) -> SixnfResult<Option<LogicalRowState>> {
    let Some(root) = open_fact(engine, entry, FactTarget::Root, &entry.root_view, owner, valid)? else {
        return Ok(None);
    };
    let mut columns = Vec::with_capacity(entry.shadows.len());
    for shadow in &entry.shadows {
        let target = FactTarget::Column(shadow.column.clone());
        let fact = open_fact(engine, entry, target, &shadow.view, owner, valid)?;
        columns.push(ColumnState {
            column: shadow.column.clone(),
            value: fact.as_ref().map_or(SqlValue::Null, |f| f.value.clone()),
            fact,
        });
    }
    Ok(Some(LogicalRowState {
        owner: owner.clone(),
        valid,
        root,
        columns,
    }))
}

fn open_fact(
    engine: &dyn ISqlEngine,
    entry: &CatalogEntry,
    target: FactTarget,
    view: &str,
    owner: &SqlValue,
    valid: Option<Period>,
) -> SixnfResult<Option<Fact>> {
    let value = if matches!(target, FactTarget::Column(_)) {
        physical::VALUE
    } else {
        "NULL"
    };
    let mut sql = SqlBuilder::new();
    sql.push_str(&format!(
        "SELECT {}, {value}, {}, {}",
        physical::FACT_SEQ,
        physical::TRANSACTION_START,
        physical::TRANSACTION_END
    ));
    if entry.has_application_time() {
        sql.push_str(&format!(", {}, {}", physical::VALID_FROM, physical::VALID_TO));
    }
    sql.push_str(&format!(
        " FROM {} WHERE {} = ",
        physical::quote(view),
        physical::OWNER
    ));
    sql.push_value(owner.clone())?;
    sql.push_str(&format!(
        " AND {} = {}",
        physical::TRANSACTION_END,
        Timestamp::Infinity.sql_literal()
    ));
    if let Some(valid) = valid {
        sql.push_str(&format!(" AND {} = ", physical::VALID_FROM));
        sql.push_value(valid.start.to_value())?;
    }

    let bound = sql.finish();
    let rows = engine.query(&bound.sql, &bound.params)?;
    let Some(row) = rows.rows.first() else {
        return Ok(None);
    };
    let seq = row[0].as_integer().ok_or_else(|| StorageError::UnexpectedValue {
        context: view.to_string(),
        detail: format!("fact_seq {}", row[0]),
    })?;
    let valid = if row.len() > 4 {
        Some(Period::new(Timestamp::from_value(&row[4])?, Timestamp::from_value(&row[5])?)?)
    } else {
        None
    };
    Ok(Some(Fact {
        target,
        seq,
        owner: owner.clone(),
        value: row[1].clone(),
        transaction_start: Timestamp::from_value(&row[2])?,
        transaction_end: Timestamp::from_value(&row[3])?,
        valid,
    }))
}

/// `SELECT MAX(owner)` over the root log, for key allocation.
pub fn max_owner(engine: &dyn ISqlEngine, entry: &CatalogEntry) -> SixnfResult<i64> {
    let rows = engine.query(
        &format!(
            "SELECT MAX({}) FROM {}",
            physical::OWNER,
            physical::quote(&entry.root_table)
        ),
        &Params::None,
    )?;
    Ok(rows.scalar().and_then(SqlValue::as_integer).unwrap_or(0))
}

/// Evaluate a list of expressions as one row.
pub fn evaluate_row(
    engine: &dyn ISqlEngine,
    exprs: &[SqlFragment],
    params: &Params,
) -> SixnfResult<Vec<SqlValue>> {
    if exprs.is_empty() {
        return Ok(Vec::new());
    }
    let mut sql = SqlBuilder::new();
    sql.push_str("SELECT ");
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_fragment(expr, params)?;
    }
    let bound = sql.finish();
    let rows: ResultSet = engine.query(&bound.sql, &bound.params)?;
    Ok(rows.rows.into_iter().next().unwrap_or_default())
}
