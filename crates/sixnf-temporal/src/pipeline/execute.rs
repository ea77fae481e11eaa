//! Physical operations rendered to SQL.

use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{
    physical, BoundSql, CatalogEntry, FactTarget, PhysicalOp, SqlBuilder, SqlValue, Timestamp,
};
use sixnf_core::traits::ISqlEngine;

/// The physical table an operation writes to.
fn table_for<'e>(entry: &'e CatalogEntry, target: &FactTarget) -> SixnfResult<&'e str> {
    match target {
        FactTarget::Root => Ok(&entry.root_table),
        FactTarget::Column(column) => entry
            .shadow(column)
            .map(|s| s.table.as_str())
            .ok_or_else(|| {
                TemporalError::UnknownColumn {
                    table: entry.name().to_string(),
                    column: column.clone(),
                }
                .into()
            }),
    }
}

/// Physical columns of a fact row, in insertion order.
fn fact_columns(entry: &CatalogEntry, target: &FactTarget) -> Vec<&'static str> {
    let mut columns = vec![physical::OWNER];
    if matches!(target, FactTarget::Column(_)) {
        columns.push(physical::VALUE);
    }
    columns.push(physical::TRANSACTION_START);
    columns.push(physical::TRANSACTION_END);
    if entry.has_application_time() {
        columns.push(physical::VALID_FROM);
        columns.push(physical::VALID_TO);
    }
    columns
}

pub fn render(entry: &CatalogEntry, op: &PhysicalOp) -> SixnfResult<BoundSql> {
    let table = physical::quote(table_for(entry, op.target())?);
    let columns = fact_columns(entry, op.target());
    let mut sql = SqlBuilder::new();

    match op {
        PhysicalOp::Append {
            target,
            owner,
            value,
            transaction_start,
            valid,
        } => {
            sql.push_str(&format!("INSERT INTO {table} ({}) VALUES (", columns.join(", ")));
            sql.push_value(owner.clone())?;
            if matches!(target, FactTarget::Column(_)) {
                sql.push_str(", ");
                sql.push_value(value.clone())?;
            }
            sql.push_str(", ");
            sql.push_value(transaction_start.to_value())?;
            sql.push_str(&format!(", {}", Timestamp::Infinity.sql_literal()));
            if let Some(valid) = valid {
                sql.push_str(", ");
                sql.push_value(valid.start.to_value())?;
                sql.push_str(", ");
                sql.push_value(valid.end.to_value())?;
            }
            sql.push_str(")");
        }
        PhysicalOp::Close { fact, at } => {
            sql.push_str(&format!("INSERT INTO {table} ({}) SELECT ", columns.join(", ")));
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                if *column == physical::TRANSACTION_END {
                    sql.push_value(at.to_value())?;
                } else {
                    sql.push_str(column);
                }
            }
            sql.push_str(&format!(" FROM {table} WHERE {} = ", physical::FACT_SEQ));
            sql.push_value(SqlValue::Integer(fact.seq))?;
        }
        PhysicalOp::Retract { fact } => {
            sql.push_str(&format!("DELETE FROM {table} WHERE {} = ", physical::OWNER));
            sql.push_value(fact.owner.clone())?;
            sql.push_str(&format!(" AND {} = ", physical::TRANSACTION_START));
            sql.push_value(fact.transaction_start.to_value())?;
            if let Some(valid) = fact.valid {
                sql.push_str(&format!(" AND {} = ", physical::VALID_FROM));
                sql.push_value(valid.start.to_value())?;
            }
        }
    }
    Ok(sql.finish())
}

/// Execute `ops` in order; returns the number of physical rows written or removed.
pub fn execute(engine: &dyn ISqlEngine, entry: &CatalogEntry, ops: &[PhysicalOp]) -> SixnfResult<usize> {
    let mut touched = 0;
    for op in ops {
        let bound = render(entry, op)?;
        touched += engine.execute(&bound.sql, &bound.params)?.affected().unwrap_or(0);
    }
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_core::models::{ColumnDef, Fact, LogicalTable, Params};

    fn entry() -> CatalogEntry {
        let table = LogicalTable {
            name: "notes".to_string(),
            columns: vec![ColumnDef::new("body", "TEXT")],
            periods: vec![],
            primary_key: None,
            foreign_keys: vec![],
            system_versioned: true,
        }
        .finalize()
        .unwrap();
        CatalogEntry::build(3, table, "")
    }

    fn fact() -> Fact {
        Fact {
            target: FactTarget::Column("body".to_string()),
            seq: 42,
            owner: SqlValue::Integer(1),
            value: SqlValue::text("x"),
            transaction_start: Timestamp::parse("2024-01-01").unwrap(),
            transaction_end: Timestamp::Infinity,
            valid: None,
        }
    }

    #[test]
    fn close_copies_the_fact_with_a_new_end() {
        let at = Timestamp::parse("2024-02-01").unwrap();
        let bound = render(&entry(), &PhysicalOp::Close { fact: fact(), at }).unwrap();
        assert_eq!(
            bound.sql,
            "INSERT INTO \"sixnf_3_1\" (owner, value, transaction_start, transaction_end) \
             SELECT owner, value, transaction_start, ? FROM \"sixnf_3_1\" WHERE fact_seq = ?"
        );
        assert_eq!(bound.params, Params::Positional(vec![at.to_value(), SqlValue::Integer(42)]));
    }

    #[test]
    fn retract_deletes_by_identity() {
        let bound = render(&entry(), &PhysicalOp::Retract { fact: fact() }).unwrap();
        assert_eq!(
            bound.sql,
            "DELETE FROM \"sixnf_3_1\" WHERE owner = ? AND transaction_start = ?"
        );
    }

    #[test]
    fn root_append_has_no_value_column() {
        let bound = render(
            &entry(),
            &PhysicalOp::Append {
                target: FactTarget::Root,
                owner: SqlValue::Integer(5),
                value: SqlValue::Null,
                transaction_start: Timestamp::parse("2024-01-01").unwrap(),
                valid: None,
            },
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "INSERT INTO \"sixnf_3\" (owner, transaction_start, transaction_end) \
             VALUES (?, ?, '9999-12-31 23:59:59.999')"
        );
    }
}
