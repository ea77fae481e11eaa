//! Pure planning: logical row changes in, ordered physical operations out.
//!
//! Supersessions always precede appends so a retracted fact's identity can be
//! reused by its successor within the same transaction.

use sixnf_core::models::{
    CatalogEntry, Fact, FactTarget, LogicalRowState, Period, PhysicalOp, SqlValue, Timestamp,
};

/// A logical row to insert, after defaults and key allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    pub owner: SqlValue,
    pub valid: Option<Period>,
    /// One value per shadow column, in shadow order.
    pub values: Vec<(String, SqlValue)>,
}

/// A matched row and the values assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub state: LogicalRowState,
    pub assignments: Vec<(String, SqlValue)>,
}

impl RowChange {
    fn assigned(&self, column: &str) -> Option<&SqlValue> {
        self.assignments
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }
}

/// Ordered operations for one intent.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WritePlan {
    supersede: Vec<PhysicalOp>,
    append: Vec<PhysicalOp>,
}

impl WritePlan {
    pub fn ops(self) -> Vec<PhysicalOp> {
        let mut ops = self.supersede;
        ops.extend(self.append);
        ops
    }

    pub fn len(&self) -> usize {
        self.supersede.len() + self.append.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retire(&mut self, fact: &Fact, now: Timestamp, system_versioned: bool) {
        self.supersede.push(supersede(fact, now, system_versioned));
    }

    fn append(&mut self, target: FactTarget, owner: &SqlValue, value: SqlValue, now: Timestamp, valid: Option<Period>) {
        self.append.push(PhysicalOp::Append {
            target,
            owner: owner.clone(),
            value,
            transaction_start: now,
            valid,
        });
    }

    /// Append a root fact and one fact per column for a logical row version.
    fn append_row<'v>(
        &mut self,
        owner: &SqlValue,
        valid: Option<Period>,
        values: impl Iterator<Item = (&'v str, SqlValue)>,
        now: Timestamp,
    ) {
        self.append(FactTarget::Root, owner, SqlValue::Null, now, valid);
        for (column, value) in values {
            self.append(FactTarget::Column(column.to_string()), owner, value, now, valid);
        }
    }

    /// Retire the root fact and every column fact of a row.
    fn retire_row(&mut self, state: &LogicalRowState, now: Timestamp, system_versioned: bool) {
        self.retire(&state.root, now, system_versioned);
        for column in &state.columns {
            if let Some(fact) = &column.fact {
                self.retire(fact, now, system_versioned);
            }
        }
    }
}

/// How an open fact stops being current.
///
/// Facts written by the running transaction never become history, and tables
/// without system versioning keep no history at all.
pub fn supersede(fact: &Fact, now: Timestamp, system_versioned: bool) -> PhysicalOp {
    if !system_versioned || fact.transaction_start == now {
        PhysicalOp::Retract { fact: fact.clone() }
    } else {
        PhysicalOp::Close {
            fact: fact.clone(),
            at: now,
        }
    }
}

pub fn plan_insert(rows: &[NewRow], now: Timestamp) -> WritePlan {
    let mut plan = WritePlan::default();
    for row in rows {
        plan.append_row(
            &row.owner,
            row.valid,
            row.values.iter().map(|(c, v)| (c.as_str(), v.clone())),
            now,
        );
    }
    plan
}

pub fn plan_update(
    entry: &CatalogEntry,
    changes: &[RowChange],
    portion: Option<Period>,
    now: Timestamp,
) -> WritePlan {
    let versioned = entry.is_system_versioned();
    let mut plan = WritePlan::default();
    for change in changes {
        let state = &change.state;
        match (portion, state.valid) {
            (Some(portion), Some(valid)) => {
                plan.retire_row(state, now, versioned);
                for (piece, during) in split(valid, portion) {
                    let values = state.columns.iter().map(|c| {
                        let value = during
                            .then(|| change.assigned(&c.column).cloned())
                            .flatten()
                            .unwrap_or_else(|| c.value.clone());
                        (c.column.as_str(), value)
                    });
                    plan.append_row(&state.owner, Some(piece), values, now);
                }
            }
            _ => {
                for (column, value) in &change.assignments {
                    if let Some(fact) = state.column(column).and_then(|c| c.fact.as_ref()) {
                        plan.retire(fact, now, versioned);
                    }
                    plan.append(
                        FactTarget::Column(column.clone()),
                        &state.owner,
                        value.clone(),
                        now,
                        state.valid,
                    );
                }
            }
        }
    }
    plan
}

pub fn plan_delete(
    entry: &CatalogEntry,
    rows: &[LogicalRowState],
    portion: Option<Period>,
    now: Timestamp,
) -> WritePlan {
    let versioned = entry.is_system_versioned();
    let mut plan = WritePlan::default();
    for state in rows {
        plan.retire_row(state, now, versioned);
        if let (Some(portion), Some(valid)) = (portion, state.valid) {
            for (piece, during) in split(valid, portion) {
                if during {
                    continue;
                }
                let values = state
                    .columns
                    .iter()
                    .map(|c| (c.column.as_str(), c.value.clone()));
                plan.append_row(&state.owner, Some(piece), values, now);
            }
        }
    }
    plan
}

/// Split `valid` around `portion`: the pieces before, during and after, each
/// flagged with whether it lies inside the portion. Empty pieces are skipped.
pub fn split(valid: Period, portion: Period) -> Vec<(Period, bool)> {
    let mut pieces = Vec::with_capacity(3);
    let mut push = |start: Timestamp, end: Timestamp, during: bool| {
        if start < end {
            pieces.push((Period { start, end }, during));
        }
    };
    push(valid.start, valid.end.min(portion.start), false);
    push(valid.start.max(portion.start), valid.end.min(portion.end), true);
    push(valid.start.max(portion.end), valid.end, false);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_core::models::{ColumnDef, ColumnState, KeyDef, LogicalTable, PeriodDef, PeriodKind};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn period(s: &str, e: &str) -> Period {
        Period::new(ts(s), ts(e)).unwrap()
    }

    fn entry(system_versioned: bool) -> CatalogEntry {
        let table = LogicalTable {
            name: "prices".to_string(),
            columns: vec![
                ColumnDef::new("id", "INTEGER"),
                ColumnDef::new("price", "TEXT"),
                ColumnDef::new("vf", "TEXT"),
                ColumnDef::new("vt", "TEXT"),
            ],
            periods: vec![PeriodDef {
                name: "valid".to_string(),
                start_column: "vf".to_string(),
                end_column: "vt".to_string(),
                kind: PeriodKind::Application,
            }],
            primary_key: Some(KeyDef {
                columns: vec!["id".to_string()],
                period: Some("valid".to_string()),
            }),
            foreign_keys: vec![],
            system_versioned,
        }
        .finalize()
        .unwrap();
        CatalogEntry::build(7, table, "")
    }

    fn fact(target: FactTarget, value: SqlValue, start: &str, valid: Period) -> Fact {
        Fact {
            target,
            seq: 1,
            owner: SqlValue::Integer(1),
            value,
            transaction_start: ts(start),
            transaction_end: Timestamp::Infinity,
            valid: Some(valid),
        }
    }

    fn state(valid: Period) -> LogicalRowState {
        let a = SqlValue::text("A");
        LogicalRowState {
            owner: SqlValue::Integer(1),
            valid: Some(valid),
            root: fact(FactTarget::Root, SqlValue::Null, "2019-01-01", valid),
            columns: vec![ColumnState {
                column: "price".to_string(),
                value: a.clone(),
                fact: Some(fact(FactTarget::Column("price".to_string()), a, "2019-01-01", valid)),
            }],
        }
    }

    fn appended(plan: WritePlan) -> Vec<(FactTarget, SqlValue, Period)> {
        plan.ops()
            .into_iter()
            .filter_map(|op| match op {
                PhysicalOp::Append { target, value, valid, .. } => valid.map(|v| (target, value, v)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn portion_update_splits_into_three() {
        let now = ts("2023-06-01");
        let change = RowChange {
            state: state(period("2020-01-01", "2025-01-01")),
            assignments: vec![("price".to_string(), SqlValue::text("B"))],
        };
        let plan = plan_update(&entry(true), &[change], Some(period("2021-01-01", "2022-01-01")), now);
        let ops = plan.clone().ops();
        assert!(matches!(ops[0], PhysicalOp::Close { .. }));
        assert!(matches!(ops[1], PhysicalOp::Close { .. }));

        let price: Vec<_> = appended(plan)
            .into_iter()
            .filter(|(t, _, _)| *t != FactTarget::Root)
            .map(|(_, v, p)| (v, p))
            .collect();
        assert_eq!(
            price,
            vec![
                (SqlValue::text("A"), period("2020-01-01", "2021-01-01")),
                (SqlValue::text("B"), period("2021-01-01", "2022-01-01")),
                (SqlValue::text("A"), period("2022-01-01", "2025-01-01")),
            ]
        );
    }

    #[test]
    fn delete_portion_covering_everything_leaves_no_successor() {
        let now = ts("2023-06-01");
        let plan = plan_delete(
            &entry(true),
            &[state(period("2020-01-01", "2025-01-01"))],
            Some(period("2000-01-01", "2030-01-01")),
            now,
        );
        let ops = plan.ops();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, PhysicalOp::Close { at, .. } if *at == now)));
    }

    #[test]
    fn same_transaction_facts_are_retracted() {
        let now = ts("2019-01-01");
        let plan = plan_delete(&entry(true), &[state(period("2020-01-01", "2025-01-01"))], None, now);
        assert!(plan.ops().iter().all(|op| matches!(op, PhysicalOp::Retract { .. })));
    }

    #[test]
    fn unversioned_tables_never_close() {
        let change = RowChange {
            state: state(period("2020-01-01", "2025-01-01")),
            assignments: vec![("price".to_string(), SqlValue::text("C"))],
        };
        let ops = plan_update(&entry(false), &[change], None, ts("2024-01-01")).ops();
        assert!(matches!(ops[0], PhysicalOp::Retract { .. }));
        assert!(matches!(&ops[1], PhysicalOp::Append { value, .. } if *value == SqlValue::text("C")));
    }

    #[test]
    fn split_skips_empty_pieces() {
        let pieces = split(period("2020-01-01", "2021-01-01"), period("2020-01-01", "2030-01-01"));
        assert_eq!(pieces, vec![(period("2020-01-01", "2021-01-01"), true)]);
    }
}
