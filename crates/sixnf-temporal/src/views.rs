//! Physical DDL and logical-row reconstruction SQL.
//!
//! Each physical table is an append-only log. Its `_facts` view collapses a
//! fact and its closure rows into one resolved fact (the minimum
//! `transaction_end` wins). Logical rows are rebuilt from root facts with one
//! correlated subquery per shadow column.

use sixnf_core::models::{physical, CatalogEntry};

use crate::translator::SystemTimeFilter;

/// DDL creating one physical log table, its fact index and its resolving view.
pub fn physical_table_ddl(
    entry: &CatalogEntry,
    table: &str,
    view: &str,
    value_type: Option<&str>,
) -> Vec<String> {
    let valid = entry.has_application_time();
    let mut columns = vec![
        format!("{} INTEGER PRIMARY KEY", physical::FACT_SEQ),
        format!("{} {} NOT NULL", physical::OWNER, entry.key.owner_type()),
    ];
    if let Some(value_type) = value_type {
        columns.push(format!("{} {}", physical::VALUE, value_type));
    }
    columns.push(format!("{} TEXT NOT NULL", physical::TRANSACTION_START));
    columns.push(format!("{} TEXT NOT NULL", physical::TRANSACTION_END));
    if valid {
        columns.push(format!("{} TEXT NOT NULL", physical::VALID_FROM));
        columns.push(format!("{} TEXT NOT NULL", physical::VALID_TO));
    }
    columns.push(format!(
        "CHECK ({} < {})",
        physical::TRANSACTION_START,
        physical::TRANSACTION_END
    ));
    if valid {
        columns.push(format!("CHECK ({} < {})", physical::VALID_FROM, physical::VALID_TO));
    }

    let identity = fact_identity(valid);
    let mut index_columns = identity.clone();
    index_columns.push(physical::TRANSACTION_END);

    let mut resolved = vec![
        format!("MIN({0}) AS {0}", physical::FACT_SEQ),
        physical::OWNER.to_string(),
    ];
    if value_type.is_some() {
        resolved.push(physical::VALUE.to_string());
    }
    resolved.push(physical::TRANSACTION_START.to_string());
    resolved.push(format!("MIN({0}) AS {0}", physical::TRANSACTION_END));
    if valid {
        resolved.push(physical::VALID_FROM.to_string());
        resolved.push(physical::VALID_TO.to_string());
    }

    vec![
        format!(
            "CREATE TABLE {} (\n    {}\n)",
            physical::quote(table),
            columns.join(",\n    ")
        ),
        format!(
            "CREATE UNIQUE INDEX {} ON {} ({})",
            physical::quote(&format!("{table}_fact")),
            physical::quote(table),
            index_columns.join(", ")
        ),
        format!(
            "CREATE INDEX {} ON {} ({}, {})",
            physical::quote(&format!("{table}_open")),
            physical::quote(table),
            physical::OWNER,
            physical::TRANSACTION_END
        ),
        format!(
            "CREATE VIEW {} AS SELECT {} FROM {} GROUP BY {}",
            physical::quote(view),
            resolved.join(", "),
            physical::quote(table),
            identity.join(", ")
        ),
    ]
}

/// Columns identifying one fact across its closure rows.
fn fact_identity(valid: bool) -> Vec<&'static str> {
    let mut identity = vec![physical::OWNER, physical::TRANSACTION_START];
    if valid {
        identity.push(physical::VALID_FROM);
    }
    identity
}

/// The full physical layout of a table, root first, then the logical view.
pub fn layout_ddl(entry: &CatalogEntry) -> Vec<String> {
    let mut statements = physical_table_ddl(entry, &entry.root_table, &entry.root_view, None);
    for shadow in &entry.shadows {
        statements.extend(physical_table_ddl(
            entry,
            &shadow.table,
            &shadow.view,
            Some(&shadow.declared_type),
        ));
    }
    statements.push(format!(
        "CREATE VIEW {} AS {}",
        physical::quote(entry.name()),
        reconstruction_sql(entry, &SystemTimeFilter::Current, false)
    ));
    statements
}

/// SQL producing logical rows as of `filter`.
///
/// Columns come out under their logical names in declaration order. The key
/// is exposed as its declared column; the primary application period and any
/// declared system period columns map to the physical period columns.
/// `hidden_owner` adds the owner as `sixnf_owner` in front, which the write
/// pipeline needs for tables with synthetic keys.
pub fn reconstruction_sql(entry: &CatalogEntry, filter: &SystemTimeFilter, hidden_owner: bool) -> String {
    let root = "r";
    let valid_period = entry.valid_period();
    let system_period = entry.table.system_period();

    let mut select = Vec::new();
    if hidden_owner {
        select.push(format!(
            "{root}.{} AS {}",
            physical::OWNER,
            physical::quote(physical::HIDDEN_OWNER)
        ));
    }

    for column in &entry.table.columns {
        let alias = physical::quote(&column.name);
        let source = if entry.key.column().is_some_and(|k| column.is_named(k)) {
            format!("{root}.{}", physical::OWNER)
        } else if let Some(shadow) = entry.shadow(&column.name) {
            column_subquery(entry, &shadow.view, root, filter)
        } else if let Some(p) = valid_period.filter(|p| p.covers_column(&column.name)) {
            let physical_column = if p.start_column.eq_ignore_ascii_case(&column.name) {
                physical::VALID_FROM
            } else {
                physical::VALID_TO
            };
            format!("{root}.{physical_column}")
        } else if let Some(p) = system_period.filter(|p| p.covers_column(&column.name)) {
            let physical_column = if p.start_column.eq_ignore_ascii_case(&column.name) {
                physical::TRANSACTION_START
            } else {
                physical::TRANSACTION_END
            };
            format!("{root}.{physical_column}")
        } else {
            // Generated boundary columns outside any period.
            "NULL".to_string()
        };
        select.push(format!("{source} AS {alias}"));
    }

    format!(
        "SELECT {} FROM {} AS {root} WHERE {}",
        select.join(", "),
        physical::quote(&entry.root_view),
        filter.predicate(
            &format!("{root}.{}", physical::TRANSACTION_START),
            &format!("{root}.{}", physical::TRANSACTION_END)
        )
    )
}

fn column_subquery(entry: &CatalogEntry, view: &str, root: &str, filter: &SystemTimeFilter) -> String {
    let shadow = "s";
    let mut conditions = vec![format!("{shadow}.{0} = {root}.{0}", physical::OWNER)];
    if entry.has_application_time() {
        conditions.push(format!("{shadow}.{0} = {root}.{0}", physical::VALID_FROM));
    }
    conditions.push(filter.predicate(
        &format!("{shadow}.{}", physical::TRANSACTION_START),
        &format!("{shadow}.{}", physical::TRANSACTION_END),
    ));

    let mut order = String::new();
    if filter.is_range() {
        // Only versions recorded while the root fact was current belong to it.
        conditions.push(format!(
            "{shadow}.{start} < {root}.{end} AND {shadow}.{end} > {root}.{start}",
            start = physical::TRANSACTION_START,
            end = physical::TRANSACTION_END
        ));
        order = format!(" ORDER BY {shadow}.{} DESC LIMIT 1", physical::TRANSACTION_START);
    }

    format!(
        "(SELECT {shadow}.{} FROM {} AS {shadow} WHERE {}{order})",
        physical::VALUE,
        physical::quote(view),
        conditions.join(" AND ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixnf_core::models::{ColumnDef, KeyDef, LogicalTable, PeriodDef, PeriodKind, Timestamp};

    fn entry() -> CatalogEntry {
        let table = LogicalTable {
            name: "emp".to_string(),
            columns: vec![
                ColumnDef::new("id", "INTEGER"),
                ColumnDef::new("name", "TEXT"),
                ColumnDef::new("vs", "TEXT"),
                ColumnDef::new("ve", "TEXT"),
            ],
            periods: vec![PeriodDef {
                name: "valid".to_string(),
                start_column: "vs".to_string(),
                end_column: "ve".to_string(),
                kind: PeriodKind::Application,
            }],
            primary_key: Some(KeyDef {
                columns: vec!["id".to_string()],
                period: Some("valid".to_string()),
            }),
            foreign_keys: vec![],
            system_versioned: true,
        }
        .finalize()
        .unwrap();
        CatalogEntry::build(1, table, "")
    }

    #[test]
    fn layout_has_root_shadow_and_logical_view() {
        let ddl = layout_ddl(&entry());
        assert_eq!(ddl.len(), 9);
        assert!(ddl[0].starts_with("CREATE TABLE \"sixnf_1\""));
        assert!(ddl[0].contains("valid_from TEXT NOT NULL"));
        assert!(!ddl[0].contains("value"));
        assert!(ddl[4].contains("value TEXT"));
        assert!(ddl[3].ends_with("GROUP BY owner, transaction_start, valid_from"));
        assert!(ddl[8].starts_with("CREATE VIEW \"emp\" AS SELECT r.owner AS \"id\""));
    }

    #[test]
    fn range_filters_pick_latest_version() {
        let sql = reconstruction_sql(
            &entry(),
            &SystemTimeFilter::Between(
                Timestamp::parse("2020-01-01").unwrap(),
                Timestamp::parse("2021-01-01").unwrap(),
            ),
            true,
        );
        assert!(sql.starts_with("SELECT r.owner AS \"sixnf_owner\""));
        assert!(sql.contains("ORDER BY s.transaction_start DESC LIMIT 1"));
        assert!(sql.contains("r.valid_from AS \"vs\""));
    }
}
