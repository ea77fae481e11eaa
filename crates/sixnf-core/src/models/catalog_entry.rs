//! Catalog entries: the mapping from a logical table to its physical layout.

use serde::{Deserialize, Serialize};

use super::{LogicalTable, PeriodDef};

/// Physical naming shared by the normalizer, the write pipeline and the translator.
pub mod physical {
    /// Prefix of every reserved object.
    pub const PREFIX: &str = "sixnf_";
    pub const FACT_SEQ: &str = "fact_seq";
    pub const OWNER: &str = "owner";
    pub const VALUE: &str = "value";
    pub const TRANSACTION_START: &str = "transaction_start";
    pub const TRANSACTION_END: &str = "transaction_end";
    pub const VALID_FROM: &str = "valid_from";
    pub const VALID_TO: &str = "valid_to";
    /// Hidden owner column exposed by internal reconstruction queries.
    pub const HIDDEN_OWNER: &str = "sixnf_owner";

    pub fn root_table(id: i64) -> String {
        format!("{PREFIX}{id}")
    }

    pub fn shadow_table(id: i64, ordinal: usize) -> String {
        format!("{PREFIX}{id}_{ordinal}")
    }

    pub fn facts_view(table: &str) -> String {
        format!("{table}_facts")
    }

    pub fn legacy_table(id: i64) -> String {
        format!("{PREFIX}legacy_{id}")
    }

    /// Whether `name` is one of the engine's own objects.
    pub fn is_reserved(name: &str) -> bool {
        name.get(..PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX))
    }

    /// Quote an identifier for SQLite.
    pub fn quote(ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// How the owning key of a logical row is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyLayout {
    /// The single primary-key column is the owner.
    Column { name: String, declared_type: String },
    /// Owners are allocated by the engine (no key or a composite key).
    Synthetic,
}

impl KeyLayout {
    pub fn owner_type(&self) -> &str {
        match self {
            KeyLayout::Column { declared_type, .. } => declared_type,
            KeyLayout::Synthetic => "INTEGER",
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            KeyLayout::Column { name, .. } => Some(name),
            KeyLayout::Synthetic => None,
        }
    }
}

/// One per-column fact log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowTable {
    pub column: String,
    pub table: String,
    pub view: String,
    pub declared_type: String,
}

/// A registered table as persisted in the reserved catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTable {
    pub id: i64,
    pub table: LogicalTable,
    pub created_at: String,
}

/// Everything needed to rewrite statements against one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub table: LogicalTable,
    pub root_table: String,
    pub root_view: String,
    pub shadows: Vec<ShadowTable>,
    pub key: KeyLayout,
    pub created_at: String,
}

impl CatalogEntry {
    /// Derive the physical layout of `table` registered under `id`.
    pub fn build(id: i64, table: LogicalTable, created_at: impl Into<String>) -> Self {
        let root_table = physical::root_table(id);
        let root_view = physical::facts_view(&root_table);
        let shadows = table
            .value_columns()
            .enumerate()
            .map(|(i, column)| {
                let name = physical::shadow_table(id, i + 1);
                ShadowTable {
                    column: column.name.clone(),
                    view: physical::facts_view(&name),
                    table: name,
                    declared_type: column.declared_type.clone(),
                }
            })
            .collect();
        let key = match table.key_column() {
            Some(column) => KeyLayout::Column {
                name: column.name.clone(),
                declared_type: column.declared_type.clone(),
            },
            None => KeyLayout::Synthetic,
        };
        Self {
            id,
            table,
            root_table,
            root_view,
            shadows,
            key,
            created_at: created_at.into(),
        }
    }

    pub fn from_stored(stored: StoredTable) -> Self {
        Self::build(stored.id, stored.table, stored.created_at)
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }

    pub fn shadow(&self, column: &str) -> Option<&ShadowTable> {
        self.shadows
            .iter()
            .find(|s| s.column.eq_ignore_ascii_case(column))
    }

    pub fn is_system_versioned(&self) -> bool {
        self.table.system_versioned
    }

    /// The application period backing the physical ValidFrom/ValidTo columns.
    pub fn valid_period(&self) -> Option<&PeriodDef> {
        self.table.primary_application_period()
    }

    pub fn has_application_time(&self) -> bool {
        self.valid_period().is_some()
    }

    /// Every physical table with its resolving view, root first.
    pub fn physical_tables(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once((self.root_table.as_str(), self.root_view.as_str())).chain(
            self.shadows
                .iter()
                .map(|s| (s.table.as_str(), s.view.as_str())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDef, KeyDef, PeriodKind};

    #[test]
    fn layout_uses_ids_not_logical_names() {
        let table = LogicalTable {
            name: "Order Lines".to_string(),
            columns: vec![
                ColumnDef::new("order_id", "INTEGER"),
                ColumnDef::new("line", "INTEGER"),
                ColumnDef::new("qty", "REAL"),
            ],
            periods: vec![PeriodDef {
                name: "SYSTEM_TIME".to_string(),
                start_column: "transaction_start".to_string(),
                end_column: "transaction_end".to_string(),
                kind: PeriodKind::System,
            }],
            primary_key: Some(KeyDef {
                columns: vec!["order_id".to_string(), "line".to_string()],
                period: None,
            }),
            foreign_keys: vec![],
            system_versioned: true,
        };
        let entry = CatalogEntry::build(7, table, "2024-01-01 00:00:00.000");
        assert_eq!(entry.root_table, "sixnf_7");
        assert_eq!(entry.root_view, "sixnf_7_facts");
        assert_eq!(entry.key, KeyLayout::Synthetic);
        let shadows: Vec<_> = entry.shadows.iter().map(|s| s.table.as_str()).collect();
        assert_eq!(shadows, vec!["sixnf_7_1", "sixnf_7_2", "sixnf_7_3"]);
        assert_eq!(entry.shadow("QTY").unwrap().view, "sixnf_7_3_facts");
        assert_eq!(entry.physical_tables().count(), 4);
    }

    #[test]
    fn reserved_names() {
        assert!(physical::is_reserved("SIXNF_3_1"));
        assert!(!physical::is_reserved("six"));
        assert_eq!(physical::quote("a\"b"), "\"a\"\"b\"");
    }
}
