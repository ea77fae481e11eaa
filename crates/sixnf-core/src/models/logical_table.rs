//! Logical (user-visible) table definitions.

use serde::{Deserialize, Serialize};

use crate::errors::TemporalError;

use super::SqlValue;

/// Reserved name of the system-time period.
pub const SYSTEM_TIME: &str = "SYSTEM_TIME";

/// Default column names for a system period declared only via `WITH SYSTEM VERSIONING`.
const DEFAULT_SYSTEM_START: &str = "transaction_start";
const DEFAULT_SYSTEM_END: &str = "transaction_end";

/// `GENERATED ALWAYS AS ROW START|END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowBoundary {
    Start,
    End,
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Declared type text, possibly empty (SQLite allows untyped columns).
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    /// `DEFAULT` expression text, evaluated when an INSERT omits the column.
    pub default_sql: Option<String>,
    pub generated: Option<RowBoundary>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            not_null: false,
            primary_key: false,
            default_sql: None,
            generated: None,
        }
    }

    pub fn affinity(&self) -> Affinity {
        Affinity::of(&self.declared_type)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// SQLite type affinity derived from a declared type (SQLite §3.1 rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    pub fn of(declared_type: &str) -> Self {
        let t = declared_type.to_ascii_uppercase();
        if t.contains("INT") {
            Affinity::Integer
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            Affinity::Text
        } else if t.contains("BLOB") || t.trim().is_empty() {
            Affinity::Blob
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }

    /// Whether the engine would store `value` in a column of this affinity without
    /// silently keeping a value of an incompatible class.
    pub fn accepts(self, value: &SqlValue) -> bool {
        match (self, value) {
            (_, SqlValue::Null) | (Affinity::Blob, _) => true,
            (Affinity::Integer, SqlValue::Integer(_)) => true,
            (Affinity::Integer, SqlValue::Real(r)) => r.fract() == 0.0,
            (Affinity::Integer, SqlValue::Text(s)) => s.trim().parse::<i64>().is_ok(),
            (Affinity::Real | Affinity::Numeric, SqlValue::Integer(_) | SqlValue::Real(_)) => true,
            (Affinity::Real | Affinity::Numeric, SqlValue::Text(s)) => s.trim().parse::<f64>().is_ok(),
            (Affinity::Text, SqlValue::Text(_) | SqlValue::Integer(_) | SqlValue::Real(_)) => true,
            (_, SqlValue::Blob(_)) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    System,
    Application,
}

/// `PERIOD FOR name (start_column, end_column)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDef {
    pub name: String,
    pub start_column: String,
    pub end_column: String,
    pub kind: PeriodKind,
}

impl PeriodDef {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn covers_column(&self, column: &str) -> bool {
        self.start_column.eq_ignore_ascii_case(column) || self.end_column.eq_ignore_ascii_case(column)
    }
}

/// `PRIMARY KEY (cols [, period WITHOUT OVERLAPS])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDef {
    pub columns: Vec<String>,
    pub period: Option<String>,
}

/// `FOREIGN KEY (cols [, PERIOD p]) REFERENCES table (cols [, PERIOD q])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub period: Option<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub referenced_period: Option<String>,
}

/// A temporal table as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub periods: Vec<PeriodDef>,
    pub primary_key: Option<KeyDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub system_versioned: bool,
}

impl LogicalTable {
    /// Complete and check a freshly declared table.
    ///
    /// A versioned table without `PERIOD FOR SYSTEM_TIME` gets a default system
    /// period; a declared system period implies versioning.
    pub fn finalize(mut self) -> Result<Self, TemporalError> {
        if self.system_period().is_none() {
            let generated = |boundary: RowBoundary| {
                self.columns
                    .iter()
                    .find(|c| c.generated == Some(boundary))
                    .map(|c| c.name.clone())
            };
            if let (Some(start_column), Some(end_column)) =
                (generated(RowBoundary::Start), generated(RowBoundary::End))
            {
                self.periods.push(PeriodDef {
                    name: SYSTEM_TIME.to_string(),
                    start_column,
                    end_column,
                    kind: PeriodKind::System,
                });
            }
        }
        if self.system_period().is_some() {
            self.system_versioned = true;
        } else if self.system_versioned {
            self.periods.push(PeriodDef {
                name: SYSTEM_TIME.to_string(),
                start_column: DEFAULT_SYSTEM_START.to_string(),
                end_column: DEFAULT_SYSTEM_END.to_string(),
                kind: PeriodKind::System,
            });
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), TemporalError> {
        let unknown_column = |column: &str| TemporalError::UnknownColumn {
            table: self.name.clone(),
            column: column.to_string(),
        };
        let unknown_period = |period: &str| TemporalError::UnknownPeriod {
            table: self.name.clone(),
            period: period.to_string(),
        };

        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.is_named(&column.name)) {
                return Err(TemporalError::TypeMismatch {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    detail: "column declared twice".to_string(),
                });
            }
        }
        for (i, period) in self.periods.iter().enumerate() {
            if self.periods[..i].iter().any(|p| p.is_named(&period.name)) {
                return Err(TemporalError::InvalidPeriodBounds(format!(
                    "period {} declared twice",
                    period.name
                )));
            }
            if period.start_column.eq_ignore_ascii_case(&period.end_column) {
                return Err(TemporalError::InvalidPeriodBounds(format!(
                    "period {} uses {} as both start and end",
                    period.name, period.start_column
                )));
            }
            // Application periods must be backed by declared columns; the system
            // period may be implicit.
            if period.kind == PeriodKind::Application {
                for col in [&period.start_column, &period.end_column] {
                    if self.column(col).is_none() {
                        return Err(unknown_column(col));
                    }
                }
            }
        }
        if let Some(pk) = &self.primary_key {
            for col in &pk.columns {
                if self.column(col).is_none() {
                    return Err(unknown_column(col));
                }
            }
            if let Some(p) = &pk.period {
                if self.application_period(p).is_none() {
                    return Err(unknown_period(p));
                }
            }
        }
        for fk in &self.foreign_keys {
            for col in &fk.columns {
                if self.column(col).is_none() {
                    return Err(unknown_column(col));
                }
            }
            if let Some(p) = &fk.period {
                if self.application_period(p).is_none() {
                    return Err(unknown_period(p));
                }
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    pub fn period(&self, name: &str) -> Option<&PeriodDef> {
        self.periods.iter().find(|p| p.is_named(name))
    }

    pub fn system_period(&self) -> Option<&PeriodDef> {
        self.periods.iter().find(|p| p.kind == PeriodKind::System)
    }

    pub fn application_period(&self, name: &str) -> Option<&PeriodDef> {
        self.periods
            .iter()
            .find(|p| p.kind == PeriodKind::Application && p.is_named(name))
    }

    pub fn application_periods(&self) -> impl Iterator<Item = &PeriodDef> {
        self.periods.iter().filter(|p| p.kind == PeriodKind::Application)
    }

    /// The application period stored physically as ValidFrom/ValidTo: the one
    /// named in `PRIMARY KEY ... WITHOUT OVERLAPS`, else the first declared.
    pub fn primary_application_period(&self) -> Option<&PeriodDef> {
        self.primary_key
            .as_ref()
            .and_then(|pk| pk.period.as_deref())
            .and_then(|name| self.application_period(name))
            .or_else(|| self.application_periods().next())
    }

    /// The single key column, if the table declares a one-column primary key.
    pub fn key_column(&self) -> Option<&ColumnDef> {
        if let Some(pk) = &self.primary_key {
            if pk.columns.len() == 1 {
                return self.column(&pk.columns[0]);
            }
            return None;
        }
        let mut flagged = self.columns.iter().filter(|c| c.primary_key);
        match (flagged.next(), flagged.next()) {
            (Some(col), None) => Some(col),
            _ => None,
        }
    }

    /// Columns stored as per-column shadow tables: everything except the key,
    /// the system period columns and the primary application period columns.
    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        let key = self.key_column().map(|c| c.name.clone());
        let system = self.system_period().cloned();
        let application = self.primary_application_period().cloned();
        self.columns.iter().filter(move |c| {
            key.as_deref().map_or(true, |k| !c.is_named(k))
                && c.generated.is_none()
                && system.as_ref().map_or(true, |p| !p.covers_column(&c.name))
                && application.as_ref().map_or(true, |p| !p.covers_column(&c.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employees() -> LogicalTable {
        LogicalTable {
            name: "employees".to_string(),
            columns: vec![
                ColumnDef { primary_key: true, ..ColumnDef::new("id", "INTEGER") },
                ColumnDef::new("name", "TEXT"),
                ColumnDef::new("valid_start", "TEXT"),
                ColumnDef::new("valid_end", "TEXT"),
            ],
            periods: vec![PeriodDef {
                name: "valid".to_string(),
                start_column: "valid_start".to_string(),
                end_column: "valid_end".to_string(),
                kind: PeriodKind::Application,
            }],
            primary_key: None,
            foreign_keys: vec![],
            system_versioned: true,
        }
    }

    #[test]
    fn finalize_adds_default_system_period() {
        let table = employees().finalize().unwrap();
        let sys = table.system_period().unwrap();
        assert_eq!(sys.name, SYSTEM_TIME);
        assert_eq!(sys.start_column, "transaction_start");
    }

    #[test]
    fn value_columns_exclude_key_and_period_columns() {
        let table = employees().finalize().unwrap();
        let names: Vec<_> = table.value_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name"]);
        assert_eq!(table.key_column().unwrap().name, "id");
    }

    #[test]
    fn period_on_undeclared_column_is_rejected() {
        let mut table = employees();
        table.periods[0].end_column = "missing".to_string();
        assert!(matches!(
            table.finalize(),
            Err(TemporalError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn affinity_rules() {
        assert_eq!(Affinity::of("BIGINT"), Affinity::Integer);
        assert_eq!(Affinity::of("varchar(20)"), Affinity::Text);
        assert_eq!(Affinity::of(""), Affinity::Blob);
        assert_eq!(Affinity::of("DOUBLE PRECISION"), Affinity::Real);
        assert_eq!(Affinity::of("DECIMAL(10,2)"), Affinity::Numeric);
        assert!(!Affinity::Integer.accepts(&SqlValue::text("abc")));
        assert!(Affinity::Integer.accepts(&SqlValue::text("42")));
        assert!(Affinity::Text.accepts(&SqlValue::Integer(1)));
        assert!(!Affinity::Text.accepts(&SqlValue::Blob(vec![1])));
    }
}
