//! Statement results.

use super::SqlValue;

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// The first column of the first row.
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|r| r.first())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Rows(ResultSet),
    /// Number of logical rows inserted, updated or deleted.
    Affected(usize),
}

impl ExecOutcome {
    pub fn affected(&self) -> Option<usize> {
        match self {
            ExecOutcome::Affected(n) => Some(*n),
            ExecOutcome::Rows(_) => None,
        }
    }

    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows),
            ExecOutcome::Affected(_) => None,
        }
    }

    pub fn into_rows(self) -> ResultSet {
        match self {
            ExecOutcome::Rows(rows) => rows,
            ExecOutcome::Affected(_) => ResultSet::default(),
        }
    }
}
