//! Shadow facts and the physical operations over them.

use super::{Period, SqlValue, Timestamp};

/// Which physical table of a logical table a fact lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactTarget {
    Root,
    Column(String),
}

/// One resolved fact, as read through a `_facts` view.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub target: FactTarget,
    /// Sequence number of the row that first recorded the fact.
    pub seq: i64,
    pub owner: SqlValue,
    /// Always `Null` for root facts.
    pub value: SqlValue,
    pub transaction_start: Timestamp,
    pub transaction_end: Timestamp,
    pub valid: Option<Period>,
}

impl Fact {
    pub fn is_open(&self) -> bool {
        self.transaction_end.is_infinity()
    }
}

/// An append-only operation on the physical tables.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalOp {
    /// Record a new open fact.
    Append {
        target: FactTarget,
        owner: SqlValue,
        value: SqlValue,
        transaction_start: Timestamp,
        valid: Option<Period>,
    },
    /// Record that `fact` stopped being current at `at`.
    Close { fact: Fact, at: Timestamp },
    /// Physically remove a fact that never became history.
    Retract { fact: Fact },
}

impl PhysicalOp {
    pub fn target(&self) -> &FactTarget {
        match self {
            PhysicalOp::Append { target, .. } => target,
            PhysicalOp::Close { fact, .. } | PhysicalOp::Retract { fact } => &fact.target,
        }
    }
}

/// Current value of one column of a logical row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnState {
    pub column: String,
    pub value: SqlValue,
    pub fact: Option<Fact>,
}

/// A current logical row with the facts that make it up.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalRowState {
    pub owner: SqlValue,
    pub valid: Option<Period>,
    pub root: Fact,
    pub columns: Vec<ColumnState>,
}

impl LogicalRowState {
    pub fn column(&self, name: &str) -> Option<&ColumnState> {
        self.columns
            .iter()
            .find(|c| c.column.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, name: &str) -> Option<&SqlValue> {
        self.column(name).map(|c| &c.value)
    }
}
