mod catalog_entry;
mod fact;
mod intent;
mod logical_table;
mod outcome;
mod params;
mod period;
mod sql_value;
mod timestamp;

pub use catalog_entry::{physical, CatalogEntry, KeyLayout, ShadowTable, StoredTable};
pub use fact::{ColumnState, Fact, FactTarget, LogicalRowState, PhysicalOp};
pub use intent::{
    Assignment, CreateTableIntent, DeleteIntent, InsertIntent, InsertSource, ObjectName,
    PortionClause, SelectIntent, StatementIntent, TemporalClause, TransactionControl,
    UpdateIntent,
};
pub use logical_table::{
    Affinity, ColumnDef, ForeignKeyDef, KeyDef, LogicalTable, PeriodDef, PeriodKind, RowBoundary,
    SYSTEM_TIME,
};
pub use outcome::{ExecOutcome, ResultSet};
pub use params::{BoundSql, ParamRef, Params, SqlBuilder, SqlFragment};
pub use period::Period;
pub use sql_value::SqlValue;
pub use timestamp::{Timestamp, INFINITY_TEXT, TIMESTAMP_FORMAT};
