/// Temporal subsystem errors.
///
/// Raised during intent validation or catalog resolution. None of these is
/// raised after a physical write of the failing intent has executed.
#[derive(Debug, thiserror::Error)]
pub enum TemporalError {
    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    #[error("unknown period {period} on table {table}")]
    UnknownPeriod { table: String, period: String },

    #[error("unknown column {column} on table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("table already registered: {table}")]
    DuplicateTable { table: String },

    #[error("period overlap on {table} for key {key}: [{start}, {end}) overlaps an existing row")]
    PeriodOverlap {
        table: String,
        key: String,
        start: String,
        end: String,
    },

    #[error("type mismatch on {table}.{column}: {detail}")]
    TypeMismatch {
        table: String,
        column: String,
        detail: String,
    },

    #[error("duplicate key on {table}: {key} already has a current row")]
    DuplicateKey { table: String, key: String },

    #[error("column {column} on {table} cannot be assigned: {reason}")]
    ImmutableColumn {
        table: String,
        column: String,
        reason: String,
    },

    #[error("foreign key period violation: {table}.{column} = {key} over [{start}, {end}) is not covered by {referenced}")]
    ForeignKeyPeriod {
        table: String,
        column: String,
        key: String,
        start: String,
        end: String,
        referenced: String,
    },

    #[error("invalid period bounds: {0}")]
    InvalidPeriodBounds(String),

    #[error("FOR PORTION OF {period} is not supported on {table}: {reason}")]
    UnsupportedPortion {
        table: String,
        period: String,
        reason: String,
    },

    #[error("parameter mismatch: {0}")]
    ParameterMismatch(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
