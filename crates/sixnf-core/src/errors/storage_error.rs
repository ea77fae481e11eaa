/// Storage subsystem errors.
///
/// Engine errors are carried as-is so callers observe exactly what SQLite reported.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("connection lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("unexpected value in {context}: {detail}")]
    UnexpectedValue { context: String, detail: String },
}
