use super::{StorageError, TemporalError};

/// Top-level error type for the sixnf engine.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum SixnfError {
    #[error("temporal error: {0}")]
    TemporalError(#[from] TemporalError),

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl From<rusqlite::Error> for SixnfError {
    fn from(e: rusqlite::Error) -> Self {
        SixnfError::StorageError(StorageError::Sqlite(e))
    }
}

impl SixnfError {
    /// The underlying SQLite error, if this error came straight from the engine.
    pub fn as_sqlite(&self) -> Option<&rusqlite::Error> {
        match self {
            SixnfError::StorageError(StorageError::Sqlite(e)) => Some(e),
            _ => None,
        }
    }
}

/// Convenience type alias.
pub type SixnfResult<T> = Result<T, SixnfError>;
