//! Storage subsystem configuration.

use serde::{Deserialize, Serialize};

/// SQLite connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. `None` opens an in-memory database.
    pub db_path: Option<String>,
    pub busy_timeout_ms: u32,
    /// Page cache size in KiB (applied as a negative `cache_size`).
    pub cache_size_kb: u32,
    pub journal_mode: String,
    pub foreign_keys: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: 5000,
            cache_size_kb: 8000,
            journal_mode: "WAL".to_string(),
            foreign_keys: true,
        }
    }
}
