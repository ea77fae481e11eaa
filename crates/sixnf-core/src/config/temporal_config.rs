//! Temporal subsystem configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the rewriting engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Tables converted by `normalize_existing_table` keep system-time history.
    pub normalize_with_system_versioning: bool,

    /// Copy the current rows of a converted table into its shadow tables.
    pub backfill_on_normalize: bool,

    /// Reject writes that leave two open application periods overlapping for one key.
    pub enforce_period_overlap: bool,

    /// Check `FOREIGN KEY (.., PERIOD p)` coverage on every write.
    pub enforce_foreign_key_periods: bool,

    /// Wrap each intent's physical operations in a savepoint.
    pub intent_savepoints: bool,

    /// Number of catalog entries kept in memory.
    pub catalog_cache_capacity: u64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            normalize_with_system_versioning: true,
            backfill_on_normalize: true,
            enforce_period_overlap: true,
            enforce_foreign_key_periods: true,
            intent_savepoints: true,
            catalog_cache_capacity: 1024,
        }
    }
}
