pub mod logging_config;
pub mod storage_config;
pub mod temporal_config;

use serde::{Deserialize, Serialize};

pub use logging_config::LoggingConfig;
pub use storage_config::StorageConfig;
pub use temporal_config::TemporalConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SixnfConfig {
    pub storage: StorageConfig,
    pub temporal: TemporalConfig,
    pub logging: LoggingConfig,
}

impl SixnfConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
