use sixnf_core::config::{LoggingConfig, StorageConfig, TemporalConfig};
use sixnf_core::SixnfConfig;
use sixnf_core::observability::init_tracing;

#[test]
fn empty_toml_yields_defaults() {
    let config = SixnfConfig::from_toml("").unwrap();
    assert_eq!(config.storage.busy_timeout_ms, StorageConfig::default().busy_timeout_ms);
    assert!(config.temporal.enforce_period_overlap);
    assert_eq!(config.logging.filter, LoggingConfig::default().filter);
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = SixnfConfig::from_toml(
        r#"
        [storage]
        busy_timeout_ms = 250
        journal_mode = "DELETE"

        [temporal]
        enforce_foreign_key_periods = false
        catalog_cache_capacity = 16

        [logging]
        json = true
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.storage.journal_mode, "DELETE");
    assert!(config.storage.foreign_keys);
    assert!(!config.temporal.enforce_foreign_key_periods);
    assert!(config.temporal.intent_savepoints);
    assert_eq!(config.temporal.catalog_cache_capacity, 16);
    assert!(config.logging.json);
}

#[test]
fn invalid_toml_is_rejected() {
    assert!(SixnfConfig::from_toml("[storage\nbusy_timeout_ms = 1").is_err());
    assert!(SixnfConfig::from_toml("[temporal]\nintent_savepoints = \"yes\"").is_err());
}

#[test]
fn defaults_round_trip_through_toml() {
    let text = toml::to_string(&SixnfConfig::default()).unwrap();
    let back = SixnfConfig::from_toml(&text).unwrap();
    assert_eq!(
        back.temporal.catalog_cache_capacity,
        TemporalConfig::default().catalog_cache_capacity
    );
}

#[test]
fn tracing_installs_once() {
    let config = LoggingConfig {
        filter: "sixnf=debug".to_string(),
        json: false,
    };
    init_tracing(&config);
    assert!(!init_tracing(&config));
}
