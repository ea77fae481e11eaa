//! SQLite PRAGMA configuration.
//!
//! Must be called on every connection immediately after opening.

use rusqlite::Connection;

use sixnf_core::config::StorageConfig;
use sixnf_core::errors::SixnfResult;

/// Configure a connection from `config`.
///
/// - journal mode from config (WAL by default; in-memory databases report "memory")
/// - busy_timeout for lock contention
/// - foreign key enforcement for plain tables
pub fn configure_connection(conn: &Connection, config: &StorageConfig) -> SixnfResult<()> {
    let journal_mode = match config.journal_mode.to_ascii_uppercase().as_str() {
        mode @ ("WAL" | "DELETE" | "TRUNCATE" | "PERSIST" | "MEMORY" | "OFF") => mode.to_string(),
        other => {
            return Err(sixnf_core::SixnfError::ConfigError(format!(
                "unsupported journal_mode {other}"
            )))
        }
    };
    // journal_mode reports the resulting mode as a row.
    conn.pragma_update_and_check(None, "journal_mode", &journal_mode, |_| Ok(()))?;
    conn.execute_batch(&format!(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = {};
        PRAGMA busy_timeout = {};
        PRAGMA cache_size = -{};
        PRAGMA temp_store = MEMORY;
        ",
        if config.foreign_keys { "ON" } else { "OFF" },
        config.busy_timeout_ms,
        config.cache_size_kb,
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_connection_sets_busy_timeout() {
        let conn = Connection::open_in_memory().unwrap();
        let config = StorageConfig {
            busy_timeout_ms: 1234,
            ..StorageConfig::default()
        };
        configure_connection(&conn, &config).unwrap();

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 1234);
    }

    #[test]
    fn test_configure_connection_sets_wal() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, &StorageConfig::default()).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        // In-memory databases report "memory" instead of "wal"
        assert!(
            journal_mode == "wal" || journal_mode == "memory",
            "Expected wal or memory, got: {}",
            journal_mode
        );
    }

    #[test]
    fn test_unknown_journal_mode_is_a_config_error() {
        let conn = Connection::open_in_memory().unwrap();
        let config = StorageConfig {
            journal_mode: "sideways".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            configure_connection(&conn, &config),
            Err(sixnf_core::SixnfError::ConfigError(_))
        ));
    }
}
