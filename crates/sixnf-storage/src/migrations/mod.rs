//! Forward-only migration runner with version tracking, one transaction per migration.

mod v001_catalog_tables;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use sixnf_core::errors::{SixnfResult, StorageError};
use sixnf_core::SixnfError;

/// Total number of migrations.
pub const LATEST_VERSION: u32 = 1;

type MigrationFn = fn(&Connection) -> SixnfResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 1] =
    [(1, "catalog_tables", v001_catalog_tables::migrate)];

/// Get the current schema version from the database.
/// Returns 0 if the version table doesn't exist yet.
pub fn current_version(conn: &Connection) -> SixnfResult<u32> {
    let exists: bool = conn
        .prepare(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='sixnf_schema_version'",
        )
        .and_then(|mut stmt| stmt.exists([]))?;

    if !exists {
        return Ok(0);
    }

    let version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM sixnf_schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Run all pending migrations. Forward-only, each wrapped in a transaction.
pub fn run_migrations(conn: &Connection) -> SixnfResult<u32> {
    let current = current_version(conn)?;
    let mut applied = 0;

    if current >= LATEST_VERSION {
        debug!("catalog schema is up to date (v{current})");
        return Ok(0);
    }

    info!("running migrations: v{} → v{}", current, LATEST_VERSION);

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");

        conn.execute_batch("BEGIN IMMEDIATE")?;

        match migrate_fn(conn).and_then(|()| {
            conn.execute(
                "INSERT INTO sixnf_schema_version (version) VALUES (?1)",
                [version],
            )?;
            Ok(())
        }) {
            Ok(()) => {
                conn.execute_batch("COMMIT")?;
                info!("applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(SixnfError::StorageError(StorageError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                }));
            }
        }
    }

    info!("applied {applied} migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}
