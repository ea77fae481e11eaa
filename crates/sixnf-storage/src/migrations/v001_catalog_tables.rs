//! v001: reserved catalog tables.
//!
//! `sixnf_table` holds one row per registered logical table with its
//! definition serialized as JSON. Names compare case-insensitively, matching
//! SQLite identifier semantics.

use rusqlite::Connection;

use sixnf_core::errors::SixnfResult;

pub fn migrate(conn: &Connection) -> SixnfResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sixnf_schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE TABLE IF NOT EXISTS sixnf_table (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            definition TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );
        ",
    )?;
    Ok(())
}
