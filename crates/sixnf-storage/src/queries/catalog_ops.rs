//! Raw SQL operations on the reserved catalog table.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use sixnf_core::errors::{SixnfResult, TemporalError};
use sixnf_core::models::{LogicalTable, StoredTable};

const SELECT_COLUMNS: &str = "SELECT id, definition, created_at FROM sixnf_table";

/// Load a registered table by name (case-insensitive).
pub fn load_table(conn: &Connection, name: &str) -> SixnfResult<Option<StoredTable>> {
    let raw = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE name = ?1"),
            params![name],
            raw_row,
        )
        .optional()?;
    raw.map(decode).transpose()
}

/// Insert a new table definition. Fails with `DuplicateTable` if the name is taken.
pub fn insert_table(conn: &Connection, table: &LogicalTable) -> SixnfResult<StoredTable> {
    let definition = serde_json::to_string(table)?;
    match conn.execute(
        "INSERT INTO sixnf_table (name, definition) VALUES (?1, ?2)",
        params![table.name, definition],
    ) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(TemporalError::DuplicateTable {
                table: table.name.clone(),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    let created_at: String = conn.query_row(
        "SELECT created_at FROM sixnf_table WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(StoredTable {
        id,
        table: table.clone(),
        created_at,
    })
}

/// All registered tables in registration order.
pub fn list_tables(conn: &Connection) -> SixnfResult<Vec<StoredTable>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
    let rows = stmt.query_map([], raw_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(decode(row?)?);
    }
    Ok(results)
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode((id, definition, created_at): (i64, String, String)) -> SixnfResult<StoredTable> {
    let table: LogicalTable = serde_json::from_str(&definition)?;
    Ok(StoredTable {
        id,
        table,
        created_at,
    })
}
