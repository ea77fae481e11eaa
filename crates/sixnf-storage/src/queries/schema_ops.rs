//! Schema introspection.

use rusqlite::{params, Connection};

use sixnf_core::errors::SixnfResult;
use sixnf_core::traits::ColumnInfo;

/// Columns of `table` in declaration order; empty if no such table.
pub fn table_columns(conn: &Connection, table: &str) -> SixnfResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            not_null: row.get::<_, i64>(2)? != 0,
            default_sql: row.get(3)?,
            primary_key_position: row.get(4)?,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// Ordinary tables, excluding SQLite internals and the engine's reserved objects.
pub fn list_user_tables(conn: &Connection) -> SixnfResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table'
           AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
           AND name NOT LIKE 'sixnf\\_%' ESCAPE '\\'
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Whether a table or view named `name` exists.
pub fn object_exists(conn: &Connection, name: &str) -> SixnfResult<bool> {
    let exists = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE name = ?1 COLLATE NOCASE")?
        .exists(params![name])?;
    Ok(exists)
}
