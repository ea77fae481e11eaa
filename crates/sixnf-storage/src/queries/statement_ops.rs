//! Generic statement execution with late-bound `SqlValue` parameters.

use rusqlite::{Connection, Statement};

use sixnf_core::errors::SixnfResult;
use sixnf_core::models::{ExecOutcome, Params, ResultSet, SqlValue};

/// Execute one statement, collecting rows when it produces columns.
pub fn execute(conn: &Connection, sql: &str, params: &Params) -> SixnfResult<ExecOutcome> {
    let mut stmt = conn.prepare(sql)?;
    bind(&mut stmt, params)?;
    if stmt.column_count() > 0 {
        return Ok(ExecOutcome::Rows(collect(&mut stmt)?));
    }
    let changed = stmt.raw_execute()?;
    Ok(ExecOutcome::Affected(changed))
}

/// Run a query and collect every row.
pub fn query(conn: &Connection, sql: &str, params: &Params) -> SixnfResult<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    bind(&mut stmt, params)?;
    collect(&mut stmt)
}

/// Bind `params` by position, or by name ignoring the `:`/`@`/`$` prefix.
fn bind(stmt: &mut Statement<'_>, params: &Params) -> SixnfResult<()> {
    let expected = stmt.parameter_count();
    match params {
        Params::None => {
            if expected > 0 {
                return Err(rusqlite::Error::InvalidParameterCount(0, expected).into());
            }
        }
        Params::Positional(values) => {
            if values.len() != expected {
                return Err(rusqlite::Error::InvalidParameterCount(values.len(), expected).into());
            }
            for (i, value) in values.iter().enumerate() {
                stmt.raw_bind_parameter(i + 1, value)?;
            }
        }
        Params::Named(values) => {
            for index in 1..=expected {
                let name = stmt
                    .parameter_name(index)
                    .map(str::to_owned)
                    .ok_or_else(|| rusqlite::Error::InvalidParameterName(format!("?{index}")))?;
                let bare = strip_prefix(&name);
                let value = values
                    .iter()
                    .find(|(n, _)| strip_prefix(n) == bare)
                    .map(|(_, v)| v)
                    .ok_or_else(|| rusqlite::Error::InvalidParameterName(name.clone()))?;
                stmt.raw_bind_parameter(index, value)?;
            }
        }
    }
    Ok(())
}

fn strip_prefix(name: &str) -> &str {
    name.trim_start_matches(&[':', '@', '$'][..])
}

fn collect(stmt: &mut Statement<'_>) -> SixnfResult<ResultSet> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(row.get::<_, SqlValue>(i)?);
        }
        rows.push(values);
    }
    Ok(ResultSet { columns, rows })
}
