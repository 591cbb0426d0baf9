//! Query Execution
//!
//! Executes one rendered statement against a pooled connection with the
//! validated bind map, under the deployment row ceiling.
//!
//! # Binding
//! The prepared statement is the source of truth for what gets bound: every
//! named parameter the statement declares is looked up in the bind map and
//! bound by index. A statement token with no bind-map entry is an error
//! (the schema does not declare it), while bind-map entries the rendered
//! statement no longer references are skipped (their blocks were stripped).
//! Positional `?` parameters are rejected; stored SQL uses named binds.
//!
//! # Row ceiling
//! At most `min(requested_limit, hard_limit)` rows are fetched. The hard
//! limit is deployment-wide; no caller-requested value can exceed it.

use rusqlite::types::Value as SqlValue;
use rusqlite::Row as SqliteRow;

use crate::db::ConnectionPool;
use crate::error::{DocketError, Result};
use crate::validate::{BindMap, BindValue};

/// One result row: column name to JSON value, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Execute `sql` with the bind map, fetching at most
/// `min(requested_limit, hard_limit)` rows
pub async fn execute(
    pool: &ConnectionPool,
    sql: &str,
    bind: &BindMap,
    requested_limit: usize,
    hard_limit: usize,
) -> Result<Vec<Row>> {
    let limit = requested_limit.min(hard_limit);
    let conn = pool.acquire().await;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| DocketError::execution(format!("Failed to prepare query: {e}")))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

    for idx in 1..=stmt.parameter_count() {
        // Bare `?` has no name; numbered `?1` does, but is still positional
        let name = match stmt.parameter_name(idx) {
            Some(token) if !token.starts_with('?') => {
                token.trim_start_matches([':', '@', '$']).to_string()
            }
            _ => {
                return Err(DocketError::execution(
                    "Positional parameters are not supported; use named binds".to_string(),
                ));
            }
        };

        let value = bind.get(&name).ok_or_else(|| {
            DocketError::execution(format!("No value supplied for bind variable ':{name}'"))
        })?;

        stmt.raw_bind_parameter(idx, bind_value_to_sql(value)).map_err(|e| {
            DocketError::execution(format!("Failed to bind parameter ':{name}': {e}"))
        })?;
    }

    let mut rows = stmt.raw_query();
    let mut out: Vec<Row> = Vec::new();

    while out.len() < limit {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => {
                return Err(DocketError::execution(format!("Failed to fetch row: {e}")));
            }
        };
        out.push(row_to_json(&columns, row)?);
    }

    Ok(out)
}

/// Convert a bind value to the driver's owned value type
///
/// Dates and timestamps bind as ISO-formatted TEXT, which `SQLite`'s date
/// functions and ordinary string comparison both handle.
fn bind_value_to_sql(value: &BindValue) -> SqlValue {
    match value {
        BindValue::Null => SqlValue::Null,
        BindValue::Integer(i) => SqlValue::Integer(*i),
        BindValue::Float(f) => SqlValue::Real(*f),
        BindValue::Text(s) => SqlValue::Text(s.clone()),
        BindValue::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        BindValue::Timestamp(t) => SqlValue::Text(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
    }
}

/// Materialize one driver row as an ordered name-to-value map
fn row_to_json(columns: &[String], row: &SqliteRow<'_>) -> Result<Row> {
    let mut out = Row::new();
    for (idx, column) in columns.iter().enumerate() {
        let value = sqlite_value_to_json(row, idx)
            .map_err(|e| DocketError::execution(format!("Failed to read column {column}: {e}")))?;
        out.insert(column.clone(), value);
    }
    Ok(out)
}

/// Convert a `SQLite` value to a JSON value
fn sqlite_value_to_json(
    row: &SqliteRow<'_>,
    idx: usize,
) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    let value_ref = row.get_ref(idx)?;

    Ok(match value_ref {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // Handle NaN/Infinity as null
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            // Encode BLOB as Base64 for JSON safety
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(encoded)
        }
    })
}
