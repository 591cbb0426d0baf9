//! Query Registry
//!
//! The registry is the store of named, author-approved SQL statements. Each
//! entry carries the statement text (possibly with conditional blocks), a
//! typed parameter schema, a monotonic version, and free-form tags. Callers
//! execute by name only; free-form SQL never enters the system.
//!
//! # Storage
//! One `SQLite` table, `query_registry`, with the parameter schema stored as
//! a JSON column and parsed into typed definitions at load. Soft deletion via
//! `is_active`; inactive entries are invisible to lookup and listing.
//!
//! # Authoring
//! There is no write API here. Authors insert rows directly (the MCP
//! `query_authoring` prompt documents the shape) and bump `version` on edit.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::ConnectionPool;
use crate::error::{DocketError, Result};

/// Declared type of one bind parameter
///
/// Stored as an uppercase string in the schema JSON. Unrecognized strings
/// degrade to `Varchar2` rather than failing the load, so a registry written
/// against a newer type set still lists and runs where it can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    /// Integer or floating-point number
    Number,
    /// Free-form string
    #[default]
    Varchar2,
    /// Calendar date without time of day
    Date,
    /// Date with time of day
    Timestamp,
}

impl ParamType {
    /// Get the type name as stored in schema JSON
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "NUMBER",
            Self::Varchar2 => "VARCHAR2",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for ParamType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "NUMBER" => Self::Number,
            "DATE" => Self::Date,
            "TIMESTAMP" => Self::Timestamp,
            _ => Self::Varchar2,
        }
    }
}

impl From<ParamType> for String {
    fn from(t: ParamType) -> Self {
        t.as_str().to_string()
    }
}

/// Declaration of one bind parameter in a query's schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Bind variable name; must match a `:name` token in the SQL text
    pub name: String,

    /// Declared type, drives coercion
    #[serde(rename = "type", default)]
    pub param_type: ParamType,

    /// Whether the caller must supply a value
    #[serde(default = "default_required")]
    pub required: bool,

    /// Human-readable description shown by list/get
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Closed set of permitted values, checked after coercion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<serde_json::Value>>,

    /// Value bound when the parameter is optional and omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Sensitive values are redacted in upper-tier audit records
    #[serde(default)]
    pub sensitive: bool,
}

fn default_required() -> bool {
    true
}

impl ParameterDefinition {
    /// Create a required, non-sensitive definition with no constraints
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: None,
            allowed_values: None,
            default: None,
            sensitive: false,
        }
    }
}

/// One registered query, loaded from the registry
///
/// `sql_text` is never serialized: callers see the schema and metadata, not
/// the statement itself.
#[derive(Debug, Clone, Serialize)]
pub struct QueryDefinition {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub sql_text: String,
    pub parameters: Vec<ParameterDefinition>,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Listing entry: metadata without version or SQL text
#[derive(Debug, Clone, Serialize)]
pub struct QuerySummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub parameters: Vec<ParameterDefinition>,
}

/// Create the registry and audit tables if they do not exist
///
/// Run from `docket init`, never implicitly at serve time.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS query_registry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            sql_text TEXT NOT NULL,
            parameters TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 1,
            tags TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        );
        CREATE TABLE IF NOT EXISTS query_audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query_name TEXT NOT NULL,
            query_version INTEGER,
            parameters TEXT,
            status TEXT NOT NULL,
            error TEXT,
            row_count INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            caller_id TEXT,
            executed_at TEXT NOT NULL
        );",
    )
    .map_err(|e| DocketError::config(format!("Failed to create registry schema: {e}")))
}

/// Read-only handle over the registry tables
pub struct Registry {
    pool: Arc<ConnectionPool>,
}

impl Registry {
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Look up one active query by name
    pub async fn fetch_query(&self, name: &str) -> Result<QueryDefinition> {
        let conn = self.pool.acquire().await;

        let row = conn
            .query_row(
                "SELECT name, description, sql_text, parameters, version, tags
                 FROM query_registry
                 WHERE name = ?1 AND is_active = 1",
                [name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            );

        let (name, description, sql_text, parameters_json, version, tags) = match row {
            Ok(fields) => fields,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(DocketError::not_found(name));
            }
            Err(e) => {
                return Err(DocketError::execution(format!(
                    "Failed to load query '{name}': {e}"
                )));
            }
        };

        let parameters = parse_parameters(&name, &parameters_json)?;

        Ok(QueryDefinition { name, description, sql_text, parameters, version, tags })
    }

    /// List active queries, optionally filtered by tags
    ///
    /// The filter is comma-separated; a query matches if any term is a
    /// substring of its tags column (OR across terms). Blank terms are
    /// ignored; an all-blank filter behaves like no filter.
    pub async fn list_queries(&self, tag_filter: Option<&str>) -> Result<Vec<QuerySummary>> {
        let terms: Vec<String> = tag_filter
            .map(|f| {
                f.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| format!("%{t}%"))
                    .collect()
            })
            .unwrap_or_default();

        let mut sql = String::from(
            "SELECT name, description, parameters, tags
             FROM query_registry
             WHERE is_active = 1",
        );
        if !terms.is_empty() {
            let clauses: Vec<String> =
                (1..=terms.len()).map(|i| format!("tags LIKE ?{i}")).collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        sql.push_str(" ORDER BY name");

        let conn = self.pool.acquire().await;

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DocketError::execution(format!("Failed to prepare listing: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(terms.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(|e| DocketError::execution(format!("Failed to list queries: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DocketError::execution(format!("Failed to read listing rows: {e}")))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (name, description, parameters_json, tags) in rows {
            let parameters = parse_parameters(&name, &parameters_json)?;
            summaries.push(QuerySummary {
                name,
                description,
                tags: split_tags(tags.as_deref()),
                parameters,
            });
        }

        Ok(summaries)
    }
}

/// Parse the stored parameter schema JSON for one query
fn parse_parameters(query_name: &str, json: &str) -> Result<Vec<ParameterDefinition>> {
    serde_json::from_str(json).map_err(|e| {
        DocketError::config(format!("Query '{query_name}' has an invalid parameter schema: {e}"))
    })
}

/// Split a comma-separated tags column into trimmed, non-empty terms
fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
    })
    .unwrap_or_default()
}
