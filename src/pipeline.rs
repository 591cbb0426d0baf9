//! Query Pipeline
//!
//! Process-wide application state and the end-to-end execution path. `App`
//! owns the connection pool, the registry handle, and both audit sinks;
//! command handlers and the MCP server borrow it and call the three
//! operations: `list_queries`, `get_query`, `run_query`.
//!
//! `run_query` is the full pipeline: fetch the definition, validate and
//! coerce parameters against its schema, mask a copy for audit, render
//! conditional blocks, execute with the row ceiling applied, then commit
//! exactly one audit record covering the attempt. Lookup and validation
//! failures abort before any audit is written; once execution begins, the
//! outcome is always audited.

use std::sync::Arc;
use std::time::Instant;

use crate::audit::{mask_parameters, AuditLog, AuditPipeline, AuditRecord, AuditStatus, AuditWriter};
use crate::config::Settings;
use crate::db::ConnectionPool;
use crate::error::Result;
use crate::executor::{self, Row};
use crate::registry::{QueryDefinition, QuerySummary, Registry};
use crate::template;
use crate::validate;

/// Shared application state built once at startup
pub struct App {
    pub settings: Settings,
    pool: Arc<ConnectionPool>,
    registry: Registry,
    audit: AuditPipeline,
}

impl App {
    /// Open the pool, the audit sinks, and the registry handle
    ///
    /// Must run inside a tokio runtime (the audit workers are spawned
    /// here). A missing registry schema is not an error at this point;
    /// `docket init` creates it.
    pub async fn bootstrap(settings: Settings) -> Result<Self> {
        let pool = Arc::new(ConnectionPool::open(
            &settings.database_path,
            settings.pool_size,
        )?);

        let log = AuditLog::open(&settings.audit_log_path)?;
        let writer = AuditWriter::spawn(
            Arc::clone(&pool),
            settings.audit_queue_depth,
            settings.audit_workers,
        );

        let registry = Registry::new(Arc::clone(&pool));

        Ok(Self {
            settings,
            pool,
            registry,
            audit: AuditPipeline::new(log, writer),
        })
    }

    /// List active queries, optionally filtered by tag substrings
    pub async fn list_queries(&self, tag_filter: Option<&str>) -> Result<Vec<QuerySummary>> {
        self.registry.list_queries(tag_filter).await
    }

    /// Fetch one query's full definition (SQL text included)
    pub async fn get_query(&self, name: &str) -> Result<QueryDefinition> {
        self.registry.fetch_query(name).await
    }

    /// Execute a registered query end to end
    ///
    /// `max_rows` falls back to the configured default and is always capped
    /// by the hard ceiling. The returned rows preserve column order.
    pub async fn run_query(
        &self,
        name: &str,
        parameters: &serde_json::Map<String, serde_json::Value>,
        max_rows: Option<usize>,
        caller_id: Option<&str>,
    ) -> Result<Vec<Row>> {
        let query = self.registry.fetch_query(name).await?;
        let started = Instant::now();

        // Schema violations abort here; nothing is audited for them
        let bind = validate::validate(&query.parameters, parameters)?;

        // Mask once, up front, so both audit sinks see identical data
        let masked = mask_parameters(parameters, &query.parameters, &self.settings.deployment_tier);

        let sql = template::render(&query.sql_text, &bind);
        let requested = max_rows.unwrap_or(self.settings.default_max_rows);

        let outcome = executor::execute(
            &self.pool,
            &sql,
            &bind,
            requested,
            self.settings.hard_max_rows,
        )
        .await;

        let (status, error, row_count) = match &outcome {
            Ok(rows) => (AuditStatus::Success, None, rows.len()),
            Err(e) => (AuditStatus::Error, Some(e.to_string()), 0),
        };

        self.audit.commit(AuditRecord::new(
            &query.name,
            query.version,
            masked,
            status,
            error,
            row_count,
            started.elapsed(),
            caller_id.map(String::from),
        ));

        outcome
    }
}
