//! Asynchronous Audit Writer
//!
//! The durable half of the audit trail: records are pushed onto a bounded
//! channel and drained by a small fixed pool of background workers that
//! insert into `query_audit_log`. The hand-off uses `try_send`, so the
//! serving path never waits on audit I/O. Every failure mode here (full
//! queue, stopped workers, failed insert) degrades to a warning and a
//! dropped record.
//!
//! Workers are plain tasks on the runtime; they exit when the sending side
//! is dropped and hold nothing that blocks shutdown. A record in flight at
//! process exit is lost, which is an accepted trade for never letting
//! audit durability gate query-serving availability.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::audit::AuditRecord;
use crate::db::ConnectionPool;
use crate::error::{DocketError, Result};

/// Hand-off point for durable audit writes
pub struct AuditWriter {
    tx: mpsc::Sender<AuditRecord>,
}

impl AuditWriter {
    /// Spawn the worker pool and return the sending handle
    ///
    /// Must be called from within a tokio runtime. `queue_depth` and
    /// `workers` are clamped to at least one.
    #[must_use]
    pub fn spawn(pool: Arc<ConnectionPool>, queue_depth: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<AuditRecord>(queue_depth.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only while waiting; inserts run
                    // unlocked so workers persist in parallel
                    let next = rx.lock().await.recv().await;
                    match next {
                        Some(record) => {
                            if let Err(e) = persist(&pool, &record).await {
                                tracing::warn!(
                                    "Durable audit write failed for '{}': {e}",
                                    record.query_name
                                );
                            }
                        }
                        None => break,
                    }
                }
            });
        }

        Self { tx }
    }

    /// Queue one record for durable persistence without blocking
    pub fn dispatch(&self, record: AuditRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!(
                    "Audit queue full; dropping durable record for '{}'",
                    record.query_name
                );
            }
            Err(TrySendError::Closed(record)) => {
                tracing::warn!(
                    "Audit workers stopped; dropping durable record for '{}'",
                    record.query_name
                );
            }
        }
    }
}

/// Insert one record into the durable audit table
async fn persist(pool: &ConnectionPool, record: &AuditRecord) -> Result<()> {
    let parameters = serde_json::to_string(&record.parameters)
        .map_err(|e| DocketError::audit_write(format!("Could not serialize parameters: {e}")))?;

    let conn = pool.acquire().await;
    conn.execute(
        "INSERT INTO query_audit_log
            (query_name, query_version, parameters, status,
             error, row_count, duration_ms, caller_id, executed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            record.query_name,
            record.query_version,
            parameters,
            record.status.as_str(),
            record.error,
            record.row_count as i64,
            record.duration_ms as i64,
            record.caller_id,
            record.executed_at.to_rfc3339(),
        ],
    )
    .map_err(|e| DocketError::audit_write(e.to_string()))?;

    Ok(())
}
