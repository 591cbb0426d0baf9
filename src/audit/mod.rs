//! Audit Trail
//!
//! Every execution attempt produces exactly one immutable [`AuditRecord`],
//! committed through two independent paths:
//!
//! - **Synchronous**: appended as one JSON line to a local log file. The
//!   file is opened at bootstrap (fatal if it cannot be), and a per-call
//!   append failure is logged as a warning, never surfaced to the caller.
//! - **Asynchronous**: handed to a bounded queue drained by background
//!   workers that insert into the `query_audit_log` table. The hand-off
//!   never blocks; a full queue or a failed insert drops the record with a
//!   warning. Audit durability must never affect query-serving
//!   availability.
//!
//! Parameters are masked once, before the record is built, so both sinks
//! see identical masked data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod log;
pub mod masking;
pub mod writer;

pub use log::AuditLog;
pub use masking::{mask_parameters, MASKED_VALUE};
pub use writer::AuditWriter;

/// Outcome of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Success,
    Error,
}

impl AuditStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One execution attempt, as written to both audit sinks
///
/// Built once per call and immutable afterwards; the service never reads
/// records back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub query_name: String,
    pub query_version: i64,
    /// Masked parameter map; raw sensitive values never reach a sink
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub status: AuditStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub row_count: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build a record stamped with the current UTC time
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        query_name: impl Into<String>,
        query_version: i64,
        parameters: serde_json::Map<String, serde_json::Value>,
        status: AuditStatus,
        error: Option<String>,
        row_count: usize,
        duration: Duration,
        caller_id: Option<String>,
    ) -> Self {
        Self {
            query_name: query_name.into(),
            query_version,
            parameters,
            status,
            error,
            row_count,
            duration_ms: duration.as_millis() as u64,
            caller_id,
            executed_at: Utc::now(),
        }
    }
}

/// Both audit sinks behind one hand-off point
pub struct AuditPipeline {
    log: AuditLog,
    writer: AuditWriter,
}

impl AuditPipeline {
    #[must_use]
    pub fn new(log: AuditLog, writer: AuditWriter) -> Self {
        Self { log, writer }
    }

    /// Commit one record to both sinks
    ///
    /// The synchronous log append happens inline; the durable write is
    /// dispatched to the background workers. Neither path can fail the
    /// caller.
    pub fn commit(&self, record: AuditRecord) {
        self.log.append(&record);
        self.writer.dispatch(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_value(AuditStatus::Success).unwrap(), json!("SUCCESS"));
        assert_eq!(serde_json::to_value(AuditStatus::Error).unwrap(), json!("ERROR"));
        assert_eq!(AuditStatus::Success.as_str(), "SUCCESS");
    }

    #[test]
    fn test_record_serialization_shape() {
        let mut parameters = serde_json::Map::new();
        parameters.insert("id".to_string(), json!(7));

        let record = AuditRecord::new(
            "open_cases",
            3,
            parameters,
            AuditStatus::Success,
            None,
            12,
            Duration::from_millis(45),
            Some("agent-1".to_string()),
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["query_name"], json!("open_cases"));
        assert_eq!(value["query_version"], json!(3));
        assert_eq!(value["status"], json!("SUCCESS"));
        assert_eq!(value["row_count"], json!(12));
        assert_eq!(value["duration_ms"], json!(45));
        assert_eq!(value["caller_id"], json!("agent-1"));
        // Absent error is omitted, not null
        assert!(value.get("error").is_none());
        assert!(value["executed_at"].is_string());
    }

    #[test]
    fn test_error_record_keeps_message() {
        let record = AuditRecord::new(
            "broken",
            1,
            serde_json::Map::new(),
            AuditStatus::Error,
            Some("no such table: ghosts".to_string()),
            0,
            Duration::from_millis(2),
            None,
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], json!("ERROR"));
        assert_eq!(value["error"], json!("no such table: ghosts"));
        assert_eq!(value["row_count"], json!(0));
        assert!(value.get("caller_id").is_none());
    }

    #[test]
    fn test_record_round_trips() {
        let record = AuditRecord::new(
            "q",
            1,
            serde_json::Map::new(),
            AuditStatus::Success,
            None,
            0,
            Duration::ZERO,
            None,
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: AuditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.query_name, "q");
        assert_eq!(back.status, AuditStatus::Success);
        assert_eq!(back.executed_at, record.executed_at);
    }
}
