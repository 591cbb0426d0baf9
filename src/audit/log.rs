//! Synchronous Audit Log
//!
//! The local, append-only half of the audit trail: one JSON line per
//! execution attempt. The file is opened once at bootstrap; failing to open
//! it is fatal, because a deployment that cannot audit locally must not
//! serve. A per-call append failure, by contrast, is logged as a warning
//! and swallowed so the caller still gets their result.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::audit::AuditRecord;
use crate::error::{DocketError, Result};

/// Append-only JSON-lines audit log
#[derive(Debug)]
pub struct AuditLog {
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (or create) the log file for appending
    ///
    /// Parent directories are created as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DocketError::config(format!("Could not create audit log directory: {e}"))
                })?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| {
            DocketError::config(format!("Could not open audit log {}: {e}", path.display()))
        })?;

        Ok(Self { file: Mutex::new(file) })
    }

    /// Append one record as a JSON line
    ///
    /// Failures are warned and swallowed; the caller's result does not
    /// depend on the audit trail.
    pub fn append(&self, record: &AuditRecord) {
        if let Err(e) = self.try_append(record) {
            tracing::warn!("Audit log append failed for '{}': {e}", record.query_name);
        }
    }

    fn try_append(&self, record: &AuditRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| DocketError::audit_write(format!("Could not serialize record: {e}")))?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| DocketError::audit_write("Audit log lock poisoned"))?;

        writeln!(file, "{line}")
            .map_err(|e| DocketError::audit_write(format!("Could not append record: {e}")))?;
        file.flush()
            .map_err(|e| DocketError::audit_write(format!("Could not flush record: {e}")))
    }
}
