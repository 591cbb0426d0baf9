//! JSON Output Envelope Types
//!
//! This module defines the structured JSON output format for all Docket
//! operations. Every operation returns either a `SuccessEnvelope` or an
//! `ErrorEnvelope` on stdout.
//!
//! # Output Contract
//! - Success: `{"success": true, "command": "...", "data": {...}, "metadata": {...}}`
//! - Error: `{"success": false, "command": "...", "error": {"code": "...", "message": "..."}}`
//!
//! Output is stable and suitable for programmatic parsing by agents.

use serde::{Deserialize, Serialize};

use crate::error::DocketError;

/// Success envelope for operation results
///
/// Generic over the data type to support different operation return values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub success: bool,

    /// Command that was executed (list, get, run)
    pub command: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub metadata: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(command: impl Into<String>, data: T, metadata: Metadata) -> Self {
        Self { success: true, command: command.into(), data, metadata }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub success: bool,

    /// Command that was attempted (list, get, run)
    pub command: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { success: false, command: command.into(), error }
    }

    /// Create error envelope from a `DocketError`
    pub fn from_error(command: impl Into<String>, err: &DocketError) -> Self {
        Self::new(
            command,
            ErrorInfo { code: err.error_code().to_string(), message: err.message() },
        )
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "NOT_FOUND", "TYPE_MISMATCH")
    pub code: String,

    /// Human-readable error message (agent-appropriate, no sensitive data)
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error info
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned (for run results, None for other operations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    /// Create new metadata with just execution time
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows_returned: None }
    }

    /// Create new metadata with execution time and row count
    #[must_use]
    pub const fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self { execution_ms, rows_returned: Some(rows_returned) }
    }
}
