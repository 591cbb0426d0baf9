//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Docket.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `NotFound`: No active registered query with the requested name
//! - `MissingParameter`: Required parameter absent from caller input
//! - `TypeMismatch`: Supplied value cannot be coerced to the declared type
//! - `DisallowedValue`: Coerced value outside the declared allowed set
//! - `Execution`: Database rejected or failed the rendered statement
//! - `Config`: Configuration file or bootstrap errors
//! - `AuditWrite`: Durable audit sink write failed (logged, never surfaced)

use thiserror::Error;

/// Main error type for Docket operations
#[derive(Error, Debug)]
pub enum DocketError {
    /// No active registered query with the requested name
    #[error("No active query found with name: '{0}'")]
    NotFound(String),

    /// Required parameter absent from caller input
    #[error("Missing required parameter: '{0}'")]
    MissingParameter(String),

    /// Supplied value cannot be coerced to the declared parameter type
    #[error("Parameter '{name}' expects {expected}, got {actual}")]
    TypeMismatch { name: String, expected: &'static str, actual: String },

    /// Coerced value is not a member of the declared allowed set
    #[error("Parameter '{name}' must be one of {allowed}, got {value}")]
    DisallowedValue { name: String, allowed: String, value: String },

    /// Query execution failed; carries the driver message verbatim
    #[error("Query execution failed: {0}")]
    Execution(String),

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable audit sink write failed
    #[error("Audit write failed: {0}")]
    AuditWrite(String),
}

impl DocketError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling by agents.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::MissingParameter(_) => "MISSING_PARAMETER",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::DisallowedValue { .. } => "DISALLOWED_VALUE",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::AuditWrite(_) => "AUDIT_WRITE_FAILURE",
        }
    }

    /// Get human-readable error message (agent-appropriate, no sensitive data)
    ///
    /// This message is safe to include in JSON output. Parameter values are
    /// only echoed for validation errors, never masked audit content.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a not-found error for a query name
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a missing-parameter error
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create a type-mismatch error
    pub fn type_mismatch(
        name: impl Into<String>,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch { name: name.into(), expected, actual: actual.into() }
    }

    /// Create a disallowed-value error
    pub fn disallowed_value(
        name: impl Into<String>,
        allowed: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::DisallowedValue { name: name.into(), allowed: allowed.into(), value: value.into() }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an audit write error
    pub fn audit_write(message: impl Into<String>) -> Self {
        Self::AuditWrite(message.into())
    }
}

/// Result type alias for Docket operations
pub type Result<T> = std::result::Result<T, DocketError>;
