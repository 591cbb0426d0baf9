//! Docket - Registry-Backed SQL Execution Service
//!
//! Docket executes *named, pre-registered* SQL statements: a caller supplies
//! a query name and a bag of parameters, never SQL text. The stored statement
//! template is looked up in the registry, the parameters are validated and
//! type-coerced against its declared schema, conditional blocks in the SQL
//! are rendered against the bind map, and the statement runs under a
//! deployment-wide row ceiling. Every execution attempt is recorded through
//! a dual-path audit trail (synchronous local log + asynchronous durable
//! store) with sensitive parameter values masked in upper deployment tiers.
//!
//! # Core Principles
//! - No free-form SQL: every statement is author-supplied and stored ahead
//!   of time
//! - Typed parameters: schema-declared coercion, never string splicing
//! - Hard row ceiling: no caller-requested limit can exceed the deployment cap
//! - Audit never gates serving: durable audit failures are warned and dropped
//!
//! # Architecture
//! This library provides the core functionality for both the CLI and the MCP
//! interface. Both are thin wrappers over the same [`pipeline::App`]
//! operations: `list_queries`, `get_query`, `run_query`.
//!
//! # Module Organization
//! - [`error`] - Error types and stable error codes
//! - [`output`] - JSON output envelope types
//! - [`config`] - Settings file loading and environment overrides
//! - [`db`] - Fixed-size SQLite connection pool
//! - [`registry`] - Named-query store (lookup and listing)
//! - [`validate`] - Parameter validation and type coercion
//! - [`template`] - Conditional SQL block rendering
//! - [`executor`] - Row-limited statement execution
//! - [`audit`] - Masking, audit records, and both audit sinks
//! - [`pipeline`] - Process-wide state and the end-to-end call path
//! - [`prompts`] - MCP prompt catalog
//! - [`mcp`] - MCP server (manual JSON-RPC 2.0 over stdio)

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod mcp;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod template;
pub mod validate;

// Re-export commonly used types for convenience
pub use audit::{mask_parameters, AuditRecord, AuditStatus, MASKED_VALUE};
pub use config::Settings;
pub use db::ConnectionPool;
pub use error::{DocketError, Result};
pub use executor::Row;
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use pipeline::App;
pub use registry::{ensure_schema, ParamType, ParameterDefinition, QueryDefinition, QuerySummary};
pub use validate::{BindMap, BindValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let settings = Settings::default();
        assert_eq!(settings.hard_max_rows, 2000);

        let def = ParameterDefinition::new("id", ParamType::Number);
        assert!(def.required);

        assert_eq!(MASKED_VALUE, "***MASKED***");
    }
}
