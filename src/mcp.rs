//! MCP (Model Context Protocol) Server
//!
//! This module implements an MCP server using manual JSON-RPC 2.0 over stdio.
//! We implement the protocol directly rather than using the unstable rmcp
//! crate.
//!
//! # Architecture
//!
//! - **Transport**: JSON-RPC 2.0 over stdio (line-based)
//! - **Dependencies**: Only `serde_json` and `anyhow` (no MCP-specific crates)
//! - **Protocol**: Implements the MCP specification manually
//!
//! # Design Principles
//!
//! 1. **Stateless per call**: Each tool invocation is an independent pipeline
//!    run against the shared [`App`]
//! 2. **Simple**: Direct JSON-RPC implementation, no macro magic
//! 3. **Quiet stdout**: Nothing but protocol frames on stdout; logs go to
//!    stderr
//!
//! # MCP Surface
//!
//! Tools:
//! - `list_queries` - List registered queries, optionally filtered by tags
//! - `get_query` - Fetch one query's schema and metadata
//! - `run_query` - Execute a registered query through the full pipeline
//!
//! Prompts: `query_catalog`, `query_authoring`, `data_exploration`,
//! `audit_review` (see [`crate::prompts`]).
//!
//! # Usage
//!
//! Start the MCP server with: `docket mcp`
//!
//! Configure in Claude Desktop:
//! ```json
//! {
//!   "mcpServers": {
//!     "docket": {
//!       "command": "docket",
//!       "args": ["mcp"]
//!     }
//!   }
//! }
//! ```

use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use crate::output::{ErrorEnvelope, Metadata, SuccessEnvelope};
use crate::pipeline::App;
use crate::prompts;

// ============================================================================
// JSON-RPC 2.0 Structures
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

// ============================================================================
// MCP Tool Result Structures
// ============================================================================

/// Text content block for MCP tool results
#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

impl TextContent {
    fn new(text: String) -> Self {
        Self { content_type: "text".to_string(), text }
    }
}

/// MCP tool call result
#[derive(Debug, Serialize)]
struct CallToolResult {
    content: Vec<TextContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

impl CallToolResult {
    /// Create a successful tool result with JSON data
    fn success(data: impl Serialize) -> Result<Value> {
        let json_text = serde_json::to_string_pretty(&data)?;
        let result = Self { content: vec![TextContent::new(json_text)], is_error: false };
        Ok(serde_json::to_value(result)?)
    }

    /// Create a failed tool result carrying the error envelope
    ///
    /// Pipeline errors are tool-level failures, not protocol failures: the
    /// agent sees the same envelope the CLI would print, with `isError` set.
    fn failure(envelope: &ErrorEnvelope) -> Result<Value> {
        let json_text = serde_json::to_string_pretty(envelope)?;
        let result = Self { content: vec![TextContent::new(json_text)], is_error: true };
        Ok(serde_json::to_value(result)?)
    }
}

// ============================================================================
// Tool Argument Structures
// ============================================================================

/// Arguments for the `list_queries` tool
#[derive(Debug, Deserialize, JsonSchema)]
struct ListQueriesArgs {
    /// Comma-separated tag terms; a query matches if any term is a substring
    /// of its tags (OR across terms)
    #[serde(default)]
    tag_filter: Option<String>,
}

/// Arguments for the `get_query` tool
#[derive(Debug, Deserialize, JsonSchema)]
struct GetQueryArgs {
    /// Registered query name
    name: String,
}

/// Arguments for the `run_query` tool
#[derive(Debug, Deserialize, JsonSchema)]
struct RunQueryArgs {
    /// Registered query name
    name: String,
    /// Parameter values keyed by bind variable name
    #[serde(default)]
    parameters: serde_json::Map<String, Value>,
    /// Maximum rows to return; always capped by the deployment hard ceiling
    #[serde(default)]
    max_rows: Option<usize>,
    /// Opaque caller identity recorded in the audit trail
    #[serde(default)]
    caller_id: Option<String>,
}

// ============================================================================
// MCP Server
// ============================================================================

/// Start the MCP server
///
/// Runs the main server loop, reading JSON-RPC requests from stdin (one per
/// line) and writing responses to stdout. Requests without an `id` are
/// notifications and receive no response.
///
/// # Errors
///
/// Returns an error if stdio communication fails.
#[allow(clippy::future_not_send)]
pub async fn serve(app: Arc<App>) -> Result<()> {
    let stdin = io::stdin();
    let reader = stdin.lock();
    let mut stdout = io::stdout();

    for line in reader.lines() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let error_response = JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: None,
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32700, // Parse error
                        message: format!("Parse error: {e}"),
                        data: None,
                    }),
                };
                let response_json = serde_json::to_string(&error_response)?;
                writeln!(stdout, "{response_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        // Notifications (no id) are processed but never answered
        let is_notification = request.id.is_none();
        let response = handle_request(&app, request).await;

        if is_notification {
            continue;
        }

        let response_json = serde_json::to_string(&response)?;
        writeln!(stdout, "{response_json}")?;
        stdout.flush()?;
    }

    Ok(())
}

/// Handle a JSON-RPC request
///
/// Routes the request to the appropriate handler based on the method name.
async fn handle_request(app: &App, request: JsonRpcRequest) -> JsonRpcResponse {
    let result = match request.method.as_str() {
        "initialize" => handle_initialize(request.params),
        "tools/list" => handle_list_tools(),
        "tools/call" => handle_call_tool(app, request.params).await,
        "prompts/list" => handle_list_prompts(),
        "prompts/get" => handle_get_prompt(request.params),
        _ => {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601, // Method not found
                    message: format!("Unknown method: {}", request.method),
                    data: None,
                }),
            };
        }
    };

    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(e) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(JsonRpcError {
                code: -32603, // Internal error
                message: e.to_string(),
                data: None,
            }),
        },
    }
}

// ============================================================================
// MCP Protocol Handlers
// ============================================================================

/// Handle MCP initialize request
///
/// Returns server capabilities and metadata.
fn handle_initialize(_params: Option<Value>) -> Result<Value> {
    Ok(serde_json::json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": "docket",
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

/// Handle tools/list request
///
/// Returns the list of available MCP tools with their schemas.
fn handle_list_tools() -> Result<Value> {
    Ok(serde_json::json!({
        "tools": [
            {
                "name": "list_queries",
                "description": "List the queries registered in Docket, optionally filtered by tags. Docket never accepts free-form SQL: every execution runs a named, pre-registered query whose SQL text and parameter schema were stored ahead of time by an author. Use this tool first to discover what is available. Each entry includes the query name, description, tags, and full parameter schema (name, type, required, allowed_values, default, sensitive). The tag filter is comma-separated with OR semantics: a query matches if any filter term is a substring of its tags. Follow up with get_query for a single query's details (including its version) and run_query to execute.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "tag_filter": {
                            "type": "string",
                            "description": "Optional comma-separated tag terms (e.g. \"cases,billing\"). A query matches if any term is a substring of its tags. Omit to list everything."
                        }
                    }
                }
            },
            {
                "name": "get_query",
                "description": "Fetch one registered query's full definition: name, description, parameter schema, version, and tags. The stored SQL text is NOT returned - callers interact with queries through their parameter schemas only. Use this after list_queries to understand exactly which parameters a query takes before calling run_query: each parameter declares a type (NUMBER, VARCHAR2, DATE, TIMESTAMP), whether it is required, an optional closed set of allowed_values, and an optional default applied when omitted. Fails with NOT_FOUND if no active query has the given name.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Registered query name, exactly as returned by list_queries."
                        }
                    },
                    "required": ["name"]
                }
            },
            {
                "name": "run_query",
                "description": "Execute a registered query by name through the validated pipeline: parameters are type-coerced against the query's declared schema (strings are parsed for NUMBER/DATE/TIMESTAMP types; booleans are never numeric), optional conditional blocks in the stored SQL are included or stripped based on which parameters were supplied, and the statement runs under a deployment-wide row ceiling that no max_rows value can exceed. Returns the result rows as JSON objects in column order. Validation failures (MISSING_PARAMETER, TYPE_MISMATCH, DISALLOWED_VALUE) abort before any database work; execution failures surface as EXECUTION_ERROR with the driver message. Every execution attempt is recorded in the audit trail with sensitive parameter values masked in upper deployment tiers. Omitted optional parameters bind as NULL, which stored SQL uses to drop optional filters - do NOT pass explicit nulls, just omit the key. Use max_rows to keep responses small: start with 10-50 for exploration.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Registered query name to execute."
                        },
                        "parameters": {
                            "type": "object",
                            "description": "Parameter values keyed by bind variable name, matching the schema from get_query. Extra keys are ignored. Omit optional parameters entirely rather than passing null."
                        },
                        "max_rows": {
                            "type": "number",
                            "description": "Maximum rows to return. Defaults to the server's configured default (500) and is always capped by the deployment hard ceiling. Prefer small values (10-50) for initial exploration."
                        },
                        "caller_id": {
                            "type": "string",
                            "description": "Optional opaque caller identity recorded in the audit trail. Not an authorization input."
                        }
                    },
                    "required": ["name"]
                }
            }
        ]
    }))
}

/// Handle tools/call request
///
/// Routes the tool call to the appropriate tool implementation. Pipeline
/// errors come back as `isError` tool results, not JSON-RPC errors.
async fn handle_call_tool(app: &App, params: Option<Value>) -> Result<Value> {
    let params = params.ok_or_else(|| anyhow!("Missing params"))?;
    let name = params["name"].as_str().ok_or_else(|| anyhow!("Missing tool name"))?;
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| serde_json::json!({}));

    match name {
        "list_queries" => tool_list_queries(app, arguments).await,
        "get_query" => tool_get_query(app, arguments).await,
        "run_query" => tool_run_query(app, arguments).await,
        _ => Err(anyhow!("Unknown tool: {name}")),
    }
}

/// Handle prompts/list request
fn handle_list_prompts() -> Result<Value> {
    let prompts: Vec<Value> = prompts::catalog().iter().map(prompts::PromptInfo::to_json).collect();
    Ok(serde_json::json!({ "prompts": prompts }))
}

/// Handle prompts/get request
fn handle_get_prompt(params: Option<Value>) -> Result<Value> {
    let params = params.ok_or_else(|| anyhow!("Missing params"))?;
    let name = params["name"].as_str().ok_or_else(|| anyhow!("Missing prompt name"))?;
    let arguments = match params.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };

    let info = prompts::catalog()
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| anyhow!("Unknown prompt: {name}"))?;
    let text = prompts::render(name, &arguments).map_err(|e| anyhow!("{e}"))?;

    Ok(serde_json::json!({
        "description": info.description,
        "messages": [
            {
                "role": "user",
                "content": { "type": "text", "text": text }
            }
        ]
    }))
}

// ============================================================================
// Tool Implementations
// ============================================================================

/// MCP Tool: `list_queries`
async fn tool_list_queries(app: &App, arguments: Value) -> Result<Value> {
    let args: ListQueriesArgs = serde_json::from_value(arguments)
        .map_err(|e| anyhow!("Invalid list_queries arguments: {e}"))?;

    let started = Instant::now();
    match app.list_queries(args.tag_filter.as_deref()).await {
        Ok(summaries) => CallToolResult::success(SuccessEnvelope::new(
            "list",
            summaries,
            Metadata::new(started.elapsed().as_millis() as u64),
        )),
        Err(e) => CallToolResult::failure(&ErrorEnvelope::from_error("list", &e)),
    }
}

/// MCP Tool: `get_query`
async fn tool_get_query(app: &App, arguments: Value) -> Result<Value> {
    let args: GetQueryArgs =
        serde_json::from_value(arguments).map_err(|e| anyhow!("Invalid get_query arguments: {e}"))?;

    let started = Instant::now();
    match app.get_query(&args.name).await {
        Ok(query) => CallToolResult::success(SuccessEnvelope::new(
            "get",
            query,
            Metadata::new(started.elapsed().as_millis() as u64),
        )),
        Err(e) => CallToolResult::failure(&ErrorEnvelope::from_error("get", &e)),
    }
}

/// MCP Tool: `run_query`
async fn tool_run_query(app: &App, arguments: Value) -> Result<Value> {
    let args: RunQueryArgs =
        serde_json::from_value(arguments).map_err(|e| anyhow!("Invalid run_query arguments: {e}"))?;

    let started = Instant::now();
    match app
        .run_query(&args.name, &args.parameters, args.max_rows, args.caller_id.as_deref())
        .await
    {
        Ok(rows) => {
            let count = rows.len();
            CallToolResult::success(SuccessEnvelope::new(
                "run",
                rows,
                Metadata::with_rows(started.elapsed().as_millis() as u64, count),
            ))
        }
        Err(e) => CallToolResult::failure(&ErrorEnvelope::from_error("run", &e)),
    }
}
