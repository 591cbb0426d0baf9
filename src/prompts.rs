//! MCP Prompt Catalog
//!
//! Reusable prompt templates served over `prompts/list` and `prompts/get`.
//! Each prompt walks an agent through one workflow against the registry:
//! discovering and running queries, authoring a new registry entry, or
//! reviewing the audit trail. Templates are plain text built from optional
//! string arguments; no state, no I/O.

use serde_json::{json, Value};

use crate::error::{DocketError, Result};

/// One argument accepted by a prompt
#[derive(Debug, Clone)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Metadata for one prompt in the catalog
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [PromptArgument],
}

impl PromptInfo {
    /// MCP `prompts/list` entry
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "arguments": self.arguments.iter().map(|a| json!({
                "name": a.name,
                "description": a.description,
                "required": a.required,
            })).collect::<Vec<_>>(),
        })
    }
}

/// The full prompt catalog, in listing order
#[must_use]
pub fn catalog() -> &'static [PromptInfo] {
    const CATALOG: &[PromptInfo] = &[
        PromptInfo {
            name: "query_catalog",
            description: "Discover the registered queries, inspect their parameter \
                          schemas, and build a correct run_query call",
            arguments: &[PromptArgument {
                name: "tags",
                description: "Comma-separated tags to focus discovery on (e.g. \"cases,billing\")",
                required: false,
            }],
        },
        PromptInfo {
            name: "query_authoring",
            description: "Draft a new registry entry: SQL text, conditional block syntax, \
                          parameter schema JSON, and the INSERT statement to register it",
            arguments: &[
                PromptArgument {
                    name: "table_name",
                    description: "Target table or view to include in the template",
                    required: false,
                },
                PromptArgument {
                    name: "query_description",
                    description: "Plain-English description of what the query should do",
                    required: false,
                },
            ],
        },
        PromptInfo {
            name: "data_exploration",
            description: "Walk through related records step by step: resolve a starting \
                          record, fetch its details, then chain the registered queries \
                          that cover its related entities",
            arguments: &[
                PromptArgument {
                    name: "search_term",
                    description: "Name or partial name to locate the starting record with",
                    required: false,
                },
                PromptArgument {
                    name: "record_id",
                    description: "Known identifier of the starting record; takes precedence \
                                  over search_term",
                    required: false,
                },
            ],
        },
        PromptInfo {
            name: "audit_review",
            description: "Review recent query executions for error rates, slow queries, \
                          and usage patterns from the audit trail",
            arguments: &[
                PromptArgument {
                    name: "time_range",
                    description: "Lookback period: \"1h\", \"24h\", \"7d\", or \"30d\" (default 24h)",
                    required: false,
                },
                PromptArgument {
                    name: "query_name",
                    description: "Focus the review on a single query's execution history",
                    required: false,
                },
            ],
        },
    ];
    CATALOG
}

/// Render one prompt by name with its arguments
pub fn render(name: &str, args: &serde_json::Map<String, Value>) -> Result<String> {
    let arg = |key: &str| args.get(key).and_then(Value::as_str);
    match name {
        "query_catalog" => Ok(query_catalog(arg("tags"))),
        "query_authoring" => Ok(query_authoring(arg("table_name"), arg("query_description"))),
        "data_exploration" => Ok(data_exploration(arg("search_term"), arg("record_id"))),
        "audit_review" => Ok(audit_review(arg("time_range"), arg("query_name"))),
        other => Err(DocketError::not_found(other)),
    }
}

/// Walk through discovering and running registered queries
fn query_catalog(tags: Option<&str>) -> String {
    let list_call = tags.map_or_else(
        || "Call the `list_queries` tool".to_string(),
        |t| format!("Call the `list_queries` tool with tag_filter=\"{t}\""),
    );
    let tag_focus = tags.map_or_else(String::new, |t| {
        format!(
            "\n\nThe user is interested in queries tagged with: \"{t}\". \
             Start by filtering with these tags."
        )
    });

    format!(
        "You are helping a user discover and run queries registered in Docket. \
         Callers never write SQL; every execution goes through a named, \
         pre-registered query. Follow these steps:\n\n\
         ## Step 1 — List available queries\n\
         {list_call} to see what is available. Present the results as a concise \
         table with columns: Name, Description, Tags.\n\n\
         ## Step 2 — Narrow by tags (if needed)\n\
         If the full list is large, ask the user which domain they are interested \
         in and re-call `list_queries` with a comma-separated tag filter. A query \
         matches if any filter term is a substring of its tags.\n\n\
         ## Step 3 — Inspect a specific query\n\
         Once the user identifies a query of interest, call `get_query` with its \
         name. Present:\n\
         - **Description**: what it does\n\
         - **Parameters**: name, type, required/optional, allowed values, defaults\n\
         - **Version** and **tags** for cross-referencing\n\n\
         ## Step 4 — Run it\n\
         Help the user build the `parameters` object and call `run_query`. Confirm \
         parameter values with the user before executing, and pass `max_rows` when \
         the result could be large (the server enforces a hard ceiling regardless).\n\n\
         ## Guidelines\n\
         - Never guess parameter values; ask the user.\n\
         - If a parameter has `allowed_values`, list them for the user.\n\
         - If a parameter is optional, explain what happens when it is omitted: \
           its default applies, or the filter drops out entirely.{tag_focus}"
    )
}

/// Checklist and template for registering a new query
fn query_authoring(table_name: Option<&str>, query_description: Option<&str>) -> String {
    let mut context = String::new();
    if table_name.is_some() || query_description.is_some() {
        context.push_str("\n## Context\n");
        if let Some(table) = table_name {
            context.push_str(&format!("- Target table/view: `{table}`\n"));
        }
        if let Some(desc) = query_description {
            context.push_str(&format!("- Intended purpose: {desc}\n"));
        }
    }

    format!(
        "You are helping a user draft a new query for the Docket registry. \
         Follow the project conventions strictly.\n{context}\n\
         ## Mandatory Rules\n\
         1. **No SELECT \\*** — list every column explicitly in the SELECT clause.\n\
         2. **Parameter definitions** — every bind variable (`:param_name`) in the \
         SQL must have a matching entry in the `parameters` JSON array with:\n\
            - `name` (str) — matches the bind variable name\n\
            - `type` (str) — one of: NUMBER, VARCHAR2, DATE, TIMESTAMP\n\
            - `required` (bool) — defaults to true when omitted\n\
            - `description` (str) — plain-English explanation\n\
            - `allowed_values` (list, optional) — restrict to a closed set\n\
            - `default` (optional) — value bound when omitted\n\
            - `sensitive` (bool, optional) — true if the value must be masked in \
         upper-tier audit records\n\
         3. **Optional parameter template syntax** — for optional WHERE clauses, \
         wrap the clause in `/*[ ... ]*/` delimiters. The block is included only \
         when every bind variable it references has a non-null value. Example:\n\
            ```sql\n\
            SELECT id, name\n\
            FROM employees/*[ WHERE department = :department]*/\n\
            ORDER BY id\n\
            ```\n\
         4. **Tags** — provide comma-separated tags for discoverability \
         (e.g. 'cases,billing,reporting').\n\
         5. **Version** — starts at 1; bump it on every edit to an existing row.\n\n\
         ## Template: INSERT Statement\n\
         ```sql\n\
         INSERT INTO query_registry\n\
             (name, description, sql_text, parameters, tags)\n\
         VALUES (\n\
             '<query_slug>',\n\
             '<Human-readable description>',\n\
             'SELECT <col1>, <col2>\n\
         FROM <table>\n\
         WHERE <conditions>',\n\
             '[{{\"name\":\"<param>\",\"type\":\"<TYPE>\",\"required\":true,\
         \"description\":\"...\"}}]',\n\
             '<tag1>,<tag2>'\n\
         );\n\
         ```\n\n\
         ## Checklist before registering\n\
         - Every `:token` in the SQL has a parameter definition, and vice versa.\n\
         - Each conditional block references at least one bind variable \
         (a block with none is always stripped).\n\
         - The query returns a bounded, well-described result set; the server \
         caps rows at the deployment hard ceiling.\n\
         - Run `get_query` after inserting to confirm the schema parses."
    )
}

/// Guide a step-by-step exploration across related registered queries
fn data_exploration(search_term: Option<&str>, record_id: Option<&str>) -> String {
    // A known identifier wins over a search term
    let step1 = if let Some(id) = record_id {
        format!(
            "The user already has the record identifier: `{id}`. Call `list_queries` \
             to find the registry's get-by-id query for the entity in question, then \
             call `run_query` with that name and the identifier as its parameter. \
             Keep the identifier at hand; every subsequent step binds it.\n\n"
        )
    } else if let Some(term) = search_term {
        format!(
            "The user is looking for: `{term}`. Call `list_queries` to find the \
             registry's search query for the entity in question, then call `run_query` \
             with the search term as its parameter. If multiple rows come back, present \
             them and ask the user which one to explore. Extract the record's \
             identifier from the chosen row; every subsequent step binds it.\n\n"
        )
    } else {
        "Ask the user how they want to identify the starting record:\n\
         - **By name**: run the registry's search query with a partial or full name.\n\
         - **By identifier**: run the registry's get-by-id query directly.\n\
         - **Browse**: run a listing query to show candidates.\n\n\
         Use `list_queries` to discover which of these the registry provides. Once \
         you have the record's identifier, proceed to Step 2.\n\n"
            .to_string()
    };

    format!(
        "You are guiding a user through exploring related records via the Docket \
         registry. Registered queries share tags, and queries over related entities \
         usually share a tag; use that to chain from one entity to the next.\n\n\
         ## Step 1 — Identify the starting record\n\
         {step1}\
         ## Step 2 — Retrieve the record's details\n\
         Run the entity's get-by-id query with the resolved identifier and present \
         the key fields: names, statuses, amounts, and dates.\n\n\
         ## Step 3 — Follow the related entities\n\
         Call `list_queries` filtered by the record's tags to find queries over \
         related entities (child records, line items, positions). Run each with the \
         same identifier and present the results.\n\n\
         ## Step 4 — Cross-entity summaries\n\
         If the registry carries rollup or summary queries for this entity, run them \
         to aggregate what Step 3 showed (counts and totals per related record).\n\n\
         ## Step 5 — Suggest further exploration\n\
         From the remaining queries under the same tags, suggest ones the user might \
         find useful next, with a one-line reason each.\n\n\
         ## Guidelines\n\
         - Present results in readable tables.\n\
         - After each step, summarize key findings before moving on.\n\
         - Highlight anomalies (zero amounts, missing dates, unexpected statuses).\n\
         - If a query returns no rows, explain what that means in context rather \
         than moving on silently.\n\
         - Use `get_query` before running anything unfamiliar so parameter names \
         and types are bound correctly."
    )
}

/// Guide a review of the audit trail
fn audit_review(time_range: Option<&str>, query_name: Option<&str>) -> String {
    let (label, hours) = match time_range.unwrap_or("24h") {
        "1h" => ("1 hour", 1),
        "7d" => ("7 days", 168),
        "30d" => ("30 days", 720),
        _ => ("24 hours", 24),
    };

    let focus = query_name.map_or_else(String::new, |name| {
        format!(
            "\n\nThe user wants to focus specifically on query: `{name}`. \
             When reviewing results, filter or highlight rows matching this \
             query name."
        )
    });

    format!(
        "You are reviewing query execution audit data for the past {label}. \
         Docket records every execution attempt twice: one JSON line in the \
         local audit log file, and one row in the `query_audit_log` table. Use \
         the audit-focused queries in the registry to surface insights.\n\n\
         Pass `lookback_hours={hours}` to each audit query to match the \
         requested time range.\n\n\
         ## Step 1 — Execution summary\n\
         Call `run_query` with name=\"audit_execution_summary\" for an overview \
         of all executions in the past {label}: total runs, success/error \
         counts, and average duration.\n\n\
         ## Step 2 — Error analysis\n\
         Call `run_query` with name=\"audit_recent_errors\" to retrieve recent \
         failed executions. Present the error messages, which queries failed, \
         and when.\n\n\
         ## Step 3 — Performance trends\n\
         Call `run_query` with name=\"audit_slow_queries\" to find queries with \
         high average or maximum duration. Highlight any that exceed 1000ms.\n\n\
         ## Step 4 — Most-used queries\n\
         Call `run_query` with name=\"audit_most_used\" to see which queries are \
         called most frequently.\n\n\
         ## Step 5 — Recommendations\n\
         Based on the data, provide actionable recommendations:\n\
         - Queries with high error rates may have parameter issues or stale SQL.\n\
         - Slow queries may benefit from index review or SQL optimization.\n\
         - Unused queries may be candidates for deactivation \
         (set `is_active = 0`).\n\n\
         ## Guidelines\n\
         - Present numbers in context (e.g. '12 errors out of 450 executions = \
         2.7% error rate').\n\
         - Remember that parameter values in upper-tier records may appear as \
         `***MASKED***`; this is masking, not data corruption.\n\
         - If the audit queries are not yet in the registry, guide the user to \
         create them with the Query Authoring prompt.{focus}"
    )
}
