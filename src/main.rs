//! Docket CLI Entry Point
//!
//! This is the main binary entry point for the Docket CLI.
//! It provides five subcommands:
//! - `init` - Interactive bootstrap (config file + registry schema)
//! - `list` - List registered queries, optionally filtered by tags
//! - `get` - Fetch one query's schema and metadata
//! - `run` - Execute a registered query through the full pipeline
//! - `mcp` - MCP server mode (hidden, for AI agent integration)
//!
//! All output to stdout is JSON-only. Logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use docket::config::{local_config_path, Settings};
use docket::output::{ErrorEnvelope, Metadata, SuccessEnvelope};
use docket::{ensure_schema, App, DocketError};

/// Docket - Registry-backed SQL execution service
#[derive(Parser)]
#[command(name = "docket")]
#[command(about = "Execute named, pre-registered SQL queries with typed parameters and auditing")]
#[command(version)]
struct Cli {
    /// Path to an explicit config file (defaults to local, then global)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file and registry schema interactively
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List registered queries
    List {
        /// Comma-separated tag filter (OR semantics across terms)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Show one query's schema and metadata
    Get {
        /// Registered query name
        name: String,
    },

    /// Execute a registered query
    Run {
        /// Registered query name
        name: String,

        /// Parameter values as a JSON object
        #[arg(long)]
        params: Option<String>,

        /// Maximum rows to return (capped by the deployment hard ceiling)
        #[arg(long)]
        max_rows: Option<usize>,

        /// Opaque caller identity recorded in the audit trail
        #[arg(long)]
        caller_id: Option<String>,
    },

    /// Start MCP server (hidden from help, for AI agent integration)
    #[command(hide = true)]
    Mcp {},
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs to stderr only; stdout carries JSON envelopes or MCP frames
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docket=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err((command, err)) => {
            let envelope = ErrorEnvelope::from_error(command, &err);
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}

/// Route the parsed command, tagging errors with the command name
async fn dispatch(cli: Cli) -> Result<(), (&'static str, DocketError)> {
    match cli.command {
        Commands::Init { force } => cmd_init(force).map_err(|e| ("init", e)),
        Commands::List { tags } => {
            let app = bootstrap(cli.config.as_deref()).await.map_err(|e| ("list", e))?;
            cmd_list(&app, tags.as_deref()).await.map_err(|e| ("list", e))
        }
        Commands::Get { name } => {
            let app = bootstrap(cli.config.as_deref()).await.map_err(|e| ("get", e))?;
            cmd_get(&app, &name).await.map_err(|e| ("get", e))
        }
        Commands::Run { name, params, max_rows, caller_id } => {
            let app = bootstrap(cli.config.as_deref()).await.map_err(|e| ("run", e))?;
            cmd_run(&app, &name, params.as_deref(), max_rows, caller_id.as_deref())
                .await
                .map_err(|e| ("run", e))
        }
        Commands::Mcp {} => {
            let app = bootstrap(cli.config.as_deref()).await.map_err(|e| ("mcp", e))?;
            docket::mcp::serve(Arc::new(app))
                .await
                .map_err(|e| ("mcp", DocketError::config(format!("MCP server failed: {e}"))))
        }
    }
}

/// Resolve settings and build process-wide state
async fn bootstrap(explicit_config: Option<&std::path::Path>) -> docket::Result<App> {
    let settings = Settings::resolve(explicit_config)?;
    App::bootstrap(settings).await
}

/// `docket init`: prompt for the deployment basics, write the local config,
/// and create the registry schema
fn cmd_init(force: bool) -> docket::Result<()> {
    use dialoguer::{Confirm, Input};

    let config_path = local_config_path()?;
    if config_path.exists() && !force {
        return Err(DocketError::config(format!(
            "Config file {} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    let prompt_err = |e: dialoguer::Error| DocketError::config(format!("Prompt failed: {e}"));

    let defaults = Settings::default();
    let database_path: String = Input::new()
        .with_prompt("Database file")
        .default(defaults.database_path.display().to_string())
        .interact_text()
        .map_err(prompt_err)?;
    let deployment_tier: String = Input::new()
        .with_prompt("Deployment tier (local, dev, sit, uat, prod)")
        .default(defaults.deployment_tier.clone())
        .interact_text()
        .map_err(prompt_err)?;
    let hard_max_rows: usize = Input::new()
        .with_prompt("Hard row ceiling")
        .default(defaults.hard_max_rows)
        .interact_text()
        .map_err(prompt_err)?;
    let audit_log_path: String = Input::new()
        .with_prompt("Audit log file")
        .default(defaults.audit_log_path.display().to_string())
        .interact_text()
        .map_err(prompt_err)?;

    let settings = Settings {
        database_path: PathBuf::from(database_path),
        deployment_tier,
        hard_max_rows,
        audit_log_path: PathBuf::from(audit_log_path),
        ..defaults
    };

    settings.save(&config_path)?;
    tracing::info!("Wrote config to {}", config_path.display());

    let create_schema = Confirm::new()
        .with_prompt("Create the registry schema now?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    if create_schema {
        let conn = rusqlite::Connection::open(&settings.database_path)
            .map_err(|e| DocketError::config(format!("Failed to open database: {e}")))?;
        ensure_schema(&conn)?;
        tracing::info!("Registry schema ready in {}", settings.database_path.display());
    }

    let envelope = SuccessEnvelope::new(
        "init",
        serde_json::json!({
            "config_path": config_path,
            "database_path": settings.database_path,
            "deployment_tier": settings.deployment_tier,
            "schema_created": create_schema,
        }),
        Metadata::new(0),
    );
    println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    Ok(())
}

/// `docket list`
async fn cmd_list(app: &App, tags: Option<&str>) -> docket::Result<()> {
    let started = Instant::now();
    let summaries = app.list_queries(tags).await?;

    let envelope = SuccessEnvelope::new(
        "list",
        summaries,
        Metadata::new(started.elapsed().as_millis() as u64),
    );
    println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    Ok(())
}

/// `docket get`
async fn cmd_get(app: &App, name: &str) -> docket::Result<()> {
    let started = Instant::now();
    let query = app.get_query(name).await?;

    let envelope =
        SuccessEnvelope::new("get", query, Metadata::new(started.elapsed().as_millis() as u64));
    println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    Ok(())
}

/// `docket run`
async fn cmd_run(
    app: &App,
    name: &str,
    params: Option<&str>,
    max_rows: Option<usize>,
    caller_id: Option<&str>,
) -> docket::Result<()> {
    let parameters = match params {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                return Err(DocketError::config("--params must be a JSON object".to_string()));
            }
            Err(e) => {
                return Err(DocketError::config(format!("--params is not valid JSON: {e}")));
            }
        },
        None => serde_json::Map::new(),
    };

    let started = Instant::now();
    let rows = app.run_query(name, &parameters, max_rows, caller_id).await?;

    let count = rows.len();
    let envelope = SuccessEnvelope::new(
        "run",
        rows,
        Metadata::with_rows(started.elapsed().as_millis() as u64, count),
    );
    println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    Ok(())
}
