//! Configuration Management
//!
//! This module handles loading and saving service settings.
//!
//! # Configuration Locations
//! - Local: `.docket/config.json` (team-shareable, per-project)
//! - Global: `~/.config/docket/config.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Explicit `--config` path (highest priority, must exist)
//! 2. Local config file (`.docket/config.json`)
//! 3. Global config file (`~/.config/docket/config.json`)
//! 4. Built-in defaults
//!
//! Environment overrides (`DOCKET_DATABASE`, `DOCKET_TIER`,
//! `DOCKET_HARD_MAX_ROWS`, `DOCKET_AUDIT_LOG`) are applied after file load,
//! so a deployment can pin the database path or tier without editing files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DocketError, Result};

/// Service settings
///
/// Every field has a default so a partial (or absent) config file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database file holding the registry, data tables, and the
    /// durable audit sink
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Number of pooled connections opened at bootstrap
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Deployment-wide row ceiling; no caller-requested limit may exceed it
    #[serde(default = "default_hard_max_rows")]
    pub hard_max_rows: usize,

    /// Row limit applied when a caller does not request one
    #[serde(default = "default_max_rows")]
    pub default_max_rows: usize,

    /// Local append-only audit log file (one JSON line per execution)
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: PathBuf,

    /// Bounded queue depth between the pipeline and the audit workers
    #[serde(default = "default_audit_queue_depth")]
    pub audit_queue_depth: usize,

    /// Number of background audit workers
    #[serde(default = "default_audit_workers")]
    pub audit_workers: usize,

    /// Deployment tier name; masking activates in upper tiers (uat, prod)
    #[serde(default = "default_deployment_tier")]
    pub deployment_tier: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("docket.db")
}

fn default_pool_size() -> usize {
    4
}

fn default_hard_max_rows() -> usize {
    2000
}

fn default_max_rows() -> usize {
    500
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("docket-audit.log")
}

fn default_audit_queue_depth() -> usize {
    256
}

fn default_audit_workers() -> usize {
    2
}

fn default_deployment_tier() -> String {
    "local".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
            hard_max_rows: default_hard_max_rows(),
            default_max_rows: default_max_rows(),
            audit_log_path: default_audit_log_path(),
            audit_queue_depth: default_audit_queue_depth(),
            audit_workers: default_audit_workers(),
            deployment_tier: default_deployment_tier(),
        }
    }
}

/// Get path to local config file (`.docket/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()
        .map_err(|e| DocketError::config(format!("Could not determine current directory: {e}")))?;

    Ok(current_dir.join(".docket").join("config.json"))
}

/// Get path to global config file (`~/.config/docket/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| DocketError::config("Could not determine user config directory"))?;

    Ok(config_dir.join("docket").join("config.json"))
}

impl Settings {
    /// Load settings from a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            DocketError::config(format!("Could not read config file {}: {e}", path.display()))
        })?;

        serde_json::from_str(&contents)
            .map_err(|e| DocketError::config(format!("Invalid config file format: {e}")))
    }

    /// Resolve settings using the standard precedence order
    ///
    /// An explicit path must exist; the local and global files are optional
    /// fallbacks. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = if let Some(path) = explicit {
            Self::load_from(path)?
        } else {
            let local = local_config_path()?;
            let global = global_config_path()?;
            if local.exists() {
                Self::load_from(&local)?
            } else if global.exists() {
                Self::load_from(&global)?
            } else {
                Self::default()
            }
        };

        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Apply `DOCKET_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    ///
    /// The lookup is injected so tests can exercise override handling
    /// without mutating the process environment.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var("DOCKET_DATABASE") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(tier) = var("DOCKET_TIER") {
            self.deployment_tier = tier;
        }
        if let Some(raw) = var("DOCKET_HARD_MAX_ROWS") {
            self.hard_max_rows = raw.parse().map_err(|_| {
                DocketError::config(format!("DOCKET_HARD_MAX_ROWS is not a valid integer: {raw}"))
            })?;
        }
        if let Some(path) = var("DOCKET_AUDIT_LOG") {
            self.audit_log_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Save settings to a config file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DocketError::config(format!("Could not create config directory: {e}"))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| DocketError::config(format!("Could not serialize config: {e}")))?;

        fs::write(path, contents)
            .map_err(|e| DocketError::config(format!("Could not write config file: {e}")))
    }
}
