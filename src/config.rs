//! Migration configuration: loading, persistence, defaults.
//!
//! A configuration is an immutable input; one configuration drives exactly
//! one run. The orchestrator only reads it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to parse config `{path}`: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("failed to write config `{path}`: {reason}")]
    Write { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Root directory for the batch and per-artifact reports.
    pub reports_path: PathBuf,
    pub source: RepositoryConfig,
    pub target: RepositoryConfig,
    /// Schema version expected of source metadata descriptors.
    pub source_schema: String,
    /// Path fragments excluded from discovery.
    pub blacklist: Vec<String>,
    /// Reprocess artifacts even when the target is present and not stale.
    pub force: bool,
    /// Perform no writes to the target tree; only validate and report.
    pub report_only: bool,
    pub mail: MailConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            reports_path: PathBuf::from("reports"),
            source: RepositoryConfig {
                path: PathBuf::from("source"),
                layout: "flat".to_string(),
            },
            target: RepositoryConfig {
                path: PathBuf::from("target"),
                layout: "hierarchical".to_string(),
            },
            source_schema: "v1".to_string(),
            blacklist: Vec::new(),
            force: false,
            report_only: false,
            mail: MailConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub path: PathBuf,
    pub layout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Send the batch report by mail when the run recorded at least one error.
    pub error_report: bool,
    pub subject: String,
    pub from_name: String,
    pub from_address: String,
    pub to_name: String,
    pub to_address: String,
    pub smtp_relay: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            error_report: false,
            subject: "repository migration error report".to_string(),
            from_name: String::new(),
            from_address: String::new(),
            to_name: String::new(),
            to_address: String::new(),
            smtp_relay: "localhost".to_string(),
        }
    }
}

pub fn load(path: &Path) -> Result<MigrationConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn write_config(path: &Path, config: &MigrationConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to render config: {e}"),
    })?;
    atomic_write(path, contents.as_bytes())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to create temp file in {}: {e}", dir.display()),
    })?;
    fs::write(temp.path(), data).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        reason: format!("failed to write config temp file: {e}"),
    })?;
    temp.persist(path).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}
