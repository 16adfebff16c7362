//! YAML configuration.
//!
//! # Resolution order
//!
//! 1. explicit path (`--config`)
//! 2. `$BACKUPER_CONFIG`
//! 3. `<home>/.backuper/config.yaml`
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit file; used in tests with `TempDir`
//! - `load()`: derives the path as above, delegates to `load_at`
//!
//! The loaded [`Config`] is built once and handed by reference to the
//! orchestrator and collaborator constructors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "BACKUPER_CONFIG";

/// Root of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Folder containing one sub-folder per project.
    pub projects: PathBuf,
    /// Folder receiving bundles, logs and manifests. Created if absent.
    pub backups: PathBuf,
    #[serde(default)]
    pub archiver: ArchiverConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportConfig>,
}

/// Archiver subprocess settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiverConfig {
    /// GNU tar executable.
    #[serde(default = "default_archiver_program")]
    pub program: PathBuf,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            program: default_archiver_program(),
        }
    }
}

/// Database dump settings. The database name is the project title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_dumper_program")]
    pub program: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Passed through the environment, never on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            program: default_dumper_program(),
            host: None,
            port: None,
            user: None,
            password: None,
        }
    }
}

/// Remote store receiving finished bundles over HTTP `PUT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
}

/// Webhook receiving the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub webhook: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_archiver_program() -> PathBuf {
    PathBuf::from("tar")
}

fn default_dumper_program() -> PathBuf {
    PathBuf::from("pg_dump")
}

fn default_upload_timeout() -> u64 {
    3600
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.backuper/config.yaml`: pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".backuper").join("config.yaml")
}

/// Path used by [`load`]: `$BACKUPER_CONFIG` or the home default.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(default_path_at(&home()?))
}

/// Load the configuration file at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&default_path()?)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
