//! Error types for backuper-core.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration and precondition failures.
///
/// These are fatal and never retried: they are raised before a run touches
/// any artifact on disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Project title was empty or not usable as a single path component.
    #[error("invalid project title '{title}': {reason}")]
    InvalidProject { title: String, reason: &'static str },

    #[error("day {0} is out of range (expected 1..=31)")]
    DayOutOfRange(u32),

    #[error("month {0} is out of range (expected 1..=12)")]
    MonthOutOfRange(u32),

    #[error("year {0} is out of range (expected 1..=9999)")]
    YearOutOfRange(i32),

    /// A backup class string that is not one of daily, monthly, d, m.
    #[error("unknown backup class '{0}'; expected: daily, monthly, d, m")]
    UnknownClass(String),

    /// A directory the project layout requires is absent.
    #[error("{what} folder {path} does not exist for project '{project}'")]
    MissingDirectory {
        what: &'static str,
        project: String,
        path: PathBuf,
    },

    /// The configuration file did not exist at the expected path.
    #[error("configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`ConfigError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
