//! Error types for backuper-run.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use backuper_archive::{ArchiveError, ManifestError};
use backuper_core::ConfigError;

use crate::stage::Stage;

/// Database dump failures.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dump of database '{database}' failed ({status}): {stderr}")]
    Failed {
        database: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Remote transfer failures. The local bundle is always kept.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {path} for upload: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote store rejected {url} with status {status}")]
    Rejected { url: String, status: u16 },

    #[error("transfer to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Notification failures. Logged only; never fails a run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report webhook {url} failed: {message}")]
    Delivery { url: String, message: String },
}

/// Cause of a failed run.
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Another run of the same project holds the lock.
    #[error("project is locked by {path}; remove it if no backup is running")]
    Locked { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    Archiving(#[from] ArchiveError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Terminal `Failed(stage, cause)` state of a run.
///
/// `stage` is the state the run was trying to reach when `cause` occurred.
/// Every cause is also written to the run log, except failures at
/// [`Stage::FoldersReady`] that occur before the log file was created
/// (identifier, backups folder, lock, the log file itself).
#[derive(Debug, Error)]
#[error("backup failed before reaching {stage}")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub cause: RunFailure,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunFailure {
    RunFailure::Io {
        path: path.into(),
        source,
    }
}
