//! Error types for backuper-archive.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use backuper_core::ConfigError;

/// Failures of the archiver collaborator.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archiver program could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archiver ran and exited unsuccessfully.
    #[error("archiving {source_path} failed ({status})")]
    Failed {
        source_path: PathBuf,
        status: ExitStatus,
    },

    /// The single-file compressor was given something that is not a file.
    #[error("{0} is not a file or not found")]
    SourceMissing(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while staging or promoting an incremental manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest naming: {0}")]
    Naming(#[from] ConfigError),

    #[error("manifest I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn manifest_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}
