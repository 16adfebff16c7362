//! # backuper-archive
//!
//! Archiver collaborator and incremental manifest lifecycle.
//!
//! Call [`manifest::prepare_working_manifest`] to stage a manifest, hand
//! [`manifest::WorkingManifest::path`] to an [`Archiver`], then commit or
//! abandon the staged copy depending on the archiver's result.

pub mod archiver;
pub mod error;
pub mod manifest;

pub use archiver::{ArchiveSummary, Archiver, TarArchiver};
pub use error::{ArchiveError, ManifestError};
pub use manifest::{prepare_working_manifest, WorkingManifest};
