//! Incremental manifest lifecycle.
//!
//! The manifest is an opaque change-tracking file owned by the archiver. One
//! baseline exists per project and month, named after that month's monthly
//! identifier: `<project>-m-01-<mm>-<yy>.inc`.
//!
//! ## Protocol
//!
//! 1. Bootstrap: create the baseline empty if it does not exist yet.
//! 2. Copy the baseline to `<project>-m-01-<mm>-<yy>.new.inc`.
//! 3. The archiver mutates the working copy.
//! 4. On success only, rename the working copy over the baseline.
//!
//! The baseline is never written in place, so an interrupted archiver pass
//! leaves the next run the same starting state.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use backuper_core::index;

use crate::error::{manifest_io_err, ManifestError};

/// Extension of a committed manifest.
pub const MANIFEST_SUFFIX: &str = ".inc";

/// Extension of a working copy; never matches a committed name.
pub const WORKING_SUFFIX: &str = ".new.inc";

/// `<manifest_dir>/<project>-m-01-<mm>-<yy>.inc`: pure, no I/O.
pub fn baseline_path(
    project: &str,
    month: u32,
    year: i32,
    manifest_dir: &Path,
) -> Result<PathBuf, ManifestError> {
    let id = index::baseline_identifier(project, month, year)?;
    Ok(manifest_dir.join(id.manifest_file_name()))
}

/// Working-copy path for a baseline path: pure, no I/O.
pub fn working_path(baseline: &Path) -> PathBuf {
    let name = baseline
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(MANIFEST_SUFFIX).unwrap_or(&name);
    baseline.with_file_name(format!("{stem}{WORKING_SUFFIX}"))
}

/// A staged copy of a baseline manifest, ready to hand to the archiver.
#[derive(Debug)]
#[must_use = "a working manifest must be committed or abandoned"]
pub struct WorkingManifest {
    working: PathBuf,
    baseline: PathBuf,
    bootstrapped: bool,
}

impl WorkingManifest {
    /// Path the archiver should update.
    pub fn path(&self) -> &Path {
        &self.working
    }

    /// Path the working copy replaces on commit.
    pub fn baseline(&self) -> &Path {
        &self.baseline
    }

    /// `true` when this run created the baseline (first run of the month).
    pub fn bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Promote the working copy to be the new baseline.
    pub fn commit(self) -> Result<PathBuf, ManifestError> {
        commit(&self.working, &self.baseline)?;
        Ok(self.baseline)
    }

    /// Drop the working copy after a failed archiver pass. The baseline is
    /// left untouched.
    pub fn abandon(self) -> Result<(), ManifestError> {
        match fs::remove_file(&self.working) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(manifest_io_err(&self.working, e)),
        }
    }
}

/// Stage a working copy of the baseline for `(project, month, year)`.
///
/// Creates the baseline empty when none exists yet, so the first run of a
/// month archives everything. A leftover working copy from an interrupted
/// run is overwritten.
pub fn prepare_working_manifest(
    project: &str,
    baseline_month: u32,
    baseline_year: i32,
    manifest_dir: &Path,
) -> Result<WorkingManifest, ManifestError> {
    let baseline = baseline_path(project, baseline_month, baseline_year, manifest_dir)?;

    let bootstrapped = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&baseline)
    {
        Ok(_) => {
            tracing::info!(manifest = %baseline.display(), "created empty baseline manifest");
            true
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
        Err(e) => return Err(manifest_io_err(&baseline, e)),
    };

    let working = working_path(&baseline);
    fs::copy(&baseline, &working).map_err(|e| manifest_io_err(&working, e))?;
    tracing::debug!(
        baseline = %baseline.display(),
        working = %working.display(),
        "staged working manifest"
    );

    Ok(WorkingManifest {
        working,
        baseline,
        bootstrapped,
    })
}

/// Atomically replace `baseline` with `working`.
///
/// Single `rename`: either the baseline holds the new content and the working
/// file is gone, or both paths are exactly as they were.
pub fn commit(working: &Path, baseline: &Path) -> Result<(), ManifestError> {
    fs::rename(working, baseline).map_err(|e| manifest_io_err(baseline, e))?;
    tracing::info!(manifest = %baseline.display(), "committed incremental manifest");
    Ok(())
}
