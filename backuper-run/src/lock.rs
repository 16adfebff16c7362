//! Per-project run lock.
//!
//! `<backups>/<title>.lock` is created with create-new semantics, so two runs
//! of one project can never share a work folder or a manifest baseline. The
//! file is removed when the guard drops. A lock left behind by a killed
//! process has to be removed by hand.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use backuper_core::ProjectTitle;

use crate::error::{io_err, RunFailure};

/// `<backups>/<title>.lock`: pure, no I/O.
pub fn lock_path(backups_dir: &Path, project: &ProjectTitle) -> PathBuf {
    backups_dir.join(format!("{project}.lock"))
}

/// Held for the lifetime of one run.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(backups_dir: &Path, project: &ProjectTitle) -> Result<Self, RunFailure> {
        let path = lock_path(backups_dir, project);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RunFailure::Locked { path });
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        let lock = Self { path };
        writeln!(
            file,
            "pid={} started={}",
            std::process::id(),
            Local::now().to_rfc3339()
        )
        .map_err(|e| io_err(&lock.path, e))?;
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release run lock");
        }
    }
}
