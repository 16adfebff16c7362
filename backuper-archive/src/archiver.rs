//! Archiver collaborator.
//!
//! The orchestrator only sees the [`Archiver`] trait; [`TarArchiver`] drives a
//! GNU tar subprocess. Archive runs append their verbose listing and totals to
//! the compression log handed in by the caller. There is no timeout: a hung
//! subprocess hangs the run.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{io_err, ArchiveError};

/// Result of a successful archive or compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub archive: PathBuf,
    pub size_bytes: u64,
    pub elapsed: Duration,
}

/// External archiving tool.
pub trait Archiver {
    /// Archive the tree at `source` into `destination`.
    ///
    /// With `manifest`, only entries changed since the manifest's recorded
    /// state are stored and the manifest is updated in place. Without it the
    /// whole tree is stored. Tool output is appended to `log`.
    fn archive(
        &self,
        source: &Path,
        destination: &Path,
        manifest: Option<&Path>,
        log: &File,
    ) -> Result<ArchiveSummary, ArchiveError>;

    /// Compress the single file `input` into a gzip'd tar at `output`.
    /// Tool output is appended to `log`.
    fn compress_file(
        &self,
        input: &Path,
        output: &Path,
        log: &File,
    ) -> Result<ArchiveSummary, ArchiveError>;
}

/// GNU tar driven as a subprocess.
#[derive(Debug, Clone)]
pub struct TarArchiver {
    program: PathBuf,
}

impl TarArchiver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for an archive run, entries stored relative to the parent of
    /// `source`.
    pub(crate) fn archive_args(
        source: &Path,
        destination: &Path,
        manifest: Option<&Path>,
    ) -> Vec<String> {
        let mut args: Vec<String> = [
            "--create",
            "--verbose",
            "--preserve-permissions",
            "--ignore-failed-read",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        if let Some(manifest) = manifest {
            args.push("--recursion".to_string());
            args.push(format!("--listed-incremental={}", manifest.display()));
        }
        args.push("--totals".to_string());
        args.push(format!("--file={}", destination.display()));
        let (dir, name) = split_parent(source);
        args.push(format!("--directory={}", dir.display()));
        args.push(name);
        args
    }

    pub(crate) fn compress_args(input: &Path, output: &Path) -> Vec<String> {
        let (dir, name) = split_parent(input);
        vec![
            "--create".to_string(),
            "--gzip".to_string(),
            format!("--file={}", output.display()),
            format!("--directory={}", dir.display()),
            name,
        ]
    }

    fn run(
        &self,
        args: &[String],
        source: &Path,
        destination: &Path,
        stdout: Stdio,
        stderr: Stdio,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let started = Instant::now();
        tracing::debug!(program = %self.program.display(), ?args, "spawning archiver");
        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|e| ArchiveError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;
        if !status.success() {
            tracing::error!(source = %source.display(), %status, "archiver failed");
            return Err(ArchiveError::Failed {
                source_path: source.to_path_buf(),
                status,
            });
        }
        let size_bytes = std::fs::metadata(destination)
            .map_err(|e| io_err(destination, e))?
            .len();
        Ok(ArchiveSummary {
            archive: destination.to_path_buf(),
            size_bytes,
            elapsed: started.elapsed(),
        })
    }
}

impl Default for TarArchiver {
    fn default() -> Self {
        Self::new("tar")
    }
}

impl Archiver for TarArchiver {
    fn archive(
        &self,
        source: &Path,
        destination: &Path,
        manifest: Option<&Path>,
        log: &File,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let args = Self::archive_args(source, destination, manifest);
        let (stdout, stderr) = log_pipes(log, destination)?;
        self.run(&args, source, destination, stdout, stderr)
    }

    fn compress_file(
        &self,
        input: &Path,
        output: &Path,
        log: &File,
    ) -> Result<ArchiveSummary, ArchiveError> {
        if !input.is_file() {
            return Err(ArchiveError::SourceMissing(input.to_path_buf()));
        }
        let args = Self::compress_args(input, output);
        let (stdout, stderr) = log_pipes(log, output)?;
        self.run(&args, input, output, stdout, stderr)
    }
}

/// Two handles onto `log` for a child's stdout and stderr.
fn log_pipes(log: &File, destination: &Path) -> Result<(Stdio, Stdio), ArchiveError> {
    let stdout = log.try_clone().map_err(|e| io_err(destination, e))?;
    let stderr = log.try_clone().map_err(|e| io_err(destination, e))?;
    Ok((stdout.into(), stderr.into()))
}

fn split_parent(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());
    (dir, name)
}
