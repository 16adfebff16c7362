//! Per-run text log.
//!
//! `<backups>/<identifier>-backup.log.txt`, truncated when a run starts.
//! Lines read `DD.MM.YY HH:MM:SS [LEVEL] message` in local time and are
//! mirrored to `tracing`. The notifier receives the whole file as the report
//! body.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{io_err, RunFailure};

const TIMESTAMP_FORMAT: &str = "%d.%m.%y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARNING",
            Level::Error => "CRITICAL",
        }
    }
}

/// Append-only log of one run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    out: BufWriter<File>,
}

impl RunLog {
    /// Create (or truncate) the log at `path`.
    pub fn create(path: &Path) -> Result<Self, RunFailure> {
        let file = File::create(path).map_err(|e| io_err(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.write(Level::Info, message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.write(Level::Warn, message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.write(Level::Error, message.as_ref());
    }

    /// Record one line. A log that can no longer be written must not abort
    /// the backup itself, so write failures only reach `tracing`.
    pub fn write(&mut self, level: Level, message: &str) {
        match level {
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        if let Err(err) = writeln!(self.out, "{stamp} [{}] {message}", level.tag()) {
            tracing::warn!(path = %self.path.display(), error = %err, "run log write failed");
        }
    }

    /// Flush and return everything logged so far.
    pub fn read_back(&mut self) -> Result<String, RunFailure> {
        self.out.flush().map_err(|e| io_err(&self.path, e))?;
        std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}
