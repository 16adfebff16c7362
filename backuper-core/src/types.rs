//! Domain types for backup naming.
//!
//! Identifiers are built only through [`crate::index`], which range-checks their parts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A validated project title.
///
/// The title names the project folder, the database and every artifact of a
/// run, so it must be a single non-empty path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectTitle(String);

impl ProjectTitle {
    pub fn new(title: impl Into<String>) -> Result<Self, ConfigError> {
        let title = title.into();
        let reason = if title.trim().is_empty() {
            Some("title must not be empty")
        } else if title == "." || title == ".." {
            Some("title must not be a relative path marker")
        } else if title.contains(['/', '\\']) {
            Some("title must not contain path separators")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ConfigError::InvalidProject { title, reason }),
            None => Ok(Self(title)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ProjectTitle {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ProjectTitle {
    type Error = ConfigError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectTitle> for String {
    fn from(t: ProjectTitle) -> Self {
        t.0
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Rotation class of a backup.
///
/// `Monthly` is the baseline; `Daily` is incremental relative to the manifest
/// of the current month's monthly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupClass {
    Daily,
    Monthly,
}

impl BackupClass {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupClass::Daily => "daily",
            BackupClass::Monthly => "monthly",
        }
    }

    /// Single-letter tag used in identifiers.
    pub fn letter(self) -> char {
        match self {
            BackupClass::Daily => 'd',
            BackupClass::Monthly => 'm',
        }
    }
}

impl fmt::Display for BackupClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(BackupClass::Daily),
            "monthly" | "m" => Ok(BackupClass::Monthly),
            _ => Err(ConfigError::UnknownClass(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Canonical name of one backup run: `<project>-<c>-<dd>-<mm>-<yy>`.
///
/// Built only by [`crate::index`], which validates the ranges. Every artifact
/// of a run is named after its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupIdentifier {
    project: ProjectTitle,
    class: BackupClass,
    day: u32,
    month: u32,
    year: i32,
}

impl BackupIdentifier {
    pub(crate) fn new(
        project: ProjectTitle,
        class: BackupClass,
        day: u32,
        month: u32,
        year: i32,
    ) -> Self {
        Self {
            project,
            class,
            day,
            month,
            year,
        }
    }

    pub fn project(&self) -> &ProjectTitle {
        &self.project
    }

    pub fn class(&self) -> BackupClass {
        self.class
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// `<identifier>.tar`: the bundle in the backups directory.
    pub fn bundle_file_name(&self) -> String {
        format!("{self}.tar")
    }

    /// `<identifier>-backup.log.txt`: the per-run text log.
    pub fn run_log_file_name(&self) -> String {
        format!("{self}-backup.log.txt")
    }

    /// `<identifier>-compress.txt`: archiver output of the run.
    pub fn compress_log_file_name(&self) -> String {
        format!("{self}-compress.txt")
    }

    /// `<identifier>.inc`: incremental manifest; only meaningful for the
    /// monthly identifier of a month.
    pub fn manifest_file_name(&self) -> String {
        format!("{self}.inc")
    }
}

impl fmt::Display for BackupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:02}-{:02}-{:02}",
            self.project,
            self.class.letter(),
            self.day,
            self.month,
            self.year.rem_euclid(100)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
