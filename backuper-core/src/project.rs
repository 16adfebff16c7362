//! On-disk project resolution.
//!
//! # Layout
//!
//! ```text
//! <projects>/
//!   <title>/        project root (database name = title)
//!     media/        incrementally archived
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::ProjectTitle;

/// Name of the media folder inside a project root.
pub const MEDIA_DIR: &str = "media";

/// A project whose root and media folders were verified to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub title: ProjectTitle,
    pub root: PathBuf,
    pub media: PathBuf,
}

impl Project {
    /// Resolve `title` under `projects_dir`.
    ///
    /// A missing folder is a configuration error, not a retryable one.
    pub fn open(title: ProjectTitle, projects_dir: &Path) -> Result<Self, ConfigError> {
        let root = projects_dir.join(title.as_str());
        if !root.is_dir() {
            return Err(ConfigError::MissingDirectory {
                what: "project",
                project: title.to_string(),
                path: root,
            });
        }
        let media = root.join(MEDIA_DIR);
        if !media.is_dir() {
            return Err(ConfigError::MissingDirectory {
                what: "media",
                project: title.to_string(),
                path: media,
            });
        }
        Ok(Self { title, root, media })
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.title.fmt(f)
    }
}
