//! Pipeline states of a backup run.
//!
//! ```text
//! Init → FoldersReady → DatabaseArchived → MediaArchived → BundleArchived
//!      → CleanedUp → Uploaded → Reported → Done
//! ```
//!
//! Strictly sequential; a failure ends the run in `Failed(stage, cause)`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    FoldersReady,
    DatabaseArchived,
    MediaArchived,
    BundleArchived,
    CleanedUp,
    Uploaded,
    Reported,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Init,
        Stage::FoldersReady,
        Stage::DatabaseArchived,
        Stage::MediaArchived,
        Stage::BundleArchived,
        Stage::CleanedUp,
        Stage::Uploaded,
        Stage::Reported,
        Stage::Done,
    ];

    /// The only state reachable from `self`, or `None` once done.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::FoldersReady),
            Stage::FoldersReady => Some(Stage::DatabaseArchived),
            Stage::DatabaseArchived => Some(Stage::MediaArchived),
            Stage::MediaArchived => Some(Stage::BundleArchived),
            Stage::BundleArchived => Some(Stage::CleanedUp),
            Stage::CleanedUp => Some(Stage::Uploaded),
            Stage::Uploaded => Some(Stage::Reported),
            Stage::Reported => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::FoldersReady => "folders-ready",
            Stage::DatabaseArchived => "database-archived",
            Stage::MediaArchived => "media-archived",
            Stage::BundleArchived => "bundle-archived",
            Stage::CleanedUp => "cleaned-up",
            Stage::Uploaded => "uploaded",
            Stage::Reported => "reported",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}
