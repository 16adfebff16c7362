//! # backuper-run
//!
//! The backup pipeline and its collaborators.
//!
//! Build a [`Backuper`] from a [`backuper_core::Config`], a resolved
//! [`backuper_core::Project`] and a set of [`Collaborators`], then call
//! [`Backuper::backup`]. A run ends either in [`Stage::Done`] with a
//! [`RunSummary`] or in a [`RunError`] naming the stage that failed.

pub mod dumper;
pub mod error;
pub mod files;
pub mod lock;
pub mod notifier;
pub mod orchestrator;
pub mod run_log;
pub mod stage;
pub mod uploader;

pub use dumper::{Dumper, PgDumper};
pub use error::{DumpError, ReportError, RunError, RunFailure, UploadError};
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use orchestrator::{Backuper, Collaborators, RunSummary, MEDIA_ARCHIVE};
pub use stage::Stage;
pub use uploader::{HttpUploader, SkipUpload, Uploader};
