//! Backuper core library: naming scheme, project layout, configuration.
//!
//! - [`types`]: project title, backup class, identifier
//! - [`index`]: date → identifier resolution and rotation policy
//! - [`project`]: on-disk project resolution
//! - [`config`]: YAML configuration load
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod index;
pub mod project;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use project::Project;
pub use types::{BackupClass, BackupIdentifier, ProjectTitle};
