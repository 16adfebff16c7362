//! Backuper: database and media backups for hosted projects.
//!
//! # Usage
//!
//! ```text
//! backuper [--config <path>] <project> backup [daily|monthly|d|m]
//! backuper [--config <path>] <project> restore <date>
//! ```

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use backuper_core::{config, BackupClass, Config};
use commands::{backup::BackupArgs, restore::RestoreArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "backuper",
    version,
    about = "Back up a project's database and media files",
    long_about = None,
)]
struct Cli {
    /// Configuration file. Defaults to $BACKUPER_CONFIG, then
    /// ~/.backuper/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project folder name under `projects`; also the database name.
    project: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump the database, archive new media files and bundle both.
    Backup(BackupArgs),

    /// Restore a backup taken on <date> (not implemented).
    Restore(RestoreArgs),
}

// ---------------------------------------------------------------------------
// Shared BackupClass argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `BackupClass` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct BackupClassArg(pub BackupClass);

impl FromStr for BackupClassArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<BackupClass>()
            .map(Self)
            .map_err(|e| e.to_string())
    }
}

impl fmt::Display for BackupClassArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<BackupClassArg> for BackupClass {
    fn from(c: BackupClassArg) -> Self {
        c.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Backup(args) => {
            let config = load_config(cli.config.as_deref())?;
            args.run(&config, &cli.project)
        }
        Commands::Restore(args) => args.run(&cli.project),
    }
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    match explicit {
        Some(path) => config::load_at(path)
            .with_context(|| format!("failed to load configuration '{}'", path.display())),
        None => config::load().context(
            "failed to load configuration; pass --config or set BACKUPER_CONFIG",
        ),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
