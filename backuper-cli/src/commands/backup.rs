//! `backuper <project> backup [daily|monthly|d|m]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use backuper_archive::TarArchiver;
use backuper_core::{Config, Project, ProjectTitle};
use backuper_run::files::human_size;
use backuper_run::{
    Backuper, Collaborators, HttpUploader, LogNotifier, Notifier, PgDumper, SkipUpload,
    Uploader, WebhookNotifier,
};

use super::super::BackupClassArg;

/// Run one backup of the project.
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// daily | monthly | d | m. Omit to pick by day of month (the 1st is
    /// monthly).
    #[arg(value_name = "CLASS")]
    pub class: Option<BackupClassArg>,
}

impl BackupArgs {
    pub fn run(self, config: &Config, project: &str) -> Result<()> {
        let title = ProjectTitle::new(project)?;
        let project = Project::open(title, &config.projects)
            .with_context(|| format!("cannot back up project '{project}'"))?;

        let archiver = TarArchiver::new(config.archiver.program.clone());
        let dumper = PgDumper::from_config(&config.database);
        let uploader: Box<dyn Uploader> = match &config.upload {
            Some(upload) => Box::new(HttpUploader::from_config(upload)),
            None => Box::new(SkipUpload),
        };
        let notifier: Box<dyn Notifier> = match &config.report {
            Some(report) => Box::new(WebhookNotifier::from_config(report)),
            None => Box::new(LogNotifier),
        };
        let collaborators = Collaborators {
            archiver: &archiver,
            dumper: &dumper,
            uploader: uploader.as_ref(),
            notifier: notifier.as_ref(),
        };

        let backuper = Backuper::new(
            config,
            project,
            self.class.map(Into::into),
            collaborators,
        );
        let summary = backuper
            .backup()
            .with_context(|| format!("backup of '{}' failed", backuper.project()))?;

        println!(
            "{} Backup {} completed in {}s",
            "✓".green().bold(),
            summary.identifier,
            summary.elapsed.as_secs()
        );
        println!(
            "  Bundle:  {} ({})",
            summary.bundle.display(),
            human_size(summary.bundle_size)
        );
        println!("  SHA-256: {}", summary.bundle_digest);
        println!("  Log:     {}", summary.run_log.display());
        if let Some(message) = &summary.report_error {
            println!("{} report not delivered: {message}", "!".yellow().bold());
        }
        Ok(())
    }
}
