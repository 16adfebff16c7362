//! Backup orchestration.
//!
//! One call to [`Backuper::backup`] walks the [`Stage`] pipeline:
//!
//! 1. resolve the identifier, take the project lock, open the run logs,
//!    create a fresh work folder
//! 2. dump the database and compress it to `<title>.dump.tar.gz`
//! 3. archive the media folder incrementally, commit the manifest
//! 4. archive the work folder into `<identifier>.tar`
//! 5. remove the work folder, close the compression log
//! 6. upload the bundle
//! 7. send the run log and compression log (best-effort)
//!
//! Any failure before step 7 ends the run as `Failed(stage, cause)`; nothing
//! is retried and later stages never run.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use backuper_archive::{manifest, Archiver};
use backuper_core::{index, BackupClass, BackupIdentifier, Config, Project};

use crate::dumper::Dumper;
use crate::error::{io_err, RunError, RunFailure};
use crate::files::{file_digest, human_size, size_of};
use crate::lock::RunLock;
use crate::notifier::Notifier;
use crate::run_log::RunLog;
use crate::stage::Stage;
use crate::uploader::Uploader;

/// File name of the incremental media archive inside the work folder.
pub const MEDIA_ARCHIVE: &str = "media.tar";

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// External collaborators of a run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub archiver: &'a dyn Archiver,
    pub dumper: &'a dyn Dumper,
    pub uploader: &'a dyn Uploader,
    pub notifier: &'a dyn Notifier,
}

/// Outcome of a run that reached [`Stage::Done`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub identifier: BackupIdentifier,
    pub stage: Stage,
    pub bundle: PathBuf,
    pub bundle_size: u64,
    pub bundle_digest: String,
    /// Baseline manifest committed by the media stage.
    pub manifest: PathBuf,
    pub run_log: PathBuf,
    pub compress_log: PathBuf,
    pub elapsed: Duration,
    /// Set when the report could not be delivered; the run still succeeded.
    pub report_error: Option<String>,
}

/// Backs up one project. Holds no state between runs.
pub struct Backuper<'a> {
    config: &'a Config,
    project: Project,
    class: Option<BackupClass>,
    collaborators: Collaborators<'a>,
}

impl<'a> Backuper<'a> {
    /// `class = None` classifies by the day of month when the run starts.
    pub fn new(
        config: &'a Config,
        project: Project,
        class: Option<BackupClass>,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            config,
            project,
            class,
            collaborators,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Run the pipeline now (local time).
    pub fn backup(&self) -> Result<RunSummary, RunError> {
        self.backup_at(Local::now().naive_local())
    }

    /// Run the pipeline as if started at `now`.
    pub fn backup_at(&self, now: NaiveDateTime) -> Result<RunSummary, RunError> {
        let mut run = BackupRun::open(self, now)?;
        run.advance(Stage::FoldersReady, BackupRun::create_work_folder)?;
        run.advance(Stage::DatabaseArchived, BackupRun::dump_database)?;
        run.advance(Stage::MediaArchived, BackupRun::archive_media)?;
        run.advance(Stage::BundleArchived, BackupRun::archive_bundle)?;
        run.advance(Stage::CleanedUp, BackupRun::clean_up)?;
        run.advance(Stage::Uploaded, BackupRun::upload)?;
        run.report();
        Ok(run.finish())
    }
}

// ---------------------------------------------------------------------------
// One run
// ---------------------------------------------------------------------------

/// Transient state of one `backup()` call.
struct BackupRun<'r, 'a> {
    ctx: &'r Backuper<'a>,
    identifier: BackupIdentifier,
    stage: Stage,
    started: Instant,
    work_folder: PathBuf,
    bundle_path: PathBuf,
    compress_log_path: PathBuf,
    compress_log: Option<File>,
    manifest: Option<PathBuf>,
    bundle_size: u64,
    bundle_digest: String,
    report_error: Option<String>,
    log: RunLog,
    // Declared last: released after the logs are flushed.
    _lock: RunLock,
}

type Step<'r, 'a> = fn(&mut BackupRun<'r, 'a>) -> Result<(), RunFailure>;

impl<'r, 'a> BackupRun<'r, 'a> {
    /// Init: everything needed before a failure can be written to the run log.
    ///
    /// Identifier resolution, backups folder creation, the lock and the run
    /// log itself come first, so their failures reach `tracing` and the
    /// returned [`RunError`] only. Failures after the run log exists are also
    /// written to it.
    fn open(ctx: &'r Backuper<'a>, now: NaiveDateTime) -> Result<Self, RunError> {
        let fail = |cause: RunFailure| {
            tracing::error!(stage = %Stage::FoldersReady, error = %cause, "backup aborted");
            RunError {
                stage: Stage::FoldersReady,
                cause,
            }
        };

        let identifier = index::identifier_on(ctx.project.title.as_str(), now.date(), ctx.class)
            .map_err(|e| fail(e.into()))?;

        let backups = &ctx.config.backups;
        let created_backups = !backups.exists();
        if created_backups {
            fs::create_dir_all(backups).map_err(|e| fail(io_err(backups, e)))?;
        }

        let lock = RunLock::acquire(backups, &ctx.project.title).map_err(fail)?;
        let mut log =
            RunLog::create(&backups.join(identifier.run_log_file_name())).map_err(fail)?;

        log.info(format!(
            "Starting {} backup of {} as {identifier}",
            identifier.class(),
            ctx.project
        ));
        if created_backups {
            log.info(format!("Created folder {} for all backups", backups.display()));
        }

        let compress_log_path = backups.join(identifier.compress_log_file_name());
        let compress_log = match File::create(&compress_log_path) {
            Ok(file) => file,
            Err(e) => {
                let cause = io_err(&compress_log_path, e);
                log.error(format!("Stage {} failed: {cause}", Stage::FoldersReady));
                return Err(fail(cause));
            }
        };

        Ok(Self {
            ctx,
            work_folder: backups.join(identifier.to_string()),
            bundle_path: backups.join(identifier.bundle_file_name()),
            identifier,
            stage: Stage::Init,
            started: Instant::now(),
            compress_log_path,
            compress_log: Some(compress_log),
            manifest: None,
            bundle_size: 0,
            bundle_digest: String::new(),
            report_error: None,
            log,
            _lock: lock,
        })
    }

    /// Run `step` to move into `target`; on failure log the cause and stop.
    fn advance(&mut self, target: Stage, step: Step<'r, 'a>) -> Result<(), RunError> {
        debug_assert_eq!(self.stage.next(), Some(target), "stages run in order");
        match step(self) {
            Ok(()) => {
                self.stage = target;
                tracing::debug!(stage = %target, "stage reached");
                Ok(())
            }
            Err(cause) => {
                self.log.error(format!("Stage {target} failed: {cause}"));
                Err(RunError {
                    stage: target,
                    cause,
                })
            }
        }
    }

    // -- Init → FoldersReady ------------------------------------------------

    fn create_work_folder(&mut self) -> Result<(), RunFailure> {
        // The project lock rules out a concurrent owner, so an existing
        // folder is debris from an interrupted run.
        if self.work_folder.exists() {
            self.log.warn(format!(
                "Removing leftover folder {} of an interrupted run",
                self.work_folder.display()
            ));
            fs::remove_dir_all(&self.work_folder).map_err(|e| io_err(&self.work_folder, e))?;
        }
        self.log.info(format!(
            "Creating folder {} for current backup",
            self.work_folder.display()
        ));
        fs::create_dir(&self.work_folder).map_err(|e| io_err(&self.work_folder, e))
    }

    // -- FoldersReady → DatabaseArchived ------------------------------------

    fn dump_database(&mut self) -> Result<(), RunFailure> {
        let ctx = self.ctx;
        let title = &ctx.project.title;
        let dump_path = self.work_folder.join(format!("{title}.dump"));

        self.log.info(format!("Dumping database {title}"));
        let out = File::create(&dump_path).map_err(|e| io_err(&dump_path, e))?;
        ctx.collaborators.dumper.dump(title.as_str(), out)?;
        self.log
            .info(format!("Dumped to {}", human_size(size_of(&dump_path)?)));

        self.log.info("Compressing database");
        let tarball = self.work_folder.join(format!("{title}.dump.tar.gz"));
        let log_file = open_handle(&self.compress_log, &self.compress_log_path)?;
        let summary = match ctx
            .collaborators
            .archiver
            .compress_file(&dump_path, &tarball, log_file)
        {
            Ok(summary) => summary,
            Err(err) => {
                self.log.error(format!(
                    "Failed to compress {}; see {}",
                    dump_path.display(),
                    self.compress_log_path.display()
                ));
                return Err(err.into());
            }
        };
        fs::remove_file(&dump_path).map_err(|e| io_err(&dump_path, e))?;
        self.log
            .info(format!("Compressed to {}", human_size(summary.size_bytes)));
        Ok(())
    }

    // -- DatabaseArchived → MediaArchived -----------------------------------

    fn archive_media(&mut self) -> Result<(), RunFailure> {
        let ctx = self.ctx;
        let log_file = open_handle(&self.compress_log, &self.compress_log_path)?;
        let media_archive = self.work_folder.join(MEDIA_ARCHIVE);

        self.log.info("Collecting media files");
        let staged = manifest::prepare_working_manifest(
            ctx.project.title.as_str(),
            self.identifier.month(),
            self.identifier.year(),
            &ctx.config.backups,
        )?;
        if staged.bootstrapped() {
            self.log.info(format!(
                "No baseline manifest for this month; created {}",
                staged.baseline().display()
            ));
        }

        self.log
            .info(format!("Archiving to {}", media_archive.display()));
        let result = ctx.collaborators.archiver.archive(
            &ctx.project.media,
            &media_archive,
            Some(staged.path()),
            log_file,
        );

        match result {
            Ok(summary) => {
                self.log.info(format!(
                    "Archiving completed by {} seconds",
                    summary.elapsed.as_secs()
                ));
                self.log.info(format!(
                    "Incremental media files archive size: {}",
                    human_size(summary.size_bytes)
                ));
                let baseline = staged.commit()?;
                self.log
                    .info(format!("Manifest {} updated", baseline.display()));
                self.manifest = Some(baseline);
                Ok(())
            }
            Err(err) => {
                self.log
                    .error(format!("Failed to archive {}", ctx.project.media.display()));
                if let Err(discard) = staged.abandon() {
                    self.log
                        .warn(format!("Working manifest not removed: {discard}"));
                }
                Err(err.into())
            }
        }
    }

    // -- MediaArchived → BundleArchived -------------------------------------

    fn archive_bundle(&mut self) -> Result<(), RunFailure> {
        let ctx = self.ctx;
        let log_file = open_handle(&self.compress_log, &self.compress_log_path)?;

        self.log.info(format!(
            "Compressing all to file {}",
            self.bundle_path.display()
        ));
        let summary =
            ctx.collaborators
                .archiver
                .archive(&self.work_folder, &self.bundle_path, None, log_file)?;
        self.log.info(format!(
            "Archiving completed by {} seconds, bundle size {}",
            summary.elapsed.as_secs(),
            human_size(summary.size_bytes)
        ));

        self.bundle_size = summary.size_bytes;
        self.bundle_digest = file_digest(&self.bundle_path)?;
        self.log
            .info(format!("Bundle SHA-256 {}", self.bundle_digest));
        Ok(())
    }

    // -- BundleArchived → CleanedUp -----------------------------------------

    fn clean_up(&mut self) -> Result<(), RunFailure> {
        self.log.info("Removing temporary files");
        fs::remove_dir_all(&self.work_folder).map_err(|e| io_err(&self.work_folder, e))?;
        if let Some(file) = self.compress_log.take() {
            file.sync_all()
                .map_err(|e| io_err(&self.compress_log_path, e))?;
        }
        Ok(())
    }

    // -- CleanedUp → Uploaded -----------------------------------------------

    fn upload(&mut self) -> Result<(), RunFailure> {
        self.log
            .info(format!("Uploading {}", self.bundle_path.display()));
        match self
            .ctx
            .collaborators
            .uploader
            .upload(std::slice::from_ref(&self.bundle_path))
        {
            Ok(()) => {
                self.log.info("Upload completed");
                Ok(())
            }
            Err(err) => {
                self.log.error(format!(
                    "Upload failed; local bundle kept at {}",
                    self.bundle_path.display()
                ));
                Err(err.into())
            }
        }
    }

    // -- Uploaded → Reported ------------------------------------------------

    /// Best-effort: a delivery failure is logged and recorded, never raised.
    fn report(&mut self) {
        debug_assert_eq!(self.stage, Stage::Uploaded);
        self.log.info(format!(
            "Backup {} completed in {} seconds",
            self.identifier,
            self.started.elapsed().as_secs()
        ));

        let subject = format!("backup {}", self.identifier);
        let attachments = [self.compress_log_path.clone()];
        let notifier = self.ctx.collaborators.notifier;
        let outcome = self
            .log
            .read_back()
            .map_err(|e| e.to_string())
            .and_then(|body| {
                notifier
                    .send(&subject, &body, &attachments)
                    .map_err(|e| e.to_string())
            });
        if let Err(message) = outcome {
            self.log.warn(format!("Report not delivered: {message}"));
            self.report_error = Some(message);
        }
        self.stage = Stage::Reported;
    }

    // -- Reported → Done ----------------------------------------------------

    fn finish(mut self) -> RunSummary {
        self.stage = Stage::Done;
        RunSummary {
            stage: self.stage,
            bundle: self.bundle_path.clone(),
            bundle_size: self.bundle_size,
            bundle_digest: std::mem::take(&mut self.bundle_digest),
            manifest: self.manifest.take().unwrap_or_default(),
            run_log: self.log.path().to_path_buf(),
            compress_log: self.compress_log_path.clone(),
            elapsed: self.started.elapsed(),
            report_error: self.report_error.take(),
            identifier: self.identifier.clone(),
        }
    }
}

fn open_handle<'f>(file: &'f Option<File>, path: &Path) -> Result<&'f File, RunFailure> {
    file.as_ref().ok_or_else(|| {
        io_err(path, io::Error::other("compression log already closed"))
    })
}
