//! In-process collaborators for pipeline tests.
//!
//! `FakeArchiver` keeps its own manifest format (`path\tsize\tmtime_ns` per
//! line) so incremental behaviour can be observed without GNU tar.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, UNIX_EPOCH};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use walkdir::WalkDir;

use backuper_archive::{ArchiveError, ArchiveSummary, Archiver};
use backuper_core::{BackupClass, Config, Project, ProjectTitle};
use backuper_run::{
    Backuper, Collaborators, DumpError, Dumper, Notifier, ReportError, UploadError, Uploader,
};

pub fn failed_status() -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(2 << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(2)
    }
}

pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("date")
        .and_hms_opt(3, 30, 0)
        .expect("time")
}

// ---------------------------------------------------------------------------
// Archiver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeArchiver {
    pub fail_incremental: bool,
    pub fail_full: bool,
    /// Entries stored by each incremental pass, in call order.
    pub incremental_runs: RefCell<Vec<Vec<String>>>,
    /// Entries stored by each full pass, in call order.
    pub full_runs: RefCell<Vec<Vec<String>>>,
}

type FileState = BTreeMap<String, (u64, u128)>;

fn scan(source: &Path) -> FileState {
    let mut state = FileState::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.expect("walk");
        if !entry.file_type().is_file() {
            continue;
        }
        let meta = entry.metadata().expect("metadata");
        let mtime = meta
            .modified()
            .expect("mtime")
            .duration_since(UNIX_EPOCH)
            .expect("epoch")
            .as_nanos();
        let rel = entry
            .path()
            .strip_prefix(source)
            .expect("prefix")
            .to_string_lossy()
            .into_owned();
        state.insert(rel, (meta.len(), mtime));
    }
    state
}

fn read_manifest(path: &Path) -> FileState {
    let text = fs::read_to_string(path).expect("manifest readable");
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let rel = parts.next()?.to_string();
            let len = parts.next()?.parse().ok()?;
            let mtime = parts.next()?.parse().ok()?;
            Some((rel, (len, mtime)))
        })
        .collect()
}

fn write_manifest(path: &Path, state: &FileState) {
    let mut out = String::new();
    for (rel, (len, mtime)) in state {
        out.push_str(&format!("{rel}\t{len}\t{mtime}\n"));
    }
    fs::write(path, out).expect("manifest writable");
}

fn summary(destination: &Path) -> ArchiveSummary {
    ArchiveSummary {
        archive: destination.to_path_buf(),
        size_bytes: fs::metadata(destination).expect("archive").len(),
        elapsed: Duration::from_millis(1),
    }
}

impl Archiver for FakeArchiver {
    fn archive(
        &self,
        source: &Path,
        destination: &Path,
        manifest: Option<&Path>,
        mut log: &File,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let current = scan(source);
        let entries: Vec<String> = match manifest {
            Some(manifest) => {
                if self.fail_incremental {
                    // Leave the working copy half-written, as a crashed tar would.
                    fs::write(manifest, "partial\t").expect("scribble");
                    return Err(ArchiveError::Failed {
                        source_path: source.to_path_buf(),
                        status: failed_status(),
                    });
                }
                let known = read_manifest(manifest);
                let changed = current
                    .iter()
                    .filter(|(rel, state)| known.get(*rel) != Some(state))
                    .map(|(rel, _)| rel.clone())
                    .collect();
                write_manifest(manifest, &current);
                changed
            }
            None => {
                if self.fail_full {
                    return Err(ArchiveError::Failed {
                        source_path: source.to_path_buf(),
                        status: failed_status(),
                    });
                }
                current.keys().cloned().collect()
            }
        };

        fs::write(destination, entries.join("\n")).expect("archive writable");
        for entry in &entries {
            writeln!(log, "{entry}").expect("log writable");
        }
        writeln!(log, "Total entries written: {}", entries.len()).expect("log writable");

        if manifest.is_some() {
            self.incremental_runs.borrow_mut().push(entries);
        } else {
            self.full_runs.borrow_mut().push(entries);
        }
        Ok(summary(destination))
    }

    fn compress_file(
        &self,
        input: &Path,
        output: &Path,
        mut log: &File,
    ) -> Result<ArchiveSummary, ArchiveError> {
        if !input.is_file() {
            return Err(ArchiveError::SourceMissing(input.to_path_buf()));
        }
        fs::copy(input, output).expect("copy");
        writeln!(log, "compressed {}", output.display()).expect("log writable");
        Ok(summary(output))
    }
}

// ---------------------------------------------------------------------------
// Dumper / uploader / notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDumper {
    pub fail: bool,
    pub calls: Cell<usize>,
}

impl Dumper for FakeDumper {
    fn dump(&self, database: &str, mut out: File) -> Result<(), DumpError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(DumpError::Failed {
                database: database.to_string(),
                status: failed_status(),
                stderr: "connection refused".to_string(),
            });
        }
        writeln!(out, "-- dump of {database}").expect("dump writable");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUploader {
    pub fail: bool,
    pub uploaded: RefCell<Vec<PathBuf>>,
}

impl Uploader for FakeUploader {
    fn upload(&self, files: &[PathBuf]) -> Result<(), UploadError> {
        if self.fail {
            return Err(UploadError::Rejected {
                url: "https://store.example.com/acme/".to_string(),
                status: 503,
            });
        }
        self.uploaded.borrow_mut().extend(files.iter().cloned());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentReport {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

#[derive(Default)]
pub struct FakeNotifier {
    pub fail: bool,
    pub sent: RefCell<Vec<SentReport>>,
}

impl Notifier for FakeNotifier {
    fn send(&self, subject: &str, body: &str, attachments: &[PathBuf]) -> Result<(), ReportError> {
        if self.fail {
            return Err(ReportError::Delivery {
                url: "https://hooks.example.com/backups".to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.sent.borrow_mut().push(SentReport {
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct Fakes {
    pub archiver: FakeArchiver,
    pub dumper: FakeDumper,
    pub uploader: FakeUploader,
    pub notifier: FakeNotifier,
}

impl Fakes {
    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            archiver: &self.archiver,
            dumper: &self.dumper,
            uploader: &self.uploader,
            notifier: &self.notifier,
        }
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub root: TempDir,
    pub config: Config,
    pub project: Project,
}

impl Fixture {
    /// Project `acme` with two media files and an empty backups folder path.
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let projects = root.path().join("projects");
        let media = projects.join("acme").join("media");
        fs::create_dir_all(media.join("uploads")).expect("media");
        fs::write(media.join("logo.png"), "png-bytes").expect("logo");
        fs::write(media.join("uploads").join("report.pdf"), "pdf-bytes").expect("report");

        let config = Config {
            projects: projects.clone(),
            backups: root.path().join("backups"),
            archiver: Default::default(),
            database: Default::default(),
            upload: None,
            report: None,
        };
        let project =
            Project::open(ProjectTitle::new("acme").expect("title"), &projects).expect("project");
        Self {
            root,
            config,
            project,
        }
    }

    pub fn backuper<'a>(&'a self, fakes: &'a Fakes, class: Option<BackupClass>) -> Backuper<'a> {
        Backuper::new(
            &self.config,
            self.project.clone(),
            class,
            fakes.collaborators(),
        )
    }

    pub fn backups(&self) -> &Path {
        &self.config.backups
    }

    pub fn media(&self) -> &Path {
        &self.project.media
    }

    /// Every regular file name directly in the backups folder, sorted.
    pub fn backup_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.backups())
            .expect("backups folder")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
