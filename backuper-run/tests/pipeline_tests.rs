//! End-to-end pipeline runs against in-process collaborators.

mod common;

use std::fs;
use std::time::{Duration, SystemTime};

use filetime::FileTime;

use backuper_archive::TarArchiver;
use backuper_core::BackupClass;
use backuper_run::{Backuper, Collaborators, RunFailure, Stage, MEDIA_ARCHIVE};

use common::{at, Fakes, Fixture};

fn read(path: &std::path::Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// Successful runs
// ---------------------------------------------------------------------------

#[test]
fn first_of_month_runs_monthly_and_leaves_only_outputs() {
    let fx = Fixture::new();
    let fakes = Fakes::default();

    let summary = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 1))
        .expect("backup");

    assert_eq!(summary.identifier.to_string(), "acme-m-01-03-24");
    assert_eq!(summary.stage, Stage::Done);
    assert_eq!(summary.bundle, fx.backups().join("acme-m-01-03-24.tar"));
    assert_eq!(summary.manifest, fx.backups().join("acme-m-01-03-24.inc"));
    assert!(summary.report_error.is_none());
    assert_eq!(summary.bundle_digest.len(), 64);
    assert_eq!(
        summary.bundle_size,
        fs::metadata(&summary.bundle).unwrap().len()
    );

    // Work folder and lock are gone; the rest are run outputs.
    assert_eq!(
        fx.backup_files(),
        vec![
            "acme-m-01-03-24-backup.log.txt",
            "acme-m-01-03-24-compress.txt",
            "acme-m-01-03-24.inc",
            "acme-m-01-03-24.tar",
        ]
    );
    assert!(!fx.backups().join("acme-m-01-03-24").exists());

    let log = read(&summary.run_log);
    assert!(log.contains("[INFO] Starting monthly backup of acme as acme-m-01-03-24"));
    assert!(log.contains("Created folder"));
    assert!(log.contains("No baseline manifest for this month"));
    assert!(log.contains("Bundle SHA-256"));
}

#[test]
fn mid_month_runs_daily_against_the_monthly_manifest() {
    let fx = Fixture::new();
    let fakes = Fakes::default();

    let summary = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .expect("backup");

    assert_eq!(summary.identifier.to_string(), "acme-d-15-03-24");
    assert_eq!(summary.manifest, fx.backups().join("acme-m-01-03-24.inc"));
    assert!(summary.bundle.ends_with("acme-d-15-03-24.tar"));
    assert!(!fx.backups().join("acme-m-01-03-24.new.inc").exists());
}

#[test]
fn forced_monthly_names_itself_after_the_first() {
    let fx = Fixture::new();
    let fakes = Fakes::default();

    let summary = fx
        .backuper(&fakes, Some(BackupClass::Monthly))
        .backup_at(at(2024, 3, 15))
        .expect("backup");

    assert_eq!(summary.identifier.to_string(), "acme-m-01-03-24");
}

#[test]
fn bundle_holds_compressed_dump_and_media_archive() {
    let fx = Fixture::new();
    let fakes = Fakes::default();

    fx.backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .expect("backup");

    let full = fakes.archiver.full_runs.borrow();
    assert_eq!(full.len(), 1);
    assert_eq!(full[0], vec!["acme.dump.tar.gz".to_string(), MEDIA_ARCHIVE.to_string()]);
    assert_eq!(fakes.dumper.calls.get(), 1);

    let first = &fakes.archiver.incremental_runs.borrow()[0];
    assert_eq!(first, &vec!["logo.png".to_string(), "uploads/report.pdf".to_string()]);
}

#[test]
fn same_day_rerun_archives_no_media_but_fresh_dump_and_bundle() {
    let fx = Fixture::new();
    let fakes = Fakes::default();
    let backuper = fx.backuper(&fakes, None);

    let first = backuper.backup_at(at(2024, 3, 15)).expect("first run");
    let first_manifest = read(&first.manifest);
    let second = backuper.backup_at(at(2024, 3, 15)).expect("second run");

    let incremental = fakes.archiver.incremental_runs.borrow();
    assert_eq!(incremental.len(), 2);
    assert_eq!(incremental[0].len(), 2);
    assert!(incremental[1].is_empty(), "no media changed: {:?}", incremental[1]);

    assert_eq!(fakes.dumper.calls.get(), 2);
    assert_eq!(fakes.archiver.full_runs.borrow().len(), 2);
    assert_eq!(first.bundle, second.bundle);
    assert!(second.bundle.is_file());
    assert_eq!(read(&second.manifest), first_manifest);
}

#[test]
fn manifest_carries_forward_between_daily_runs() {
    let fx = Fixture::new();
    let fakes = Fakes::default();
    let backuper = fx.backuper(&fakes, None);

    backuper.backup_at(at(2024, 3, 15)).expect("day 15");

    fs::write(fx.media().join("uploads").join("invoice.pdf"), "new").unwrap();
    let logo = fx.media().join("logo.png");
    fs::write(&logo, "png-bytes-v2").unwrap();
    let later = SystemTime::now() + Duration::from_secs(60);
    filetime::set_file_mtime(&logo, FileTime::from_system_time(later)).unwrap();

    backuper.backup_at(at(2024, 3, 16)).expect("day 16");

    let incremental = fakes.archiver.incremental_runs.borrow();
    assert_eq!(
        incremental[1],
        vec!["logo.png".to_string(), "uploads/invoice.pdf".to_string()]
    );
}

#[test]
fn new_month_starts_from_an_empty_baseline() {
    let fx = Fixture::new();
    let fakes = Fakes::default();
    let backuper = fx.backuper(&fakes, None);

    backuper.backup_at(at(2024, 3, 15)).expect("march");
    let april = backuper.backup_at(at(2024, 4, 2)).expect("april");

    assert_eq!(april.manifest, fx.backups().join("acme-m-01-04-24.inc"));
    assert!(fx.backups().join("acme-m-01-03-24.inc").is_file());
    let incremental = fakes.archiver.incremental_runs.borrow();
    assert_eq!(incremental[1].len(), 2, "april re-archives every media file");
}

#[test]
fn report_carries_run_log_and_compression_log() {
    let fx = Fixture::new();
    let fakes = Fakes::default();

    let summary = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .expect("backup");

    let sent = fakes.notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "backup acme-d-15-03-24");
    assert!(sent[0].body.contains("Starting daily backup of acme"));
    assert!(sent[0].body.contains("Upload completed"));
    assert_eq!(sent[0].attachments, vec![summary.compress_log.clone()]);

    let compress = read(&summary.compress_log);
    assert!(compress.contains("uploads/report.pdf"));
    assert!(compress.contains("Total entries written: 2"));

    assert_eq!(*fakes.uploader.uploaded.borrow(), vec![summary.bundle.clone()]);
}

#[test]
fn leftover_work_folder_is_replaced() {
    let fx = Fixture::new();
    let fakes = Fakes::default();
    let leftover = fx.backups().join("acme-d-15-03-24");
    fs::create_dir_all(&leftover).unwrap();
    fs::write(leftover.join("stale.dump"), "old").unwrap();

    let summary = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .expect("backup");

    let full = fakes.archiver.full_runs.borrow();
    assert!(!full[0].iter().any(|e| e == "stale.dump"));
    assert!(read(&summary.run_log).contains("[WARNING] Removing leftover folder"));
    assert!(!leftover.exists());
}

#[test]
fn stale_working_manifest_is_overwritten() {
    let fx = Fixture::new();
    let fakes = Fakes::default();
    fs::create_dir_all(fx.backups()).unwrap();
    fs::write(fx.backups().join("acme-m-01-03-24.new.inc"), "garbage").unwrap();

    let summary = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .expect("backup");

    assert!(!read(&summary.manifest).contains("garbage"));
    assert_eq!(fakes.archiver.incremental_runs.borrow()[0].len(), 2);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn media_failure_keeps_baseline_untouched() {
    let fx = Fixture::new();
    let fakes = Fakes {
        archiver: common::FakeArchiver {
            fail_incremental: true,
            ..Default::default()
        },
        ..Default::default()
    };
    fs::create_dir_all(fx.backups()).unwrap();
    let baseline = fx.backups().join("acme-m-01-03-24.inc");
    fs::write(&baseline, "logo.png\t9\t1\n").unwrap();

    let err = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .unwrap_err();

    assert_eq!(err.stage, Stage::MediaArchived);
    assert!(matches!(err.cause, RunFailure::Archiving(_)));
    assert_eq!(read(&baseline), "logo.png\t9\t1\n");
    assert!(!fx.backups().join("acme-m-01-03-24.new.inc").exists());

    // Later stages never ran.
    assert!(!fx.backups().join("acme-d-15-03-24.tar").exists());
    assert!(fakes.uploader.uploaded.borrow().is_empty());
    assert!(fakes.notifier.sent.borrow().is_empty());
    assert!(fx
        .backups()
        .join("acme-d-15-03-24")
        .join("acme.dump.tar.gz")
        .is_file());

    let log = read(&fx.backups().join("acme-d-15-03-24-backup.log.txt"));
    assert!(log.contains("[CRITICAL] Stage media-archived failed"));
    assert!(!fx.backups().join("acme.lock").exists());
}

#[test]
fn dump_failure_stops_before_media() {
    let fx = Fixture::new();
    let fakes = Fakes {
        dumper: common::FakeDumper {
            fail: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let err = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .unwrap_err();

    assert_eq!(err.stage, Stage::DatabaseArchived);
    assert!(matches!(err.cause, RunFailure::Dump(_)));
    assert!(fakes.archiver.incremental_runs.borrow().is_empty());
    assert!(!fx.backups().join("acme-m-01-03-24.inc").exists());
}

#[test]
fn bundle_failure_still_commits_media_manifest() {
    let fx = Fixture::new();
    let fakes = Fakes {
        archiver: common::FakeArchiver {
            fail_full: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let err = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .unwrap_err();

    assert_eq!(err.stage, Stage::BundleArchived);
    assert!(fx.backups().join("acme-m-01-03-24.inc").is_file());
    assert!(fx.backups().join("acme-d-15-03-24").is_dir());
}

#[test]
fn upload_failure_keeps_local_bundle() {
    let fx = Fixture::new();
    let fakes = Fakes {
        uploader: common::FakeUploader {
            fail: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let err = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .unwrap_err();

    assert_eq!(err.stage, Stage::Uploaded);
    assert!(matches!(err.cause, RunFailure::Upload(_)));
    assert!(fx.backups().join("acme-d-15-03-24.tar").is_file());
    assert!(!fx.backups().join("acme-d-15-03-24").exists());
    assert!(fakes.notifier.sent.borrow().is_empty());

    let log = read(&fx.backups().join("acme-d-15-03-24-backup.log.txt"));
    assert!(log.contains("local bundle kept at"));
}

#[test]
fn report_failure_does_not_fail_the_run() {
    let fx = Fixture::new();
    let fakes = Fakes {
        notifier: common::FakeNotifier {
            fail: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let summary = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .expect("run succeeds without a report");

    assert_eq!(summary.stage, Stage::Done);
    let message = summary.report_error.expect("report error recorded");
    assert!(message.contains("connection reset"));
    assert!(read(&summary.run_log).contains("[WARNING] Report not delivered"));
}

#[test]
fn held_lock_refuses_the_run() {
    let fx = Fixture::new();
    let fakes = Fakes::default();
    fs::create_dir_all(fx.backups()).unwrap();
    let lock = fx.backups().join("acme.lock");
    fs::write(&lock, "pid=1 started=earlier\n").unwrap();

    let err = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .unwrap_err();

    assert_eq!(err.stage, Stage::FoldersReady);
    assert!(matches!(err.cause, RunFailure::Locked { .. }));
    assert_eq!(read(&lock), "pid=1 started=earlier\n");
    assert!(!fx.backups().join("acme-d-15-03-24-backup.log.txt").exists());
    assert_eq!(fakes.dumper.calls.get(), 0);
}

#[test]
fn failure_before_the_run_log_exists_leaves_no_log() {
    let mut fx = Fixture::new();
    let fakes = Fakes::default();
    let not_a_folder = fx.root.path().join("backups-file");
    fs::write(&not_a_folder, "occupied").unwrap();
    fx.config.backups = not_a_folder.clone();

    let err = fx
        .backuper(&fakes, None)
        .backup_at(at(2024, 3, 15))
        .unwrap_err();

    assert_eq!(err.stage, Stage::FoldersReady);
    assert!(matches!(err.cause, RunFailure::Io { .. }));
    assert_eq!(read(&not_a_folder), "occupied");
    assert_eq!(fakes.dumper.calls.get(), 0);
}

// ---------------------------------------------------------------------------
// GNU tar
// ---------------------------------------------------------------------------

fn gnu_tar() -> bool {
    std::process::Command::new("tar")
        .arg("--version")
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains("GNU tar"))
        .unwrap_or(false)
}

#[test]
fn gnu_tar_same_day_rerun_stores_no_media_files() {
    if !gnu_tar() {
        eprintln!("skipping: GNU tar not available");
        return;
    }
    let fx = Fixture::new();
    let fakes = Fakes::default();
    let tar = TarArchiver::default();
    let collaborators = Collaborators {
        archiver: &tar,
        ..fakes.collaborators()
    };
    let backuper = Backuper::new(&fx.config, fx.project.clone(), None, collaborators);

    let first = backuper.backup_at(at(2024, 3, 15)).expect("first run");
    let first_log = read(&first.compress_log);
    assert!(first_log.contains("logo.png"), "first run lists media: {first_log}");
    assert!(first_log.contains("report.pdf"), "first run lists media: {first_log}");

    let second = backuper.backup_at(at(2024, 3, 15)).expect("second run");
    let second_log = read(&second.compress_log);
    assert!(!second_log.contains("logo.png"), "second run listed: {second_log}");
    assert!(!second_log.contains("report.pdf"), "second run listed: {second_log}");
    assert!(second.bundle.is_file());
    assert_eq!(fakes.dumper.calls.get(), 2);
}
