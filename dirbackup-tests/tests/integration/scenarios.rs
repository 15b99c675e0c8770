//! End-to-end backup scenarios

use crate::common::{directory, Workspace, SHELL_DIRECTORY};
use dirbackup::error::{BackupError, Probe};
use dirbackup::interfaces::BackupInterface;
use dirbackup::managers::runner::{InterfaceStatus, Runner};
use std::fs;
use test_utils::{
    app_tree, archive_files_at, file_names, frozen_clock, stepping_clock, ConfigBuilder, DirectorySpec, InterfaceSpec,
};

#[test]
fn test_retention_keeps_three_newest_after_four_runs() {
    let ws = Workspace::new();
    app_tree(&ws.source_root.join("app"));

    let mut dir = directory("app", "app");
    dir.retention = Some(3);
    let interface = ws.interface(vec![dir]);
    interface.validate().unwrap();

    for _ in 0..4 {
        let report = interface.backup().unwrap();
        assert!(report.is_success(), "{:?}", report);
    }

    let stored = file_names(&ws.storage_dir("/backups/app"));
    assert_eq!(
        stored,
        vec![
            "app-2026-10-14T02-00-01.tar.gz",
            "app-2026-10-14T02-00-02.tar.gz",
            "app-2026-10-14T02-00-03.tar.gz",
        ]
    );
    assert!(ws.remote_tmp_is_empty());
}

#[test]
fn test_same_second_backup_survives_retention() {
    let ws = Workspace::new();
    app_tree(&ws.source_root.join("app"));

    let mut dir = directory("app", "app");
    dir.retention = Some(1);
    let interface = ws.interface_with_clock(vec![dir], frozen_clock());

    let first = interface.backup().unwrap();
    fs::write(ws.source_root.join("app/second.txt"), "second run").unwrap();
    let second = interface.backup().unwrap();

    let first_key = first.stored().next().expect("first backup stored").key.clone();
    let second_key = second.stored().next().expect("second backup stored").key.clone();
    assert_eq!(first_key, "/backups/app/app-2026-10-14T02-00-00.tar.gz");
    assert_eq!(second_key, "/backups/app/app-2026-10-14T02-00-00-1.tar.gz");

    assert_eq!(
        file_names(&ws.storage_dir("/backups/app")),
        vec!["app-2026-10-14T02-00-00-1.tar.gz"]
    );
    let kept = archive_files_at(&ws.ctx.filesystem_storage().resolve(&second_key));
    assert!(kept.contains(&"app/second.txt".to_string()), "{:?}", kept);
}

#[test]
fn test_validation_failure_then_next_interface_runs() {
    let ws = Workspace::new();
    app_tree(&ws.source_root.join("app"));

    let builder = ConfigBuilder::new()
        .with_name("scenario-validation")
        .add_interface(
            InterfaceSpec::new(SHELL_DIRECTORY).with_directory(DirectorySpec::new("missing", "/backups", "missing")),
        )
        .add_interface(
            InterfaceSpec::new(SHELL_DIRECTORY).with_directory(DirectorySpec::new("app", "/backups", "app")),
        );

    let summary = Runner::with_registry(builder.build(), ws.shell_registry())
        .with_clock(stepping_clock())
        .with_lock_dir(ws.ctx.temp_dir())
        .run()
        .unwrap();

    match &summary.interfaces[0].status {
        InterfaceStatus::Failed(BackupError::Validation { path, probe, .. }) => {
            assert_eq!(path, "missing");
            assert_eq!(*probe, Probe::Exists);
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(matches!(summary.interfaces[1].status, InterfaceStatus::Completed(_)));

    let storage_root = builder.storage_root();
    assert!(!storage_root.join("backups/missing").exists());
    assert_eq!(file_names(&storage_root.join("backups/app")).len(), 1);
    assert!(ws.remote_tmp_is_empty());
}

#[test]
fn test_exclusions_keep_matching_files_out_of_the_archive() {
    let ws = Workspace::new();
    app_tree(&ws.source_root.join("app"));

    let mut dir = directory("app", "app");
    dir.exclude = vec!["*.log".to_string(), "tmp/*".to_string()];
    let interface = ws.interface(vec![dir]);

    let report = interface.backup().unwrap();
    let stored = report.stored().next().expect("backup should be stored").clone();
    assert!(stored.key.ends_with(".tar.gz"));

    let archive = ws.ctx.filesystem_storage().resolve(&stored.key);
    let files = archive_files_at(&archive);

    assert!(files.contains(&"app/config/app.toml".to_string()), "{:?}", files);
    assert!(files.contains(&"app/data/records.db".to_string()), "{:?}", files);
    assert!(!files.iter().any(|f| f.ends_with(".log")), "{:?}", files);
    assert!(!files.iter().any(|f| f.contains("/tmp/")), "{:?}", files);
    assert_eq!(fs::metadata(&archive).unwrap().len(), stored.bytes);
}

#[test]
fn test_failed_archive_leaves_no_temp_file() {
    let ws = Workspace::new();

    // Skip validation so tar itself hits the missing source
    let interface = ws.interface(vec![directory("vanished", "vanished")]);
    let report = interface.backup().unwrap();

    assert!(matches!(
        report.outcomes[0].result,
        Err(BackupError::Archive { status, .. }) if status != 0
    ));
    assert!(ws.remote_tmp_is_empty());
    assert!(file_names(&ws.storage_dir("/backups/vanished")).is_empty());
}
