//! Remote directory pipeline with a mocked channel and storage

use dirbackup::config::DirectoryConfig;
use dirbackup::error::BackupError;
use dirbackup::interfaces::{BackupInterface, RemoteDirectoryBackup};
use rstest::rstest;
use test_utils::{MockRemote, MockResponse, MockStorage, RemoteCall, StorageCall, TestContext};

const TEMP_ARCHIVE: &str = "/tmp/dirbackup-app.tar.gz";

fn directory(src: &str, name: &str, retention: Option<usize>) -> DirectoryConfig {
    DirectoryConfig {
        src: src.to_string(),
        dest: "/backups".to_string(),
        name: name.to_string(),
        exclude: vec![],
        retention,
    }
}

fn backup(
    remote: &MockRemote,
    storage: &MockStorage,
    directories: Vec<DirectoryConfig>,
) -> RemoteDirectoryBackup<MockRemote> {
    let ctx = TestContext::new();
    RemoteDirectoryBackup::new(remote.clone(), "/tmp", directories, ctx.mock_context(storage))
}

enum FailureStage {
    Archive,
    Stream,
    Upload,
}

#[rstest]
#[case::archive(FailureStage::Archive)]
#[case::stream(FailureStage::Stream)]
#[case::upload(FailureStage::Upload)]
fn test_temp_archive_removed_whatever_fails(#[case] stage: FailureStage) {
    let mut remote = MockRemote::new();
    let mut storage = MockStorage::new();
    match stage {
        FailureStage::Archive => {
            remote = remote.expect("tar ", MockResponse::exit(2, "tar: Cannot stat"));
        }
        FailureStage::Stream => remote = remote.fail_reads_of(TEMP_ARCHIVE),
        FailureStage::Upload => storage = storage.fail_uploads_matching("/backups/app/"),
    }

    let interface = backup(&remote, &storage, vec![directory("/data/app", "app", Some(2))]);
    let report = interface.backup().unwrap();

    assert_eq!(report.failed(), 1);
    assert!(!remote.file_exists(TEMP_ARCHIVE));
    assert_eq!(
        remote.commands().iter().filter(|c| c.starts_with("rm -f")).count(),
        1,
        "cleanup must run exactly once"
    );
    assert!(!storage
        .get_calls()
        .iter()
        .any(|call| matches!(call, StorageCall::Retention { .. })));
    assert!(storage.objects_under("/backups/app").is_empty());
}

#[test]
fn test_archive_failure_reports_exit_status() {
    let remote = MockRemote::new().expect("tar ", MockResponse::exit(2, "tar: /data/app: Cannot open"));
    let storage = MockStorage::new();
    let interface = backup(&remote, &storage, vec![directory("/data/app", "app", None)]);

    let report = interface.backup().unwrap();

    match &report.outcomes[0].result {
        Err(BackupError::Archive { path, status, stderr, command }) => {
            assert_eq!(path, "/data/app");
            assert_eq!(*status, 2);
            assert_eq!(stderr, "tar: /data/app: Cannot open");
            assert!(command.starts_with("tar -czf"));
        }
        other => panic!("expected archive error, got {:?}", other),
    }
    // Nothing was opened for transfer
    assert!(!remote
        .get_calls()
        .iter()
        .any(|call| matches!(call, RemoteCall::OpenFile { .. })));
}

#[test]
fn test_every_directory_gets_its_own_destination_and_retention() {
    let remote = MockRemote::new();
    let storage = MockStorage::new();
    let interface = backup(
        &remote,
        &storage,
        vec![
            directory("/data/app", "app", Some(1)),
            directory("/data/db", "db", None),
            directory("/etc/nginx", "nginx", Some(5)),
        ],
    );

    let report = interface.backup().unwrap();
    assert_eq!(report.succeeded(), 3);

    let retention: Vec<StorageCall> = storage
        .get_calls()
        .into_iter()
        .filter(|call| matches!(call, StorageCall::Retention { .. }))
        .collect();
    assert_eq!(
        retention,
        vec![
            StorageCall::Retention { path: "/backups/app".to_string(), keep: 1 },
            StorageCall::Retention { path: "/backups/nginx".to_string(), keep: 5 },
        ]
    );

    assert_eq!(storage.objects_under("/backups/app").len(), 1);
    assert_eq!(storage.objects_under("/backups/db").len(), 1);
    assert_eq!(storage.objects_under("/backups/nginx").len(), 1);

    let archives: Vec<String> = remote
        .commands()
        .into_iter()
        .filter(|c| c.starts_with("tar "))
        .collect();
    assert_eq!(archives.len(), 3);
    assert!(archives[1].starts_with("tar -czf /tmp/dirbackup-db.tar.gz"));
}

#[test]
fn test_existing_destination_is_not_recreated() {
    let remote = MockRemote::new();
    let storage = MockStorage::new().with_object("/backups/app", b"");
    let interface = backup(&remote, &storage, vec![directory("/data/app", "app", None)]);

    assert!(interface.backup().unwrap().is_success());
    assert!(!storage
        .get_calls()
        .iter()
        .any(|call| matches!(call, StorageCall::CreateDirectory { .. })));
}

#[test]
fn test_channel_error_during_validation() {
    let remote = MockRemote::new().expect(
        "ls -d",
        MockResponse::ChannelError {
            message: "session closed".to_string(),
        },
    );
    let storage = MockStorage::new();
    let interface = backup(&remote, &storage, vec![directory("/data/app", "app", None)]);

    let err = interface.validate().unwrap_err();
    assert!(matches!(err, BackupError::Remote { .. }));
    assert_eq!(remote.commands(), vec!["ls -d /data/app"]);
}

#[test]
fn test_exclusions_reach_the_archive_command() {
    let remote = MockRemote::new();
    let storage = MockStorage::new();
    let mut dir = directory("/data/app", "app", None);
    dir.exclude = vec!["*.log".to_string(), "tmp/*".to_string(), "cache dir".to_string()];
    let interface = backup(&remote, &storage, vec![dir]);

    interface.backup().unwrap();

    assert!(remote.was_called(
        "tar -czf /tmp/dirbackup-app.tar.gz '--exclude=*.log' '--exclude=tmp/*' '--exclude=cache dir' /data/app"
    ));
}

#[test]
fn test_same_second_backups_get_distinct_keys() {
    let ctx = TestContext::new();
    let remote = MockRemote::new();
    let storage = MockStorage::new();
    let context = ctx.context_with(std::sync::Arc::new(storage.clone()), test_utils::frozen_clock());
    let interface = RemoteDirectoryBackup::new(
        remote.clone(),
        "/tmp",
        vec![directory("/data/app", "app", None)],
        context,
    );

    for _ in 0..3 {
        assert!(interface.backup().unwrap().is_success());
    }

    assert_eq!(
        storage.objects_under("/backups/app"),
        vec![
            "/backups/app/app-2026-10-14T02-00-00.tar.gz",
            "/backups/app/app-2026-10-14T02-00-00-2.tar.gz",
            "/backups/app/app-2026-10-14T02-00-00-1.tar.gz",
        ]
    );
}
