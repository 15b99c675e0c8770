//! Runner isolation: one interface never affects the next

use dirbackup::error::BackupError;
use dirbackup::managers::runner::{InterfaceStatus, Runner};
use dirbackup::registry::Registry;
use dirbackup::utils::locker::RunLock;
use std::sync::Arc;
use test_utils::{
    stepping_clock, with_recording, CallLog, ConfigBuilder, DirectorySpec, InterfaceSpec, MockStorage,
    TestContext, RECORDING,
};

fn recording(label: &str) -> InterfaceSpec {
    InterfaceSpec::new(RECORDING).with_setting("label", label)
}

fn registry(log: &CallLog, storage: &MockStorage) -> Registry {
    let storage = storage.clone();
    with_recording(Registry::builtin(), log)
        .with_storage("mock", move |_| Ok(Arc::new(storage.clone())))
}

fn runner(builder: ConfigBuilder, log: &CallLog, storage: &MockStorage, ctx: &TestContext) -> Runner {
    Runner::with_registry(builder.with_storage("mock").build(), registry(log, storage))
        .with_clock(stepping_clock())
        .with_lock_dir(ctx.temp_dir())
}

#[test]
fn test_disabled_interface_is_never_constructed() {
    let ctx = TestContext::new();
    let log = CallLog::new();
    let storage = MockStorage::new();

    let builder = ConfigBuilder::new()
        .add_interface(
            recording("off")
                .disabled()
                .with_directory(DirectorySpec::new("/srv/off", "/backups", "off")),
        )
        .add_interface(recording("on").with_directory(DirectorySpec::new("/srv/on", "/backups", "on")));

    let summary = runner(builder, &log, &storage, &ctx).run().unwrap();

    assert!(log.calls_for("off").is_empty());
    assert!(matches!(summary.interfaces[0].status, InterfaceStatus::Skipped));
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.succeeded(), 1);
    assert!(storage.objects_under("/backups/off").is_empty());
}

#[test]
fn test_validation_failure_skips_backup_and_continues() {
    let ctx = TestContext::new();
    let log = CallLog::new();
    let storage = MockStorage::new();

    let builder = ConfigBuilder::new()
        .add_interface(
            recording("first")
                .with_setting("fail_validation", true)
                .with_directory(DirectorySpec::new("/srv/first", "/backups", "first")),
        )
        .add_interface(recording("second").with_directory(DirectorySpec::new("/srv/second", "/backups", "second")));

    let summary = runner(builder, &log, &storage, &ctx).run().unwrap();

    assert_eq!(
        log.calls(),
        vec![
            "construct first",
            "validate first",
            "construct second",
            "validate second",
            "archive second/second",
            "discard second/second",
        ]
    );
    assert!(matches!(
        summary.interfaces[0].status,
        InterfaceStatus::Failed(BackupError::Validation { .. })
    ));
    assert!(matches!(summary.interfaces[1].status, InterfaceStatus::Completed(_)));
    assert!(!summary.is_success());

    // No storage directory was created for the failed interface
    assert!(!storage
        .get_calls()
        .iter()
        .any(|call| format!("{:?}", call).contains("/backups/first")));
}

#[test]
fn test_connection_failure_is_recorded_and_run_continues() {
    let ctx = TestContext::new();
    let log = CallLog::new();
    let storage = MockStorage::new();

    let builder = ConfigBuilder::new()
        .add_interface(recording("down").with_setting("fail_construct", true))
        .add_interface(recording("up").with_directory(DirectorySpec::new("/srv/up", "/backups", "up")));

    let summary = runner(builder, &log, &storage, &ctx).run().unwrap();

    assert_eq!(log.calls_for("down"), vec!["construct down"]);
    assert!(matches!(
        summary.interfaces[0].status,
        InterfaceStatus::Failed(BackupError::Connection { .. })
    ));
    assert_eq!(storage.objects_under("/backups/up").len(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.succeeded(), 1);
}

#[test]
fn test_unknown_tag_fails_before_any_interface_runs() {
    let ctx = TestContext::new();
    let log = CallLog::new();
    let storage = MockStorage::new();

    let builder = ConfigBuilder::new()
        .add_interface(recording("first").with_directory(DirectorySpec::new("/srv/first", "/backups", "first")))
        .add_interface(InterfaceSpec::new("carrier_pigeon"));

    let result = runner(builder, &log, &storage, &ctx).run();

    assert!(matches!(result, Err(BackupError::UnknownInterface(tag)) if tag == "carrier_pigeon"));
    assert!(log.calls().is_empty());
    assert_eq!(storage.call_count(), 0);
}

#[test]
fn test_unknown_storage_fails_fast() {
    let ctx = TestContext::new();
    let log = CallLog::new();

    let config = ConfigBuilder::new()
        .with_storage("tape")
        .add_interface(recording("first"))
        .build();

    let result = Runner::with_registry(config, with_recording(Registry::builtin(), &log))
        .with_lock_dir(ctx.temp_dir())
        .run();

    assert!(matches!(result, Err(BackupError::UnknownStorage(tag)) if tag == "tape"));
    assert!(log.calls().is_empty());
}

#[test]
fn test_directory_failure_does_not_stop_siblings() {
    let ctx = TestContext::new();
    let log = CallLog::new();
    let storage = MockStorage::new();

    let builder = ConfigBuilder::new().add_interface(
        recording("multi")
            .with_setting("fail_archive", toml::Value::Array(vec![toml::Value::String("b".into())]))
            .with_directory(DirectorySpec::new("/srv/a", "/backups", "a"))
            .with_directory(DirectorySpec::new("/srv/b", "/backups", "b"))
            .with_directory(DirectorySpec::new("/srv/c", "/backups", "c")),
    );

    let summary = runner(builder, &log, &storage, &ctx).run().unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failed_directories(), 1);
    assert_eq!(storage.objects_under("/backups/a").len(), 1);
    assert!(storage.objects_under("/backups/b").is_empty());
    assert_eq!(storage.objects_under("/backups/c").len(), 1);
    assert!(log.calls().contains(&"archive multi/c".to_string()));

    let messages = summary.failure_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("'b'"));
}

#[test]
fn test_overlapping_run_is_refused() {
    let ctx = TestContext::new();
    let log = CallLog::new();
    let storage = MockStorage::new();

    let builder = ConfigBuilder::new()
        .with_name("locked")
        .add_interface(recording("first").with_directory(DirectorySpec::new("/srv/first", "/backups", "first")));

    let mut held = RunLock::open_in(ctx.temp_dir(), "locked").unwrap();
    let _guard = held.try_acquire().unwrap();

    let result = runner(builder, &log, &storage, &ctx).run();

    assert!(matches!(result, Err(BackupError::Lock { ref name, .. }) if name == "locked"));
    assert!(log.calls().is_empty());
}
