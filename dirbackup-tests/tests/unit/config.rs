//! Unit tests for configuration loading and validation

use dirbackup::config::{load_config, parse_config, typed_settings, ConfigError, RemoteConnectionConfig};
use rstest::rstest;
use std::path::PathBuf;
use test_utils::{ConfigBuilder, DirectorySpec, InterfaceSpec, TestContext};

#[test]
fn test_config_loading_valid() {
    let builder = ConfigBuilder::new()
        .with_name("nightly")
        .add_interface(
            InterfaceSpec::ssh("db.internal")
                .with_directory(DirectorySpec::new("/data/app", "/backups", "app").with_retention(3)),
        )
        .add_interface(
            InterfaceSpec::local().with_directory(DirectorySpec::new("/etc", "/backups", "etc")),
        );

    let path = builder.write();
    let loaded = load_config(&path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let config = loaded.unwrap();
    assert_eq!(config.name, "nightly");
    assert_eq!(config.interfaces.len(), 2);
    assert_eq!(config.interfaces[0].directories[0].destination_dir(), "/backups/app");
}

#[test]
fn test_missing_file_is_read_error() {
    let ctx = TestContext::new();
    let result = load_config(ctx.temp_dir().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let result = parse_config("name = \"broken\"\n[storage\ninterface = 1");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[rstest]
#[case::empty_name(DirectorySpec::new("/data", "/backups", ""))]
#[case::nested_name(DirectorySpec::new("/data", "/backups", "app/db"))]
#[case::parent_name(DirectorySpec::new("/data", "/backups", ".."))]
#[case::empty_src(DirectorySpec::new("", "/backups", "app"))]
#[case::empty_dest(DirectorySpec::new("/data", "", "app"))]
#[case::zero_retention(DirectorySpec::new("/data", "/backups", "app").with_retention(0))]
#[case::blank_exclude(DirectorySpec::new("/data", "/backups", "app").with_exclude(&[" "]))]
fn test_invalid_directory_rejected(#[case] directory: DirectorySpec) {
    let builder = ConfigBuilder::new().add_interface(InterfaceSpec::local().with_directory(directory));
    let result = parse_config(&builder.to_toml());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))), "{:?}", result);
}

#[test]
fn test_duplicate_destination_across_interfaces() {
    let builder = ConfigBuilder::new()
        .add_interface(
            InterfaceSpec::local().with_directory(DirectorySpec::new("/srv/app", "/backups", "app")),
        )
        .add_interface(
            InterfaceSpec::ssh("web").with_directory(DirectorySpec::new("/data/app", "/backups/", "app")),
        );

    let result = parse_config(&builder.to_toml());
    assert!(matches!(result, Err(ConfigError::DuplicateDestination(dest)) if dest == "/backups/app"));
}

#[test]
fn test_same_name_under_different_destinations() {
    let config = ConfigBuilder::new()
        .add_interface(
            InterfaceSpec::local()
                .with_directory(DirectorySpec::new("/srv/app", "/backups/local", "app"))
                .with_directory(DirectorySpec::new("/srv/app", "/backups/remote", "app")),
        )
        .build();

    assert_eq!(config.interfaces[0].directories.len(), 2);
}

#[test]
fn test_ssh_settings_defaults() {
    let config = ConfigBuilder::new()
        .add_interface(InterfaceSpec::ssh("db.internal"))
        .build();

    let settings: RemoteConnectionConfig = typed_settings(&config.interfaces[0].settings).unwrap();
    assert_eq!(settings.ssh_host, "db.internal");
    assert_eq!(settings.ssh_username, "backup");
    assert_eq!(settings.ssh_port, 22);
    assert_eq!(settings.remote_temp_dir, "/tmp");
    assert_eq!(settings.ssh_private_key, PathBuf::from("~/.ssh/id_ed25519"));
    assert!(settings.ssh_known_hosts.is_none());
}

#[test]
fn test_ssh_settings_missing_host() {
    let config = ConfigBuilder::new()
        .add_interface(
            InterfaceSpec::new("ssh_directory")
                .with_setting("ssh_username", "backup")
                .with_setting("ssh_private_key", "/keys/id"),
        )
        .build();

    let result: Result<RemoteConnectionConfig, _> = typed_settings(&config.interfaces[0].settings);
    assert!(result.is_err());
}
