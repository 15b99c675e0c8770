use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for one backup run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Name of this backup configuration (used in logs and for the run lock)
    pub name: String,

    #[serde(default)]
    pub logging: LoggingSettings,

    pub storage: StorageConfig,

    /// Backup interfaces, processed in declaration order
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

/// Storage backend block
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Storage type tag, resolved through the registry
    pub interface: String,

    /// Backend-specific settings
    #[serde(flatten)]
    pub settings: toml::Table,
}

/// One backup interface block
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InterfaceConfig {
    /// Interface type tag, resolved through the registry
    pub interface: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,

    /// Interface-specific settings (connection details etc.)
    #[serde(flatten)]
    pub settings: toml::Table,
}

/// A directory to back up
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Source path, local or remote depending on the interface
    pub src: String,

    /// Destination root in storage
    pub dest: String,

    /// Logical backup-set name: storage subdirectory and archive name prefix
    pub name: String,

    /// Glob patterns excluded from the archive
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Number of most recent backups to keep at `dest/name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<usize>,
}

impl DirectoryConfig {
    /// Storage directory holding every backup of this directory
    pub fn destination_dir(&self) -> String {
        join_key(&self.dest, &self.name)
    }
}

/// Connection settings for the SSH directory interface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConnectionConfig {
    pub ssh_host: String,
    pub ssh_username: String,
    pub ssh_private_key: PathBuf,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// known_hosts file to verify the host key against
    #[serde(default)]
    pub ssh_known_hosts: Option<PathBuf>,

    /// Directory on the remote machine for temporary archives
    #[serde(default = "default_remote_temp_dir")]
    pub remote_temp_dir: String,
}

/// Settings for the filesystem storage backend
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilesystemStorageConfig {
    /// Directory under which destination keys are resolved
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Join storage key segments with a single `/`
pub fn join_key(base: &str, segment: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    if trimmed.is_empty() && base.starts_with('/') {
        format!("/{}", segment)
    } else if trimmed.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", trimmed, segment)
    }
}

// Default value functions

fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_enabled() -> bool { true }
fn default_ssh_port() -> u16 { 22 }
fn default_remote_temp_dir() -> String { "/tmp".to_string() }
