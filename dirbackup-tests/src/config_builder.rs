//! Fluent API for building test configurations
//!
//! The builder renders a TOML document and parses it through the real
//! loader, so every built configuration has passed validation.

use dirbackup::config::{parse_config, Config};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use toml::{Table, Value};

/// One `[[interfaces.directories]]` entry
#[derive(Debug, Clone)]
pub struct DirectorySpec {
    src: String,
    dest: String,
    name: String,
    exclude: Vec<String>,
    retention: Option<usize>,
}

impl DirectorySpec {
    pub fn new(src: impl Into<String>, dest: &str, name: &str) -> Self {
        Self {
            src: src.into(),
            dest: dest.to_string(),
            name: name.to_string(),
            exclude: vec![],
            retention: None,
        }
    }

    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retention = Some(keep);
        self
    }

    pub fn with_exclude(mut self, patterns: &[&str]) -> Self {
        self.exclude = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.insert("src".into(), Value::String(self.src.clone()));
        table.insert("dest".into(), Value::String(self.dest.clone()));
        table.insert("name".into(), Value::String(self.name.clone()));
        if !self.exclude.is_empty() {
            table.insert(
                "exclude".into(),
                Value::Array(self.exclude.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(keep) = self.retention {
            table.insert("retention".into(), Value::Integer(keep as i64));
        }
        table
    }
}

/// One `[[interfaces]]` block
#[derive(Debug, Clone)]
pub struct InterfaceSpec {
    tag: String,
    enabled: bool,
    settings: Table,
    directories: Vec<DirectorySpec>,
}

impl InterfaceSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            enabled: true,
            settings: Table::new(),
            directories: vec![],
        }
    }

    pub fn local() -> Self {
        Self::new("local_directory")
    }

    /// SSH interface pointing at a host that is never contacted by tests
    pub fn ssh(host: &str) -> Self {
        Self::new("ssh_directory")
            .with_setting("ssh_host", host)
            .with_setting("ssh_username", "backup")
            .with_setting("ssh_private_key", "~/.ssh/id_ed25519")
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    pub fn with_directory(mut self, directory: DirectorySpec) -> Self {
        self.directories.push(directory);
        self
    }

    fn to_table(&self) -> Table {
        let mut table = self.settings.clone();
        table.insert("interface".into(), Value::String(self.tag.clone()));
        table.insert("enabled".into(), Value::Boolean(self.enabled));
        table.insert(
            "directories".into(),
            Value::Array(
                self.directories
                    .iter()
                    .map(|d| Value::Table(d.to_table()))
                    .collect(),
            ),
        );
        table
    }
}

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    name: String,
    storage_tag: String,
    storage_settings: Table,
    interfaces: Vec<InterfaceSpec>,
}

impl ConfigBuilder {
    /// Filesystem storage rooted in a fresh temp directory, logs next to it
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let storage_root = temp_dir.path().join("storage");
        fs::create_dir_all(&storage_root).expect("Failed to create storage root");
        fs::create_dir_all(temp_dir.path().join("logs")).expect("Failed to create log directory");

        let mut storage_settings = Table::new();
        storage_settings.insert(
            "root".into(),
            Value::String(storage_root.display().to_string()),
        );

        Self {
            temp_dir,
            name: "test-run".to_string(),
            storage_tag: "filesystem".to_string(),
            storage_settings,
            interfaces: vec![],
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Use a different storage tag (settings are kept)
    pub fn with_storage(mut self, tag: &str) -> Self {
        self.storage_tag = tag.to_string();
        self
    }

    pub fn add_interface(mut self, interface: InterfaceSpec) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage_root(&self) -> PathBuf {
        self.temp_dir.path().join("storage")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.temp_dir.path().join("logs")
    }

    /// Render the configuration file
    pub fn to_toml(&self) -> String {
        let mut logging = Table::new();
        logging.insert(
            "directory".into(),
            Value::String(self.log_dir().display().to_string()),
        );
        logging.insert("level".into(), Value::String("debug".into()));

        let mut storage = self.storage_settings.clone();
        storage.insert("interface".into(), Value::String(self.storage_tag.clone()));

        let mut document = Table::new();
        document.insert("name".into(), Value::String(self.name.clone()));
        document.insert("logging".into(), Value::Table(logging));
        document.insert("storage".into(), Value::Table(storage));
        document.insert(
            "interfaces".into(),
            Value::Array(
                self.interfaces
                    .iter()
                    .map(|i| Value::Table(i.to_table()))
                    .collect(),
            ),
        );

        toml::to_string(&document).expect("Failed to render test config")
    }

    /// Write the configuration into the temp dir and return its path
    pub fn write(&self) -> PathBuf {
        let path = self.temp_dir.path().join("backup.toml");
        fs::write(&path, self.to_toml()).expect("Failed to write config file");
        path
    }

    /// Build the Config
    pub fn build(&self) -> Config {
        parse_config(&self.to_toml()).expect("Test config should be valid")
    }

    /// Keep the temp directory alive alongside the config
    pub fn persist(self) -> (Config, TempDir) {
        let config = self.build();
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
