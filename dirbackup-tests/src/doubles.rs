//! Recording backup interface for runner tests
//!
//! Registered under [`RECORDING`]. Behaviour is driven by the interface's
//! own settings block:
//!
//! - `label`: name used in recorded calls (defaults to the tag)
//! - `fail_construct`: construction fails like a refused connection
//! - `fail_validation`: validation fails on the first directory
//! - `fail_archive`: directory names whose archive step fails

use dirbackup::config::{DirectoryConfig, InterfaceConfig};
use dirbackup::error::{BackupError, Probe, Result};
use dirbackup::interfaces::{Artifact, ArtifactReader, BackupInterface, InterfaceContext};
use dirbackup::registry::Registry;
use parking_lot::Mutex;
use std::sync::Arc;
use toml::Value;

pub const RECORDING: &str = "recording_directory";

/// Shared, ordered record of calls across every recording interface
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.calls.lock().push(entry.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls recorded for one interface label
    pub fn calls_for(&self, label: &str) -> Vec<String> {
        let suffix = format!(" {}", label);
        let nested = format!(" {}/", label);
        self.calls()
            .into_iter()
            .filter(|c| c.ends_with(&suffix) || c.contains(&nested))
            .collect()
    }
}

pub struct RecordingInterface {
    label: String,
    directories: Vec<DirectoryConfig>,
    context: InterfaceContext,
    log: CallLog,
    fail_validation: bool,
    fail_archive: Vec<String>,
}

impl RecordingInterface {
    pub fn from_config(config: &InterfaceConfig, context: InterfaceContext, log: CallLog) -> Result<Self> {
        let settings = &config.settings;
        let flag = |key: &str| settings.get(key).and_then(Value::as_bool).unwrap_or(false);
        let label = settings
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(RECORDING)
            .to_string();

        log.record(format!("construct {}", label));

        if flag("fail_construct") {
            return Err(BackupError::Connection {
                host: label,
                port: 22,
                message: "connection refused".to_string(),
            });
        }

        let fail_archive = settings
            .get("fail_archive")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            fail_validation: flag("fail_validation"),
            label,
            directories: config.directories.clone(),
            context,
            log,
            fail_archive,
        })
    }
}

/// Add the recording interface to a registry
pub fn with_recording(registry: Registry, log: &CallLog) -> Registry {
    let log = log.clone();
    registry.with_interface(RECORDING, move |config, context| {
        Ok(Box::new(RecordingInterface::from_config(config, context, log.clone())?))
    })
}

impl BackupInterface for RecordingInterface {
    fn kind(&self) -> &'static str {
        RECORDING
    }

    fn directories(&self) -> &[DirectoryConfig] {
        &self.directories
    }

    fn context(&self) -> &InterfaceContext {
        &self.context
    }

    fn upload_label(&self) -> &'static str {
        "Uploading recorded archive"
    }

    fn validate(&self) -> Result<()> {
        self.log.record(format!("validate {}", self.label));

        if self.fail_validation {
            let path = self
                .directories
                .first()
                .map(|d| d.src.clone())
                .unwrap_or_default();
            return Err(BackupError::Validation {
                path,
                probe: Probe::Exists,
                message: "missing".to_string(),
            });
        }
        Ok(())
    }

    fn archive(&self, directory: &DirectoryConfig) -> Result<Box<dyn Artifact + '_>> {
        let location = format!("{}/{}", self.label, directory.name);
        self.log.record(format!("archive {}", location));

        if self.fail_archive.contains(&directory.name) {
            return Err(BackupError::Archive {
                path: directory.src.clone(),
                command: "record".to_string(),
                status: 2,
                stderr: "simulated archive failure".to_string(),
            });
        }

        Ok(Box::new(MemoryArtifact {
            data: format!("{}:{}", self.label, directory.src).into_bytes(),
            location,
            log: self.log.clone(),
        }))
    }
}

struct MemoryArtifact {
    data: Vec<u8>,
    location: String,
    log: CallLog,
}

impl Artifact for MemoryArtifact {
    fn location(&self) -> &str {
        &self.location
    }

    fn extension(&self) -> &str {
        "bin"
    }

    fn open(&self) -> Result<ArtifactReader<'_>> {
        Ok(ArtifactReader {
            reader: Box::new(&self.data[..]),
            size: self.data.len() as u64,
        })
    }

    fn discard(self: Box<Self>) -> Result<()> {
        self.log.record(format!("discard {}", self.location));
        Ok(())
    }
}
