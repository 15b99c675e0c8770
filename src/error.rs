//! Error taxonomy for backup runs
//!
//! Each variant maps to a failure scope: connection and validation errors
//! abort an interface, archive and transfer errors abort only the current
//! directory, retention errors are reported but never undo a stored backup.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Failed to connect to {host}:{port}: {message}")]
    Connection {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Validation failed for '{path}' ({probe}): {message}")]
    Validation {
        path: String,
        probe: Probe,
        message: String,
    },

    #[error("Failed to archive '{path}' (command: {command}, exit status {status}): {stderr}")]
    Archive {
        path: String,
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to transfer '{source_path}' to '{destination}': {message}")]
    Transfer {
        source_path: String,
        destination: String,
        message: String,
    },

    #[error("Failed to apply retention at '{path}': {message}")]
    Retention { path: String, message: String },

    #[error("Storage operation failed at '{path}': {message}")]
    Storage { path: String, message: String },

    #[error("Remote command failed (command: {command}): {message}")]
    Remote { command: String, message: String },

    #[error("Unknown interface type: '{0}'")]
    UnknownInterface(String),

    #[error("Unknown storage type: '{0}'")]
    UnknownStorage(String),

    #[error("Invalid settings for '{kind}': {message}")]
    Settings { kind: String, message: String },

    #[error("Run '{name}' is already in progress (lock: {path:?})")]
    Lock { name: String, path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The check that rejected a source directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The path does not exist (or cannot be listed)
    Exists,
    /// The path exists but is not readable
    Readable,
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Probe::Exists => write!(f, "existence check"),
            Probe::Readable => write!(f, "read access check"),
        }
    }
}

impl BackupError {
    pub(crate) fn storage(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        BackupError::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
