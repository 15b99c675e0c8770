//! Storage port: the sink side of every backup
//!
//! Backup interfaces only talk to storage through [`StoragePort`]; how objects
//! are persisted, how progress is rendered, and how old backups are pruned is
//! up to the backend.

pub mod filesystem;
pub mod mock;

use crate::error::Result;
use std::io::Read;

pub use filesystem::FilesystemStorage;

/// Description of an upload for progress rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Total number of units to transfer
    pub total: u64,
    /// Unit of `total` (always bytes for archives)
    pub unit: &'static str,
    /// Human readable label
    pub label: String,
    /// Where the data is read from (artifact location)
    pub source: String,
}

impl Progress {
    pub fn bytes(total: u64, label: impl Into<String>) -> Self {
        Self {
            total,
            unit: "B",
            label: label.into(),
            source: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Abstraction over storage backends
pub trait StoragePort: Send + Sync {
    /// Check whether a path (directory or object) exists
    fn exists(&self, path: &str) -> Result<bool>;

    /// Create a directory, including missing parents
    fn create_directory(&self, path: &str) -> Result<()>;

    /// Store `size` bytes read from `reader` under `key`
    ///
    /// Either the object exists complete afterwards or an error is returned
    /// and no object is visible under `key`.
    fn upload(&self, reader: &mut dyn Read, size: u64, key: &str, progress: &Progress)
        -> Result<()>;

    /// Keep the newest `keep` backups under `path`, deleting the rest
    fn retention(&self, path: &str, keep: usize) -> Result<()>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}
