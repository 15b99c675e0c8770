//! File-based locking to prevent overlapping runs of one configuration

use crate::error::{BackupError, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lock file for a named backup configuration
pub struct RunLock {
    name: String,
    lock_path: PathBuf,
    lock: RwLock<File>,
}

/// Held while a run is in progress; released on drop
pub struct RunLockGuard<'a> {
    _guard: RwLockWriteGuard<'a, File>,
    lock_path: &'a Path,
}

impl RunLock {
    /// Open (creating if needed) the lock file for a configuration name
    pub fn open(name: &str) -> Result<Self> {
        Self::open_in(&std::env::temp_dir(), name)
    }

    /// Open the lock file in a specific directory
    pub fn open_in(dir: &Path, name: &str) -> Result<Self> {
        let lock_path = dir.join(format!("dirbackup-{}.lock", sanitize(name)));

        debug!("Opening lock file: {:?}", lock_path);

        std::fs::create_dir_all(dir)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        Ok(Self {
            name: name.to_string(),
            lock_path,
            lock: RwLock::new(file),
        })
    }

    /// Take the exclusive lock, failing immediately if another run holds it
    pub fn try_acquire(&mut self) -> Result<RunLockGuard<'_>> {
        let guard = self.lock.try_write().map_err(|_| BackupError::Lock {
            name: self.name.clone(),
            path: self.lock_path.clone(),
        })?;

        info!("Acquired run lock for '{}'", self.name);

        Ok(RunLockGuard {
            _guard: guard,
            lock_path: &self.lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RunLockGuard<'_> {
    fn drop(&mut self) {
        debug!("Released run lock: {:?}", self.lock_path);
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
