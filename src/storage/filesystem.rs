//! Filesystem storage backend
//!
//! Keys are paths, optionally resolved under a root directory. Uploads land
//! in a `.partial` sibling first and are renamed into place only once the
//! expected number of bytes has been written.

use super::{Progress, StoragePort};
use crate::config::FilesystemStorageConfig;
use crate::error::{BackupError, Result};
use crate::naming::ordering_key;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PARTIAL_SUFFIX: &str = ".partial";

pub struct FilesystemStorage {
    root: Option<PathBuf>,
}

impl FilesystemStorage {
    pub fn new(config: &FilesystemStorageConfig) -> Self {
        Self {
            root: config.root.as_deref().map(crate::config::expand_tilde),
        }
    }

    /// Storage rooted at a directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Resolve a storage key to a filesystem path
    pub fn resolve(&self, key: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(key.trim_start_matches('/')),
            None => PathBuf::from(key),
        }
    }

    /// Stored backups under a directory, newest first
    pub fn list_backups(&self, path: &str) -> Result<Vec<PathBuf>> {
        let dir = self.resolve(path);
        let mut backups: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| BackupError::storage(path, e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| !entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .map(|entry| entry.path())
            .collect();

        backups.sort_by_cached_key(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let (stem, suffix) = ordering_key(&name);
            std::cmp::Reverse((stem.to_string(), suffix))
        });
        Ok(backups)
    }

    fn write_partial(
        &self,
        reader: &mut dyn Read,
        size: u64,
        partial: &Path,
        progress: &Progress,
    ) -> io::Result<u64> {
        let file = File::create(partial)?;
        let mut writer = BufWriter::new(file);
        let mut reader = ProgressReader::new(reader, progress);

        let written = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        if written != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, received {}", size, written),
            ));
        }

        Ok(written)
    }
}

impl StoragePort for FilesystemStorage {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).exists())
    }

    fn create_directory(&self, path: &str) -> Result<()> {
        let dir = self.resolve(path);
        debug!("Creating storage directory: {:?}", dir);
        fs::create_dir_all(&dir).map_err(|e| BackupError::storage(path, e))
    }

    fn upload(
        &self,
        reader: &mut dyn Read,
        size: u64,
        key: &str,
        progress: &Progress,
    ) -> Result<()> {
        let target = self.resolve(key);
        let mut partial = target.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        info!("{}: {} -> {:?}", progress.label, key, target);

        let outcome = self
            .write_partial(reader, size, &partial, progress)
            .and_then(|written| fs::rename(&partial, &target).map(|_| written));

        match outcome {
            Ok(written) => {
                debug!("Stored {} bytes at {:?}", written, target);
                Ok(())
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&partial) {
                    if remove_err.kind() != io::ErrorKind::NotFound {
                        warn!("Failed to remove partial upload {:?}: {}", partial, remove_err);
                    }
                }
                Err(BackupError::Transfer {
                    source_path: progress.source.clone(),
                    destination: key.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn retention(&self, path: &str, keep: usize) -> Result<()> {
        let backups = self.list_backups(path).map_err(|e| BackupError::Retention {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        if backups.len() <= keep {
            debug!("{} backups at '{}', nothing to prune", backups.len(), path);
            return Ok(());
        }

        for backup in &backups[keep..] {
            info!("Removing backup: {:?}", backup);
            fs::remove_file(backup).map_err(|e| BackupError::Retention {
                path: backup.display().to_string(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

/// Reader wrapper that logs transfer progress at quarter steps
struct ProgressReader<'a, R: ?Sized> {
    inner: &'a mut R,
    progress: &'a Progress,
    transferred: u64,
    next_quarter: u64,
}

impl<'a, R: Read + ?Sized> ProgressReader<'a, R> {
    fn new(inner: &'a mut R, progress: &'a Progress) -> Self {
        Self {
            inner,
            progress,
            transferred: 0,
            next_quarter: 1,
        }
    }
}

impl<R: Read + ?Sized> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.transferred += n as u64;

        let total = self.progress.total;
        while self.next_quarter <= 4 && total > 0 && self.transferred * 4 >= total * self.next_quarter {
            info!(
                "{}: {}% ({}/{} {})",
                self.progress.label,
                self.next_quarter * 25,
                self.transferred,
                total,
                self.progress.unit
            );
            self.next_quarter += 1;
        }

        Ok(n)
    }
}
