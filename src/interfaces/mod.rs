//! Backup interfaces: the source side of every backup
//!
//! An interface validates its configured directories, archives each one in
//! its own environment and hands the archive to the storage port. The per
//! directory pipeline is shared:
//!
//! 1. ensure `dest/name` exists in storage
//! 2. archive the source
//! 3. stream the archive into storage
//! 4. discard the archive (on every path, success or failure)
//! 5. apply retention, only after a successful upload
//!
//! A failure in one directory never stops the following directories.

pub mod local;
pub mod ssh;

use crate::config::{join_key, DirectoryConfig};
use crate::error::{BackupError, Result};
use crate::naming::BackupName;
use crate::storage::{Progress, StoragePort};
use crate::utils::clock::Clock;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Span};

pub use local::LocalDirectoryBackup;
pub use ssh::RemoteDirectoryBackup;

/// Shared collaborators handed to every interface at construction
#[derive(Clone)]
pub struct InterfaceContext {
    pub storage: Arc<dyn StoragePort>,
    pub clock: Arc<dyn Clock>,
    /// Span scoping every log event of this interface instance
    pub span: Span,
}

/// An archive being streamed
pub struct ArtifactReader<'a> {
    pub reader: Box<dyn Read + 'a>,
    pub size: u64,
}

/// A compressed archive produced by [`BackupInterface::archive`]
///
/// The artifact lives in the interface's environment until discarded.
/// Implementations also remove it when dropped without being discarded.
pub trait Artifact {
    /// Where the archive lives (local path or remote path)
    fn location(&self) -> &str;

    /// File extension for the stored object, without a leading dot
    fn extension(&self) -> &str;

    /// Open the archive for streaming
    fn open(&self) -> Result<ArtifactReader<'_>>;

    /// Delete the archive
    fn discard(self: Box<Self>) -> Result<()>;
}

/// Contract every backup source implements
pub trait BackupInterface {
    /// Type tag of this interface (for logging)
    fn kind(&self) -> &'static str;

    fn directories(&self) -> &[DirectoryConfig];

    fn context(&self) -> &InterfaceContext;

    /// Label used for upload progress
    fn upload_label(&self) -> &'static str;

    /// Check that every configured directory exists and is readable
    ///
    /// Stops at the first offending directory.
    fn validate(&self) -> Result<()>;

    /// Create a compressed archive of a directory's source
    fn archive(&self, directory: &DirectoryConfig) -> Result<Box<dyn Artifact + '_>>;

    /// Back up every configured directory
    fn backup(&self) -> Result<BackupReport> {
        Ok(backup_directories(self))
    }
}

/// A backup stored in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBackup {
    pub key: String,
    pub bytes: u64,
    /// Retention failure, reported but not fatal
    pub retention_error: Option<String>,
    /// Failure deleting the temporary archive
    pub cleanup_error: Option<String>,
}

#[derive(Debug)]
pub struct DirectoryOutcome {
    pub name: String,
    pub src: String,
    pub result: std::result::Result<StoredBackup, BackupError>,
}

/// Outcome of [`BackupInterface::backup`]
#[derive(Debug, Default)]
pub struct BackupReport {
    pub outcomes: Vec<DirectoryOutcome>,
}

impl BackupReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn stored(&self) -> impl Iterator<Item = &StoredBackup> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Run the shared pipeline for every directory of an interface
pub fn backup_directories<I: BackupInterface + ?Sized>(interface: &I) -> BackupReport {
    let _interface = interface.context().span.enter();
    info!(
        "Backing up {} directories ({})",
        interface.directories().len(),
        interface.kind()
    );

    let mut report = BackupReport::default();

    for directory in interface.directories() {
        let span = info_span!("directory", name = %directory.name);
        let _directory = span.enter();

        info!("Backing up directory: '{}'", directory.src);
        debug!(
            "Directory configuration: {}",
            serde_json::to_string(directory).unwrap_or_default()
        );

        let result = backup_directory(interface, directory);
        match &result {
            Ok(stored) => info!("Stored backup '{}' ({} bytes)", stored.key, stored.bytes),
            Err(e) => error!("Backup of '{}' failed: {}", directory.src, e),
        }

        report.outcomes.push(DirectoryOutcome {
            name: directory.name.clone(),
            src: directory.src.clone(),
            result,
        });
    }

    info!(
        "Directories: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );

    report
}

fn backup_directory<I: BackupInterface + ?Sized>(
    interface: &I,
    directory: &DirectoryConfig,
) -> Result<StoredBackup> {
    let context = interface.context();
    let storage = context.storage.as_ref();
    let destination = directory.destination_dir();

    if !storage.exists(&destination)? {
        info!("Creating destination directory: '{}'", destination);
        storage.create_directory(&destination)?;
    }

    let name = BackupName::generate(&directory.name, context.clock.now());

    let artifact = interface.archive(directory)?;
    let key = unique_key(storage, &destination, &name, artifact.extension())?;

    let upload = transfer(storage, artifact.as_ref(), &key, interface.upload_label());

    info!("Removing temporary archive: '{}'", artifact.location());
    let cleanup_error = match artifact.discard() {
        Ok(()) => None,
        Err(e) => {
            error!("Failed to remove temporary archive: {}", e);
            Some(e.to_string())
        }
    };

    let bytes = upload?;

    let retention_error = match directory.retention {
        Some(keep) => {
            info!("Applying retention at '{}': keep {}", destination, keep);
            match storage.retention(&destination, keep) {
                Ok(()) => None,
                Err(e) => {
                    warn!("Retention failed at '{}': {}", destination, e);
                    Some(e.to_string())
                }
            }
        }
        None => None,
    };

    Ok(StoredBackup {
        key,
        bytes,
        retention_error,
        cleanup_error,
    })
}

/// Pick a destination key that does not exist yet
fn unique_key(
    storage: &dyn StoragePort,
    destination: &str,
    name: &BackupName,
    extension: &str,
) -> Result<String> {
    let key_for = |name: &BackupName| join_key(destination, &format!("{}.{}", name, extension));

    let mut key = key_for(name);
    let mut attempt = 0;
    while storage.exists(&key)? {
        attempt += 1;
        key = key_for(&name.with_suffix(attempt));
    }
    Ok(key)
}

/// Stream an artifact into storage; the reader is closed before returning
fn transfer(
    storage: &dyn StoragePort,
    artifact: &dyn Artifact,
    key: &str,
    label: &str,
) -> Result<u64> {
    let mut stream = artifact.open()?;
    let progress = Progress::bytes(stream.size, label).with_source(artifact.location());

    info!("Uploading '{}' to '{}' ({} bytes)", artifact.location(), key, stream.size);
    storage.upload(&mut *stream.reader, stream.size, key, &progress)?;

    Ok(stream.size)
}
