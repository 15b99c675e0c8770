//! Remote directory backup interface
//!
//! Every step runs on the remote machine through a [`RemoteChannel`]:
//! directories are probed with `ls -d` and `test -r`, archived with
//! `tar -czf` into the remote temp directory, streamed into storage over a
//! file-transfer sub-channel, and the temporary archive is removed with
//! `rm -f` once the upload attempt is over.
//!
//! The channel is held for the lifetime of the interface; there is one
//! connection per interface instance, not per directory.

use super::{Artifact, ArtifactReader, BackupInterface, InterfaceContext};
use crate::config::{typed_settings, DirectoryConfig, InterfaceConfig, RemoteConnectionConfig};
use crate::error::{BackupError, Probe, Result};
use crate::remote::{command, RemoteChannel, SshConnection};
use tracing::{debug, error, info};

pub const KIND: &str = "ssh_directory";

pub struct RemoteDirectoryBackup<C: RemoteChannel> {
    channel: C,
    temp_dir: String,
    directories: Vec<DirectoryConfig>,
    context: InterfaceContext,
}

impl RemoteDirectoryBackup<SshConnection> {
    /// Registry constructor: parse connection settings and connect
    pub fn connect(config: &InterfaceConfig, context: InterfaceContext) -> Result<Self> {
        let connection: RemoteConnectionConfig =
            typed_settings(&config.settings).map_err(|e| BackupError::Settings {
                kind: KIND.to_string(),
                message: e.to_string(),
            })?;

        let channel = {
            let _span = context.span.enter();
            SshConnection::connect(&connection)?
        };

        Ok(Self::new(
            channel,
            connection.remote_temp_dir,
            config.directories.clone(),
            context,
        ))
    }
}

impl<C: RemoteChannel> RemoteDirectoryBackup<C> {
    pub fn new(
        channel: C,
        temp_dir: impl Into<String>,
        directories: Vec<DirectoryConfig>,
        context: InterfaceContext,
    ) -> Self {
        Self {
            channel,
            temp_dir: temp_dir.into(),
            directories,
            context,
        }
    }

    fn probe(&self, src: &str, probe: Probe) -> Result<()> {
        let cmd = match probe {
            Probe::Exists => command::exists_probe(src),
            Probe::Readable => command::readable_probe(src),
        };
        debug!("Running command: '{}'", cmd);

        let output = self.channel.execute(&cmd)?;
        if output.success() {
            return Ok(());
        }

        let message = match probe {
            Probe::Exists => format!(
                "directory does not exist on {} (exit status {}): {}",
                self.channel.describe(),
                output.status,
                output.stderr.trim()
            ),
            Probe::Readable => format!(
                "no read access on {} (exit status {}): {}",
                self.channel.describe(),
                output.status,
                output.stderr.trim()
            ),
        };

        Err(BackupError::Validation {
            path: src.to_string(),
            probe,
            message,
        })
    }
}

impl<C: RemoteChannel> BackupInterface for RemoteDirectoryBackup<C> {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn directories(&self) -> &[DirectoryConfig] {
        &self.directories
    }

    fn context(&self) -> &InterfaceContext {
        &self.context
    }

    fn upload_label(&self) -> &'static str {
        "Uploading from remote directory"
    }

    fn validate(&self) -> Result<()> {
        let _span = self.context.span.enter();
        info!("Validating remote source directories on {}", self.channel.describe());

        for directory in &self.directories {
            self.probe(&directory.src, Probe::Exists)?;
            self.probe(&directory.src, Probe::Readable)?;
        }

        Ok(())
    }

    fn archive(&self, directory: &DirectoryConfig) -> Result<Box<dyn Artifact + '_>> {
        let location = command::temp_archive_path(&self.temp_dir, &directory.name);

        // Guard first: a failed tar may still leave a partial file behind
        let artifact = RemoteArtifact {
            channel: &self.channel,
            location,
            armed: true,
        };

        let cmd = command::archive(&artifact.location, &directory.src, &directory.exclude);
        info!("Creating temporary archive of remote directory: '{}'", artifact.location);
        debug!("Running command: '{}'", cmd);

        let output = self.channel.execute(&cmd)?;
        if !output.success() {
            return Err(BackupError::Archive {
                path: directory.src.clone(),
                command: cmd,
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(Box::new(artifact))
    }
}

/// Temporary archive on the remote machine
///
/// Removed by [`Artifact::discard`], or on drop if never discarded.
struct RemoteArtifact<'a, C: RemoteChannel> {
    channel: &'a C,
    location: String,
    armed: bool,
}

impl<C: RemoteChannel> RemoteArtifact<'_, C> {
    fn remove(&self) -> Result<()> {
        let cmd = command::remove(&self.location);
        debug!("Running command: '{}'", cmd);

        let output = self.channel.execute(&cmd)?;
        if output.success() {
            Ok(())
        } else {
            Err(BackupError::Remote {
                command: cmd,
                message: format!("exit status {}: {}", output.status, output.stderr.trim()),
            })
        }
    }
}

impl<C: RemoteChannel> Artifact for RemoteArtifact<'_, C> {
    fn location(&self) -> &str {
        &self.location
    }

    fn extension(&self) -> &str {
        command::ARCHIVE_EXTENSION
    }

    fn open(&self) -> Result<ArtifactReader<'_>> {
        let file = self.channel.open_file_read(&self.location)?;
        Ok(ArtifactReader {
            reader: file.reader,
            size: file.size,
        })
    }

    fn discard(mut self: Box<Self>) -> Result<()> {
        self.armed = false;
        self.remove()
    }
}

impl<C: RemoteChannel> Drop for RemoteArtifact<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        info!("Removing temporary archive of remote directory: '{}'", self.location);
        if let Err(e) = self.remove() {
            error!("Failed to remove temporary archive '{}': {}", self.location, e);
        }
    }
}
