//! Local directory backup interface
//!
//! Archives directories on this machine into self-deleting temporary
//! `tar.gz` files.

use super::{Artifact, ArtifactReader, BackupInterface, InterfaceContext};
use crate::config::{DirectoryConfig, InterfaceConfig};
use crate::error::{BackupError, Probe, Result};
use crate::remote::command::ARCHIVE_EXTENSION;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, info, warn};

pub const KIND: &str = "local_directory";

pub struct LocalDirectoryBackup {
    directories: Vec<DirectoryConfig>,
    context: InterfaceContext,
}

impl LocalDirectoryBackup {
    pub fn new(directories: Vec<DirectoryConfig>, context: InterfaceContext) -> Self {
        Self {
            directories,
            context,
        }
    }

    /// Registry constructor
    pub fn from_config(config: &InterfaceConfig, context: InterfaceContext) -> Result<Self> {
        Ok(Self::new(config.directories.clone(), context))
    }
}

fn validate_directory(src: &str) -> Result<()> {
    let path = Path::new(src);
    let fail = |probe: Probe, e: std::io::Error| BackupError::Validation {
        path: src.to_string(),
        probe,
        message: e.to_string(),
    };

    let metadata = fs::metadata(path).map_err(|e| fail(Probe::Exists, e))?;

    let readable = if metadata.is_dir() {
        fs::read_dir(path).map(|_| ())
    } else {
        File::open(path).map(|_| ())
    };
    readable.map_err(|e| fail(Probe::Readable, e))
}

fn write_archive(src: &Path, file: &File) -> std::io::Result<()> {
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    if src.is_dir() {
        builder.append_dir_all(".", src)?;
    } else {
        let name = src.file_name().map(Path::new).unwrap_or(src);
        builder.append_path_with_name(src, name)?;
    }

    let encoder = builder.into_inner()?;
    let writer = encoder.finish()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()
}

impl BackupInterface for LocalDirectoryBackup {
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
        "Uploading from local directory"
    }

    fn validate(&self) -> Result<()> {
        let _span = self.context.span.enter();
        info!("Validating local source directories");

        for directory in &self.directories {
            debug!("Checking '{}'", directory.src);
            validate_directory(&directory.src)?;
        }

        Ok(())
    }

    fn archive(&self, directory: &DirectoryConfig) -> Result<Box<dyn Artifact + '_>> {
        info!("Creating archive of local directory: '{}'", directory.src);

        if !directory.exclude.is_empty() {
            warn!(
                "Exclusion patterns are not applied to local directory '{}'",
                directory.src
            );
        }

        let fail = |e: std::io::Error| BackupError::Archive {
            path: directory.src.clone(),
            command: "tar.gz (in-process)".to_string(),
            status: -1,
            stderr: e.to_string(),
        };

        let temp = tempfile::Builder::new()
            .prefix(&format!("dirbackup-{}-", directory.name))
            .suffix(&format!(".{}", ARCHIVE_EXTENSION))
            .tempfile()
            .map_err(fail)?;

        write_archive(Path::new(&directory.src), temp.as_file()).map_err(fail)?;

        let path = temp.into_temp_path();
        let location = path.display().to_string();
        debug!("Created archive: {}", location);

        Ok(Box::new(LocalArtifact { path, location }))
    }
}

/// Temporary local archive, deleted when dropped
struct LocalArtifact {
    path: TempPath,
    location: String,
}

impl Artifact for LocalArtifact {
    fn location(&self) -> &str {
        &self.location
    }

    fn extension(&self) -> &str {
        ARCHIVE_EXTENSION
    }

    fn open(&self) -> Result<ArtifactReader<'_>> {
        let file = File::open(&self.path)?;
        let size = file.metadata()?.len();
        Ok(ArtifactReader {
            reader: Box::new(file),
            size,
        })
    }

    fn discard(self: Box<Self>) -> Result<()> {
        self.path.close()?;
        Ok(())
    }
}
