//! Remote channel that runs commands on this machine
//!
//! Commands go through `sh -c` and files are read from the local filesystem,
//! so the remote-directory pipeline can be exercised without an SSH server.

use super::{RemoteChannel, RemoteFile, RemoteOutput};
use crate::error::{BackupError, Result};
use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ShellChannel {
    working_dir: Option<PathBuf>,
}

impl ShellChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands from a specific working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl RemoteChannel for ShellChannel {
    fn execute(&self, command: &str) -> Result<RemoteOutput> {
        debug!("Running shell command: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| BackupError::Remote {
            command: command.to_string(),
            message: format!("Failed to execute sh: {}", e),
        })?;

        Ok(RemoteOutput {
            // Killed by a signal: no exit code
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn open_file_read(&self, path: &str) -> Result<RemoteFile> {
        let fail = |e: std::io::Error| BackupError::Transfer {
            source_path: path.to_string(),
            destination: self.describe(),
            message: e.to_string(),
        };

        let file = File::open(path).map_err(fail)?;
        let size = file.metadata().map_err(fail)?.len();

        Ok(RemoteFile {
            reader: Box::new(file),
            size,
        })
    }

    fn describe(&self) -> String {
        "local shell".to_string()
    }
}
