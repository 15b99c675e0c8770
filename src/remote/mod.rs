//! Remote execution channel
//!
//! The remote directory interface performs every step through this channel:
//! one synchronous command per [`RemoteChannel::execute`] call, and streamed
//! file reads over a file-transfer sub-channel.

pub mod command;
pub mod mock;
pub mod shell;
pub mod ssh;

use crate::error::Result;
use std::io::Read;

pub use shell::ShellChannel;
pub use ssh::SshConnection;

/// Result of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// A remote file opened for streaming
///
/// Dropping it closes the underlying sub-channel.
pub struct RemoteFile {
    pub reader: Box<dyn Read>,
    pub size: u64,
}

/// Abstraction over remote command/file-transfer transports
pub trait RemoteChannel {
    /// Run one command and wait for it to finish
    fn execute(&self, command: &str) -> Result<RemoteOutput>;

    /// Open a remote file for reading
    fn open_file_read(&self, path: &str) -> Result<RemoteFile>;

    /// Human readable endpoint description (for logging)
    fn describe(&self) -> String;
}
