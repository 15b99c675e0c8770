//! Scripted remote channel for tests
//! Available for use in external test crates
//!
//! Commands are matched against configured prefixes. `tar -czf <dst> ...`
//! creates `<dst>` with the configured archive bytes when it succeeds, and
//! `rm -f <path>` removes the file, so tests can observe the lifecycle of
//! temporary archives. Paths are expected to need no shell quoting.

use super::{RemoteChannel, RemoteFile, RemoteOutput};
use crate::error::{BackupError, Result};
use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorded remote interaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteCall {
    Execute { command: String },
    OpenFile { path: String },
    CloseFile { path: String },
}

/// Response configuration for mock
#[derive(Clone, Debug)]
pub enum MockResponse {
    Status { status: i32, stdout: String, stderr: String },
    /// The transport itself fails
    ChannelError { message: String },
}

impl MockResponse {
    pub fn ok() -> Self {
        MockResponse::Status {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn exit(status: i32, stderr: &str) -> Self {
        MockResponse::Status {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn stdout(stdout: &str) -> Self {
        MockResponse::Status {
            status: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        MockResponse::ok()
    }
}

#[derive(Default)]
struct State {
    calls: Vec<RemoteCall>,
    responses: Vec<(String, MockResponse)>,
    files: HashMap<String, Vec<u8>>,
    failing_reads: Vec<String>,
    archive_bytes: Vec<u8>,
}

/// Mock remote channel
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<State>>,
}

impl MockRemote {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state().archive_bytes = b"mock archive".to_vec();
        mock
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configure a response for commands starting with `prefix`
    ///
    /// Later expectations take precedence over earlier ones.
    pub fn expect(self, prefix: &str, response: MockResponse) -> Self {
        self.state().responses.push((prefix.to_string(), response));
        self
    }

    /// Bytes written by simulated `tar -czf` commands
    pub fn with_archive_bytes(self, bytes: &[u8]) -> Self {
        self.state().archive_bytes = bytes.to_vec();
        self
    }

    /// Make reads of `path` fail after the file is opened
    pub fn fail_reads_of(self, path: &str) -> Self {
        self.state().failing_reads.push(path.to_string());
        self
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.state().files.contains_key(path)
    }

    pub fn get_calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.get_calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Execute { command } => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn was_called(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    fn response_for(&self, command: &str) -> MockResponse {
        self.state()
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_default()
    }

    fn simulate(&self, command: &str) {
        let mut state = self.state();
        let mut words = command.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("tar"), Some("-czf"), Some(dst)) => {
                let bytes = state.archive_bytes.clone();
                state.files.insert(dst.to_string(), bytes);
            }
            (Some("rm"), Some("-f"), Some(path)) => {
                state.files.remove(path);
            }
            _ => {}
        }
    }
}

impl RemoteChannel for MockRemote {
    fn execute(&self, command: &str) -> Result<RemoteOutput> {
        self.state().calls.push(RemoteCall::Execute {
            command: command.to_string(),
        });

        match self.response_for(command) {
            MockResponse::Status { status, stdout, stderr } => {
                if status == 0 {
                    self.simulate(command);
                }
                Ok(RemoteOutput { status, stdout, stderr })
            }
            MockResponse::ChannelError { message } => Err(BackupError::Remote {
                command: command.to_string(),
                message,
            }),
        }
    }

    fn open_file_read(&self, path: &str) -> Result<RemoteFile> {
        let mut state = self.state();
        state.calls.push(RemoteCall::OpenFile { path: path.to_string() });

        let data = state.files.get(path).cloned().ok_or_else(|| BackupError::Transfer {
            source_path: path.to_string(),
            destination: "mock".to_string(),
            message: "no such file".to_string(),
        })?;
        let size = data.len() as u64;
        let fail = state.failing_reads.iter().any(|p| p == path);

        Ok(RemoteFile {
            reader: Box::new(MockFile {
                data: io::Cursor::new(data),
                fail,
                path: path.to_string(),
                state: Arc::clone(&self.state),
            }),
            size,
        })
    }

    fn describe(&self) -> String {
        "mock remote".to_string()
    }
}

struct MockFile {
    data: io::Cursor<Vec<u8>>,
    fail: bool,
    path: String,
    state: Arc<Mutex<State>>,
}

impl Read for MockFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "channel closed by peer"));
        }
        self.data.read(buf)
    }
}

impl Drop for MockFile {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(RemoteCall::CloseFile {
            path: self.path.clone(),
        });
    }
}
