//! SSH transport built on libssh2
//!
//! One authenticated session is held for the lifetime of the connection;
//! every command runs on a fresh channel and every file read opens its own
//! SFTP sub-channel.

use super::{RemoteChannel, RemoteFile, RemoteOutput};
use crate::config::{expand_tilde, RemoteConnectionConfig};
use crate::error::{BackupError, Result};
use ssh2::{CheckResult, KnownHostFileKind, Session};
use std::io::{self, Read};
use std::net::TcpStream;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct SshConnection {
    session: Session,
    endpoint: String,
}

impl SshConnection {
    /// Connect and authenticate with the configured private key
    pub fn connect(config: &RemoteConnectionConfig) -> Result<Self> {
        let host = config.ssh_host.as_str();
        let port = config.ssh_port;
        let fail = |message: String| BackupError::Connection {
            host: host.to_string(),
            port,
            message,
        };

        info!("Connecting to {}@{}:{}", config.ssh_username, host, port);

        let tcp = TcpStream::connect((host, port))
            .map_err(|e| fail(format!("TCP connection failed: {}", e)))?;

        let mut session = Session::new().map_err(|e| fail(format!("Failed to create session: {}", e)))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| fail(format!("SSH handshake failed: {}", e)))?;

        match &config.ssh_known_hosts {
            Some(known_hosts) => verify_host_key(&session, host, port, &expand_tilde(known_hosts))
                .map_err(fail)?,
            None => warn!("Host key for {} is not verified (no ssh_known_hosts configured)", host),
        }

        let private_key = expand_tilde(&config.ssh_private_key);
        session
            .userauth_pubkey_file(&config.ssh_username, None, &private_key, None)
            .map_err(|e| fail(format!("Public key authentication failed ({:?}): {}", private_key, e)))?;

        if !session.authenticated() {
            return Err(fail("Authentication was not accepted".to_string()));
        }

        info!("Connected to {}:{}", host, port);

        Ok(Self {
            session,
            endpoint: format!("{}@{}:{}", config.ssh_username, host, port),
        })
    }
}

fn verify_host_key(
    session: &Session,
    host: &str,
    port: u16,
    known_hosts_path: &Path,
) -> std::result::Result<(), String> {
    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| format!("Failed to initialise known hosts: {}", e))?;
    known_hosts
        .read_file(known_hosts_path, KnownHostFileKind::OpenSSH)
        .map_err(|e| format!("Failed to read {:?}: {}", known_hosts_path, e))?;

    let (key, _) = session
        .host_key()
        .ok_or_else(|| "Server did not present a host key".to_string())?;

    match known_hosts.check_port(host, port, key) {
        CheckResult::Match => {
            debug!("Host key for {} matches {:?}", host, known_hosts_path);
            Ok(())
        }
        CheckResult::Mismatch => Err(format!("Host key for {} does not match {:?}", host, known_hosts_path)),
        CheckResult::NotFound => Err(format!("Host {} not found in {:?}", host, known_hosts_path)),
        CheckResult::Failure => Err("Host key check failed".to_string()),
    }
}

impl RemoteChannel for SshConnection {
    fn execute(&self, command: &str) -> Result<RemoteOutput> {
        let fail = |message: String| BackupError::Remote {
            command: command.to_string(),
            message,
        };

        debug!("Running remote command: {}", command);

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| fail(format!("Failed to open channel: {}", e)))?;
        channel
            .exec(command)
            .map_err(|e| fail(format!("Failed to execute: {}", e)))?;

        // Both streams share the channel window: reading one to EOF while the
        // other fills up stalls the remote command
        self.session.set_blocking(false);
        let mut stdout_stream = channel.stream(0);
        let mut stderr_stream = channel.stream(1);
        let drained = drain_streams(&mut stdout_stream, &mut stderr_stream, || channel.eof());
        self.session.set_blocking(true);
        let (stdout, stderr) = drained.map_err(|e| fail(format!("Failed to read output: {}", e)))?;

        channel
            .wait_close()
            .map_err(|e| fail(format!("Failed to close channel: {}", e)))?;
        let status = channel
            .exit_status()
            .map_err(|e| fail(format!("Failed to read exit status: {}", e)))?;

        Ok(RemoteOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    fn open_file_read(&self, path: &str) -> Result<RemoteFile> {
        let fail = |message: String| BackupError::Transfer {
            source_path: path.to_string(),
            destination: self.endpoint.clone(),
            message,
        };

        let sftp = self
            .session
            .sftp()
            .map_err(|e| fail(format!("Failed to open SFTP channel: {}", e)))?;
        let stat = sftp
            .stat(Path::new(path))
            .map_err(|e| fail(format!("Failed to stat remote file: {}", e)))?;
        let size = stat
            .size
            .ok_or_else(|| fail("Remote file size is unknown".to_string()))?;
        let file = sftp
            .open(Path::new(path))
            .map_err(|e| fail(format!("Failed to open remote file: {}", e)))?;

        debug!("Opened remote file {} ({} bytes) over SFTP", path, size);

        Ok(RemoteFile {
            reader: Box::new(SftpReader { file, _sftp: sftp }),
            size,
        })
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "backup finished", None) {
            debug!("Failed to disconnect from {}: {}", self.endpoint, e);
        } else {
            info!("Disconnected from {}", self.endpoint);
        }
    }
}

/// Remote file plus the SFTP sub-channel it was opened on
///
/// Fields drop in order: the file handle closes before the sub-channel.
struct SftpReader {
    file: ssh2::File,
    _sftp: ssh2::Sftp,
}

impl Read for SftpReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read two non-blocking streams alternately until `eof` reports the end
///
/// Returns once a full pass over both streams yields nothing after `eof`
/// has been observed.
fn drain_streams<O, E, F>(stdout: &mut O, stderr: &mut E, eof: F) -> io::Result<(Vec<u8>, Vec<u8>)>
where
    O: Read + ?Sized,
    E: Read + ?Sized,
    F: Fn() -> bool,
{
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut buf = [0u8; 8192];
    let mut eof_seen = false;

    loop {
        let progressed = read_available(stdout, &mut buf, &mut out)?
            | read_available(stderr, &mut buf, &mut err)?;

        if progressed {
            continue;
        }
        if eof_seen {
            return Ok((out, err));
        }
        if eof() {
            eof_seen = true;
        } else {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
    }
}

/// One non-blocking read; true when bytes were appended
fn read_available<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], sink: &mut Vec<u8>) -> io::Result<bool> {
    match reader.read(buf) {
        Ok(0) => Ok(false),
        Ok(n) => {
            sink.extend_from_slice(&buf[..n]);
            Ok(true)
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => Ok(false),
        Err(e) => Err(e),
    }
}
