//! Remote command construction
//!
//! Every path and pattern is shell-escaped; the remote side runs commands
//! through the login shell of the connected user.

use crate::config::join_key;
use shell_escape::unix::escape;

/// Extension of archives produced by [`archive`]
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

fn quote(value: &str) -> String {
    escape(value.into()).into_owned()
}

/// Probe that exits non-zero when `path` does not exist
pub fn exists_probe(path: &str) -> String {
    format!("ls -d {}", quote(path))
}

/// Probe that exits non-zero when `path` is not readable
pub fn readable_probe(path: &str) -> String {
    format!("test -r {}", quote(path))
}

/// Create a gzip-compressed tar of `src` at `dst`, one exclusion flag per pattern
pub fn archive(dst: &str, src: &str, excludes: &[String]) -> String {
    let mut parts = vec!["tar".to_string(), "-czf".to_string(), quote(dst)];
    parts.extend(
        excludes
            .iter()
            .map(|pattern| quote(&format!("--exclude={}", pattern))),
    );
    parts.push(quote(src));
    parts.join(" ")
}

/// Remove a file, succeeding if it is already gone
pub fn remove(path: &str) -> String {
    format!("rm -f {}", quote(path))
}

/// Temporary archive location for a logical backup name
///
/// Distinct names always map to distinct paths: ASCII alphanumerics, `-` and
/// `.` are kept and every other byte is written as `_xx` hex.
pub fn temp_archive_path(temp_dir: &str, name: &str) -> String {
    let mut file_name = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            file_name.push(char::from(byte));
        } else {
            file_name.push_str(&format!("_{:02x}", byte));
        }
    }
    join_key(temp_dir, &format!("dirbackup-{}.{}", file_name, ARCHIVE_EXTENSION))
}
