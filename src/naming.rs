//! Backup name generation
//!
//! Names are `<logical-name>-YYYY-MM-DDTHH-MM-SS`, with a `-N` collision
//! suffix when a name is taken within the same second. They are
//! extension-free and contain no `.`; stored objects are ordered with
//! [`ordering_key`], not by raw file name.

use chrono::NaiveDateTime;
use std::fmt;

/// Timestamp layout embedded in every backup name
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BackupName(String);

impl BackupName {
    /// Generate a backup name for a logical backup-set name at the given time
    pub fn generate(name: &str, now: NaiveDateTime) -> Self {
        let prefix = name.replace('.', "_");
        Self(format!("{}-{}", prefix, now.format(TIMESTAMP_FORMAT)))
    }

    /// Derive a name for the n-th collision of this name within one second
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Chronological sort key of a stored object name
///
/// Strips everything from the first `.` and splits off a collision suffix,
/// so `app-…T02-00-00-1.tar.gz` orders after `app-…T02-00-00.tar.gz` and
/// `-10` after `-9`.
pub fn ordering_key(file_name: &str) -> (&str, u32) {
    let stem = file_name.split('.').next().unwrap_or(file_name);

    if let Some((base, suffix)) = stem.rsplit_once('-') {
        if let Ok(n) = suffix.parse::<u32>() {
            if ends_with_timestamp(base) {
                return (base, n);
            }
        }
    }
    (stem, 0)
}

fn ends_with_timestamp(value: &str) -> bool {
    // "YYYY-MM-DDTHH-MM-SS"
    const LEN: usize = 19;
    value.len() >= LEN
        && value.is_char_boundary(value.len() - LEN)
        && NaiveDateTime::parse_from_str(&value[value.len() - LEN..], TIMESTAMP_FORMAT).is_ok()
}

impl fmt::Display for BackupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
