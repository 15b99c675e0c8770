//! Test fixtures and sample data
//!
//! Source trees, deterministic clocks and archive inspection.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use dirbackup::utils::clock::mock::SteppingClock;
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Timestamp used by most tests: 2026-10-14 02:00:00
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 14)
        .and_then(|d| d.and_hms_opt(2, 0, 0))
        .expect("valid fixture timestamp")
}

/// Clock starting at [`base_time`] and advancing one second per reading
pub fn stepping_clock() -> Arc<SteppingClock> {
    Arc::new(SteppingClock::new(base_time(), Duration::seconds(1)))
}

/// Clock that always reads [`base_time`]
pub fn frozen_clock() -> Arc<SteppingClock> {
    Arc::new(SteppingClock::fixed(base_time()))
}

/// Create files under `root`, creating parent directories as needed
pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
    }
    root.to_path_buf()
}

/// A small application tree with log and scratch files to exclude
pub fn app_tree(root: &Path) -> PathBuf {
    write_tree(
        root,
        &[
            ("config/app.toml", "port = 8080"),
            ("data/records.db", "records"),
            ("server.log", "started"),
            ("logs/old.log", "rotated"),
            ("tmp/cache.bin", "scratch"),
            ("tmp/nested/upload.part", "partial"),
        ],
    )
}

/// Paths of regular files inside a gzip-compressed tar
pub fn archive_files(data: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(GzDecoder::new(data));
    let mut files: Vec<String> = archive
        .entries()
        .expect("Failed to read archive")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.header().entry_type().is_file())
        .filter_map(|entry| entry.path().ok().map(|p| p.display().to_string()))
        .collect();
    files.sort();
    files
}

pub fn archive_files_at(path: &Path) -> Vec<String> {
    archive_files(&fs::read(path).expect("Failed to read archive file"))
}

/// File names in a directory, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
