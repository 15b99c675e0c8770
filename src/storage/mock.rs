//! In-memory storage for tests
//! Available for use in external test crates

use super::{Progress, StoragePort};
use crate::error::{BackupError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorded storage call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageCall {
    Exists { path: String },
    CreateDirectory { path: String },
    Upload { key: String, size: u64, progress: Progress },
    Retention { path: String, keep: usize },
}

#[derive(Default)]
struct State {
    calls: Vec<StorageCall>,
    directories: BTreeSet<String>,
    objects: BTreeMap<String, Vec<u8>>,
    fail_uploads: Vec<String>,
    fail_retention: bool,
}

/// Mock storage backend that keeps objects in memory
#[derive(Clone, Default)]
pub struct MockStorage {
    state: Arc<Mutex<State>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make uploads fail for keys containing `fragment`
    pub fn fail_uploads_matching(self, fragment: &str) -> Self {
        self.state().fail_uploads.push(fragment.to_string());
        self
    }

    /// Make every retention call fail
    pub fn fail_retention(self) -> Self {
        self.state().fail_retention = true;
        self
    }

    /// Pre-populate an object
    pub fn with_object(self, key: &str, data: &[u8]) -> Self {
        self.state().objects.insert(key.to_string(), data.to_vec());
        self
    }

    pub fn get_calls(&self) -> Vec<StorageCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.get_calls()
            .into_iter()
            .filter_map(|call| match call {
                StorageCall::Upload { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Stored object keys directly under a directory, newest first
    pub fn objects_under(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut keys: Vec<String> = self
            .state()
            .objects
            .keys()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .map(|rest| !rest.is_empty() && !rest.contains('/'))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.cmp(a));
        keys
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state().objects.get(key).cloned()
    }
}

impl StoragePort for MockStorage {
    fn exists(&self, path: &str) -> Result<bool> {
        let mut state = self.state();
        state.calls.push(StorageCall::Exists { path: path.to_string() });
        Ok(state.directories.contains(path) || state.objects.contains_key(path))
    }

    fn create_directory(&self, path: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(StorageCall::CreateDirectory { path: path.to_string() });
        state.directories.insert(path.to_string());
        Ok(())
    }

    fn upload(
        &self,
        reader: &mut dyn Read,
        size: u64,
        key: &str,
        progress: &Progress,
    ) -> Result<()> {
        {
            let mut state = self.state();
            state.calls.push(StorageCall::Upload {
                key: key.to_string(),
                size,
                progress: progress.clone(),
            });
            if state.fail_uploads.iter().any(|fragment| key.contains(fragment.as_str())) {
                return Err(BackupError::Transfer {
                    source_path: progress.source.clone(),
                    destination: key.to_string(),
                    message: "injected upload failure".to_string(),
                });
            }
        }

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| BackupError::Transfer {
                source_path: progress.source.clone(),
                destination: key.to_string(),
                message: e.to_string(),
            })?;

        self.state().objects.insert(key.to_string(), data);
        Ok(())
    }

    fn retention(&self, path: &str, keep: usize) -> Result<()> {
        {
            let mut state = self.state();
            state.calls.push(StorageCall::Retention { path: path.to_string(), keep });
            if state.fail_retention {
                return Err(BackupError::Retention {
                    path: path.to_string(),
                    message: "injected retention failure".to_string(),
                });
            }
        }

        let stale: Vec<String> = self.objects_under(path).into_iter().skip(keep).collect();
        let mut state = self.state();
        for key in stale {
            state.objects.remove(&key);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
