//! Test context and harness for pipeline and integration tests
//!
//! Owns a temporary workspace and hands out interface contexts wired to a
//! storage double or to filesystem storage inside the workspace.

use crate::config_builder::ConfigBuilder;
use crate::fixtures;
use anyhow::Result;
use dirbackup::config::Config;
use dirbackup::interfaces::InterfaceContext;
use dirbackup::storage::mock::MockStorage;
use dirbackup::storage::{FilesystemStorage, StoragePort};
use dirbackup::utils::clock::Clock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Option<Config>,
}

impl TestContext {
    /// Create a new test context with a temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            config: None,
        }
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config: Some(config),
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the configuration
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        fixtures::write_tree(self.temp_dir.path(), &[(name, content)]);
        self.temp_dir.path().join(name)
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }

    /// Filesystem storage rooted at `<temp>/storage`
    pub fn filesystem_storage(&self) -> FilesystemStorage {
        FilesystemStorage::with_root(self.create_subdir("storage"))
    }

    /// Interface context around an arbitrary storage and clock
    pub fn context_with(
        &self,
        storage: Arc<dyn StoragePort>,
        clock: Arc<dyn Clock>,
    ) -> InterfaceContext {
        InterfaceContext {
            storage,
            clock,
            span: tracing::Span::none(),
        }
    }

    /// Interface context around a storage double and a stepping clock
    pub fn mock_context(&self, storage: &MockStorage) -> InterfaceContext {
        self.context_with(Arc::new(storage.clone()), fixtures::stepping_clock())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
