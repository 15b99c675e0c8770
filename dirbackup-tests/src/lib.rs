//! Test utilities for dirbackup
//!
//! This crate provides shared test utilities, recording doubles,
//! and helper functions for testing the dirbackup pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, DirectorySpec, InterfaceSpec};
//!
//! #[test]
//! fn my_test() {
//!     let config = ConfigBuilder::new()
//!         .add_interface(InterfaceSpec::local().with_directory(DirectorySpec::new("/etc", "/backups", "etc")))
//!         .build();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod doubles;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::{ConfigBuilder, DirectorySpec, InterfaceSpec};
pub use doubles::{with_recording, CallLog, RecordingInterface, RECORDING};
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export doubles from the main crate for convenience
pub use dirbackup::remote::mock::{MockRemote, MockResponse, RemoteCall};
pub use dirbackup::storage::mock::{MockStorage, StorageCall};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
