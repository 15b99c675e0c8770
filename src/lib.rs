//! Directory Backup Library
//!
//! Archives configured directories (local or over SSH), streams the archives
//! into a storage backend and applies retention per destination.

pub mod config;
pub mod error;
pub mod interfaces;
pub mod managers;
pub mod naming;
pub mod registry;
pub mod remote;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config, ConfigError};
pub use error::{BackupError, Result};
pub use interfaces::{BackupInterface, BackupReport, InterfaceContext};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::runner::{InterfaceStatus, RunSummary, Runner};
pub use registry::Registry;
pub use storage::StoragePort;
