//! Configuration module for dirbackup
//!
//! This module handles loading and validating backup run configuration from TOML files.
//!
//! ## Layout
//!
//! A configuration names one storage backend and an ordered list of backup
//! interfaces. Interface and storage blocks carry a type tag (`interface`)
//! that is resolved through the registry; any other keys in the block are
//! kept as backend-specific settings.
//!
//! ## Example Usage
//!
//! ```no_run
//! use dirbackup::config;
//!
//! let config = config::load_config("backup.toml")?;
//!
//! for interface in &config.interfaces {
//!     println!("Interface: {}, directories: {}", interface.interface, interface.directories.len());
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, parse_config, validate_config, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Deserialize backend-specific settings into a typed structure
pub fn typed_settings<T: serde::de::DeserializeOwned>(
    settings: &toml::Table,
) -> std::result::Result<T, toml::de::Error> {
    toml::Value::Table(settings.clone()).try_into()
}
