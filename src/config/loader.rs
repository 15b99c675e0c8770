use super::types::*;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Destination '{0}' is used by more than one directory")]
    DuplicateDestination(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Backup configuration name must not be empty".to_string(),
        ));
    }

    if config.storage.interface.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Storage interface type must not be empty".to_string(),
        ));
    }

    // Every destination subtree belongs to exactly one directory
    let mut destinations: HashMap<String, usize> = HashMap::new();

    for (index, interface) in config.interfaces.iter().enumerate() {
        if interface.interface.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Interface #{}: interface type must not be empty",
                index
            )));
        }

        for directory in &interface.directories {
            validate_directory(index, directory)?;

            let destination = directory.destination_dir();
            if destinations.insert(destination.clone(), index).is_some() {
                return Err(ConfigError::DuplicateDestination(destination));
            }
        }
    }

    Ok(())
}

fn validate_directory(index: usize, directory: &DirectoryConfig) -> Result<()> {
    let fail = |message: String| {
        Err(ConfigError::ValidationError(format!(
            "Interface #{}, directory '{}': {}",
            index, directory.name, message
        )))
    };

    if directory.src.trim().is_empty() {
        return fail("src must not be empty".to_string());
    }

    if directory.dest.trim().is_empty() {
        return fail("dest must not be empty".to_string());
    }

    let name = directory.name.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return fail("name must be a single non-empty path segment".to_string());
    }

    if directory.retention == Some(0) {
        return fail("retention must keep at least one backup".to_string());
    }

    if directory.exclude.iter().any(|pattern| pattern.trim().is_empty()) {
        return fail("exclude patterns must not be empty".to_string());
    }

    Ok(())
}
