//! Static registry of storage backends and backup interfaces
//!
//! Configuration blocks name their type with a tag; the registry maps each
//! known tag to a constructor. Unknown tags are rejected before a run starts.

use crate::config::{typed_settings, Config, FilesystemStorageConfig, InterfaceConfig, StorageConfig};
use crate::error::{BackupError, Result};
use crate::interfaces::{self, BackupInterface, InterfaceContext, LocalDirectoryBackup, RemoteDirectoryBackup};
use crate::storage::{FilesystemStorage, StoragePort};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type InterfaceConstructor =
    Box<dyn Fn(&InterfaceConfig, InterfaceContext) -> Result<Box<dyn BackupInterface>>>;

pub type StorageConstructor = Box<dyn Fn(&StorageConfig) -> Result<Arc<dyn StoragePort>>>;

/// Storage type tags known to the builtin registry
pub const FILESYSTEM_STORAGE: &str = "filesystem";

pub struct Registry {
    interfaces: BTreeMap<String, InterfaceConstructor>,
    storages: BTreeMap<String, StorageConstructor>,
}

impl Registry {
    /// Registry with no entries
    pub fn empty() -> Self {
        Self {
            interfaces: BTreeMap::new(),
            storages: BTreeMap::new(),
        }
    }

    /// Registry with every builtin interface and storage backend
    pub fn builtin() -> Self {
        Self::empty()
            .with_interface(interfaces::local::KIND, |config, context| {
                Ok(Box::new(LocalDirectoryBackup::from_config(config, context)?))
            })
            .with_interface(interfaces::ssh::KIND, |config, context| {
                Ok(Box::new(RemoteDirectoryBackup::connect(config, context)?))
            })
            .with_storage(FILESYSTEM_STORAGE, |config| {
                let settings: FilesystemStorageConfig =
                    typed_settings(&config.settings).map_err(|e| BackupError::Settings {
                        kind: FILESYSTEM_STORAGE.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Arc::new(FilesystemStorage::new(&settings)))
            })
    }

    pub fn with_interface<F>(mut self, tag: &str, constructor: F) -> Self
    where
        F: Fn(&InterfaceConfig, InterfaceContext) -> Result<Box<dyn BackupInterface>> + 'static,
    {
        self.interfaces.insert(tag.to_string(), Box::new(constructor));
        self
    }

    pub fn with_storage<F>(mut self, tag: &str, constructor: F) -> Self
    where
        F: Fn(&StorageConfig) -> Result<Arc<dyn StoragePort>> + 'static,
    {
        self.storages.insert(tag.to_string(), Box::new(constructor));
        self
    }

    pub fn knows_interface(&self, tag: &str) -> bool {
        self.interfaces.contains_key(tag)
    }

    pub fn knows_storage(&self, tag: &str) -> bool {
        self.storages.contains_key(tag)
    }

    pub fn interface_tags(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    /// Fail fast on any tag this registry cannot build
    ///
    /// Disabled interfaces are not checked.
    pub fn check(&self, config: &Config) -> Result<()> {
        if !self.knows_storage(&config.storage.interface) {
            return Err(BackupError::UnknownStorage(config.storage.interface.clone()));
        }

        if let Some(unknown) = config
            .interfaces
            .iter()
            .filter(|interface| interface.enabled)
            .find(|interface| !self.knows_interface(&interface.interface))
        {
            return Err(BackupError::UnknownInterface(unknown.interface.clone()));
        }

        Ok(())
    }

    pub fn build_storage(&self, config: &StorageConfig) -> Result<Arc<dyn StoragePort>> {
        let constructor = self
            .storages
            .get(&config.interface)
            .ok_or_else(|| BackupError::UnknownStorage(config.interface.clone()))?;
        constructor(config)
    }

    pub fn build_interface(
        &self,
        config: &InterfaceConfig,
        context: InterfaceContext,
    ) -> Result<Box<dyn BackupInterface>> {
        let constructor = self
            .interfaces
            .get(&config.interface)
            .ok_or_else(|| BackupError::UnknownInterface(config.interface.clone()))?;
        constructor(config, context)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
