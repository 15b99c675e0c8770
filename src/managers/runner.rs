//! Backup runner - orchestrates one backup run
//!
//! Interfaces run sequentially in configuration order. Each enabled
//! interface is constructed, validated, then backed up; a construction or
//! validation failure aborts that interface only and the run moves on to
//! the next one.

use crate::config::{Config, InterfaceConfig};
use crate::error::{BackupError, Result};
use crate::interfaces::{BackupReport, InterfaceContext};
use crate::registry::Registry;
use crate::storage::StoragePort;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::locker::RunLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

pub struct Runner {
    config: Config,
    registry: Registry,
    clock: Arc<dyn Clock>,
    lock_dir: Option<PathBuf>,
}

/// What happened to one configured interface
#[derive(Debug)]
pub enum InterfaceStatus {
    /// Disabled in configuration
    Skipped,
    /// Construction (connection) or validation failed; no backup attempted
    Failed(BackupError),
    /// Backup ran; individual directories may still have failed
    Completed(BackupReport),
}

#[derive(Debug)]
pub struct InterfaceSummary {
    pub index: usize,
    pub kind: String,
    pub status: InterfaceStatus,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub interfaces: Vec<InterfaceSummary>,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.interfaces
            .iter()
            .filter(|i| matches!(i.status, InterfaceStatus::Skipped))
            .count()
    }

    /// Interfaces that failed outright or had at least one failed directory
    pub fn failed(&self) -> usize {
        self.interfaces
            .iter()
            .filter(|i| match &i.status {
                InterfaceStatus::Failed(_) => true,
                InterfaceStatus::Completed(report) => !report.is_success(),
                InterfaceStatus::Skipped => false,
            })
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.interfaces.len() - self.skipped() - self.failed()
    }

    pub fn failed_directories(&self) -> usize {
        self.interfaces
            .iter()
            .map(|i| match &i.status {
                InterfaceStatus::Completed(report) => report.failed(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// One line per failure, for the final error message
    pub fn failure_messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        for interface in &self.interfaces {
            match &interface.status {
                InterfaceStatus::Failed(e) => {
                    messages.push(format!("{} #{}: {}", interface.kind, interface.index, e))
                }
                InterfaceStatus::Completed(report) => {
                    for outcome in &report.outcomes {
                        if let Err(e) = &outcome.result {
                            messages.push(format!(
                                "{} #{} '{}': {}",
                                interface.kind, interface.index, outcome.name, e
                            ));
                        }
                    }
                }
                InterfaceStatus::Skipped => {}
            }
        }
        messages
    }
}

impl Runner {
    /// Create a runner using the builtin registry
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, Registry::builtin())
    }

    pub fn with_registry(config: Config, registry: Registry) -> Self {
        Self {
            config,
            registry,
            clock: Arc::new(SystemClock),
            lock_dir: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Directory for the run lock file (defaults to the system temp dir)
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the run
    ///
    /// Errors returned here abort the whole run (lock held elsewhere, unknown
    /// type tag, storage construction); per-interface failures are reported in
    /// the summary instead.
    pub fn run(&self) -> Result<RunSummary> {
        let span = info_span!("run", config = %self.config.name);
        let _run = span.enter();

        info!("Starting backup process");
        info!("Using backup configuration: '{}'", self.config.name);

        let start_time = Instant::now();

        let mut lock = match &self.lock_dir {
            Some(dir) => RunLock::open_in(dir, &self.config.name)?,
            None => RunLock::open(&self.config.name)?,
        };
        let _guard = lock.try_acquire()?;

        self.registry.check(&self.config)?;

        let storage = self.registry.build_storage(&self.config.storage)?;
        info!("Using storage interface: '{}'", storage.name());

        let mut summary = RunSummary::default();

        for (index, interface) in self.config.interfaces.iter().enumerate() {
            let status = if interface.enabled {
                self.run_interface(index, interface, &storage)
            } else {
                info!(
                    "Backup interface '{}' is disabled, interface will be skipped",
                    interface.interface
                );
                InterfaceStatus::Skipped
            };

            summary.interfaces.push(InterfaceSummary {
                index,
                kind: interface.interface.clone(),
                status,
            });
        }

        info!(
            "Backup summary: {} succeeded, {} failed, {} skipped ({} failed directories) in {:.2}s",
            summary.succeeded(),
            summary.failed(),
            summary.skipped(),
            summary.failed_directories(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(summary)
    }

    fn run_interface(
        &self,
        index: usize,
        config: &InterfaceConfig,
        storage: &Arc<dyn StoragePort>,
    ) -> InterfaceStatus {
        let span = info_span!("interface", index, kind = %config.interface);
        let context = InterfaceContext {
            storage: Arc::clone(storage),
            clock: Arc::clone(&self.clock),
            span: span.clone(),
        };
        let _interface = span.enter();

        info!("Initializing backup interface '{}'", config.interface);
        let interface = match self.registry.build_interface(config, context) {
            Ok(interface) => interface,
            Err(e) => {
                error!("Failed to initialize interface '{}': {}", config.interface, e);
                return InterfaceStatus::Failed(e);
            }
        };

        if let Err(e) = interface.validate() {
            error!("Validation failed, backup will not run: {}", e);
            return InterfaceStatus::Failed(e);
        }

        match interface.backup() {
            Ok(report) => {
                if !report.is_success() {
                    warn!(
                        "Interface '{}' finished with {} failed directories",
                        config.interface,
                        report.failed()
                    );
                }
                InterfaceStatus::Completed(report)
            }
            Err(e) => {
                error!("Backup failed for interface '{}': {}", config.interface, e);
                InterfaceStatus::Failed(e)
            }
        }
    }
}
