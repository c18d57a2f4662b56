//! Worker configuration

use crate::browser::VisitOptions;
use crate::error::{Result, RobotaskError};
use crate::store::StoreClientConfig;
use std::time::Duration;
use tracing::warn;

/// Maximum number of candidate tasks fetched per claim attempt
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Worker configuration
///
/// Built once at startup and handed to each component by constructor.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Task store connection
    pub store: StoreClientConfig,

    /// Candidates fetched per claim attempt
    pub page_size: usize,

    /// Wall-clock bound on one visit; the execution context is killed after it
    pub hard_timeout: Duration,

    /// Sleep after finding no tasks or an unreachable store
    pub no_task_backoff: Duration,

    /// Sleep after losing a claim race
    pub conflict_backoff: Duration,

    /// Sleep after failing to start the display or the execution context
    pub error_backoff: Duration,

    /// Run each visit inside its own Xvfb display
    pub virtual_display: bool,

    /// Options forwarded to the visit operation
    pub visit: VisitOptions,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            store: StoreClientConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            hard_timeout: Duration::from_secs(90),
            no_task_backoff: Duration::from_secs(30),
            conflict_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(20),
            virtual_display: true,
            visit: VisitOptions::default(),
        }
    }
}

impl WorkerConfig {
    /// Create a new config builder
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }

    /// Check the configuration before the worker starts.
    ///
    /// Errors here are the only fatal errors of the worker.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(RobotaskError::ConfigError(
                "page size must be at least 1".to_string(),
            ));
        }

        if self.hard_timeout.is_zero() {
            return Err(RobotaskError::ConfigError(
                "hard timeout must be greater than zero".to_string(),
            ));
        }

        match &self.visit.extension_path {
            None => {
                return Err(RobotaskError::ConfigError(
                    "extension path not set (PATH_TO_EXTENSION)".to_string(),
                ))
            }
            Some(path) if !path.exists() => {
                return Err(RobotaskError::ConfigError(format!(
                    "extension path does not exist: {}",
                    path.display()
                )))
            }
            Some(_) => {}
        }

        let soft_budget = self
            .visit
            .extension_warmup
            .checked_add(self.visit.page_load_timeout)
            .and_then(|d| d.checked_add(self.visit.settle_delay))
            .ok_or_else(|| {
                RobotaskError::ConfigError(
                    "visit delays overflow when added together".to_string(),
                )
            })?;
        if self.hard_timeout <= soft_budget {
            warn!(
                "Hard timeout {:?} does not exceed the visit's own budget {:?}; slow pages will be killed",
                self.hard_timeout, soft_budget
            );
        }

        Ok(())
    }
}

/// Builder for WorkerConfig
#[derive(Default)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Set the store API root
    pub fn api_base_url(mut self, url: &str) -> Self {
        self.config.store.base_url = url.to_string();
        self
    }

    /// Set the timeout of each store request
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.config.store.request_timeout = duration;
        self
    }

    /// Accept invalid TLS certificates from the store
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.store.accept_invalid_certs = accept;
        self
    }

    /// Set candidate page size
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set hard execution timeout
    pub fn hard_timeout(mut self, duration: Duration) -> Self {
        self.config.hard_timeout = duration;
        self
    }

    /// Set backoff after finding no work
    pub fn no_task_backoff(mut self, duration: Duration) -> Self {
        self.config.no_task_backoff = duration;
        self
    }

    /// Set backoff after a lost claim race
    pub fn conflict_backoff(mut self, duration: Duration) -> Self {
        self.config.conflict_backoff = duration;
        self
    }

    /// Set backoff after an unexpected error
    pub fn error_backoff(mut self, duration: Duration) -> Self {
        self.config.error_backoff = duration;
        self
    }

    /// Enable/disable the Xvfb display
    pub fn virtual_display(mut self, enable: bool) -> Self {
        self.config.virtual_display = enable;
        self
    }

    /// Set visit options
    pub fn visit(mut self, visit: VisitOptions) -> Self {
        self.config.visit = visit;
        self
    }

    /// Build the config
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}
