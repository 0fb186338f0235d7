//! Application configuration for ChunkQueryApp.
//!
//! `AppConfig` is the single configuration surface passed to
//! [`ChunkQueryApp::start`](super::ChunkQueryApp::start).

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::default_cache_path;
use crate::config::{ConfigFile, DEFAULT_TIMEOUT_SECS};
use crate::executor::{DownloadConfig, RetryPolicy};
use crate::provider::DEFAULT_API_SERVER;
use crate::render::{RenderBarrier, RenderConfig};

/// Application configuration combining all component configs.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Game server API address (`host:port` or URL).
    pub api_server: String,

    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,

    /// Snapshot file; `None` disables persistence entirely.
    pub cache_file: Option<PathBuf>,

    /// Save the cache after every render.
    pub auto_save: bool,

    /// Download worker pool configuration.
    pub download: DownloadConfig,

    /// What renders wait for.
    pub render_barrier: RenderBarrier,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_server: DEFAULT_API_SERVER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_file: default_cache_path(),
            auto_save: true,
            download: DownloadConfig::default(),
            render_barrier: RenderBarrier::default(),
        }
    }
}

impl AppConfig {
    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            api_server: config.server.api_server.clone(),
            timeout_secs: config.server.timeout,
            cache_file: Some(config.cache.file.clone()),
            auto_save: config.cache.auto_save,
            download: DownloadConfig {
                workers: config.download.workers,
                retry: RetryPolicy::exponential_from(
                    config.download.max_attempts,
                    Duration::from_millis(config.download.initial_delay_ms),
                ),
            },
            render_barrier: config.render.barrier,
        }
    }

    pub fn with_api_server(mut self, api_server: impl Into<String>) -> Self {
        self.api_server = api_server.into();
        self
    }

    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Keep the cache in memory only.
    pub fn without_persistence(mut self) -> Self {
        self.cache_file = None;
        self
    }

    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.download.workers = workers;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.download.retry = retry;
        self
    }

    pub fn with_render_barrier(mut self, barrier: RenderBarrier) -> Self {
        self.render_barrier = barrier;
        self
    }

    pub(crate) fn render_config(&self) -> RenderConfig {
        RenderConfig {
            barrier: self.render_barrier,
            auto_save: self.auto_save && self.cache_file.is_some(),
        }
    }
}
