//! Settings structs and their defaults.

use std::path::PathBuf;

use super::file::config_directory;
use crate::cache::DEFAULT_CACHE_FILE_NAME;
use crate::executor::{DEFAULT_DOWNLOAD_WORKERS, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::provider::DEFAULT_API_SERVER;
use crate::render::RenderBarrier;

/// Default HTTP timeout per request in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default region radius in chunks.
pub const DEFAULT_RADIUS: u32 = 12;

/// Upper bound for `[download] workers`.
pub const MAX_DOWNLOAD_WORKERS: usize = 64;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "chunkquery.log";

/// All user settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub render: RenderSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// `host:port` of the game server API.
    pub api_server: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Snapshot file.
    pub file: PathBuf,
    /// Save after every render.
    pub auto_save: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub workers: usize,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub barrier: RenderBarrier,
    /// Default region radius for the CLI.
    pub radius: u32,
    /// JSON block palette; the built-in palette when unset.
    pub palette: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let dir = config_directory();
        Self {
            server: ServerSettings {
                api_server: DEFAULT_API_SERVER.to_string(),
                timeout: DEFAULT_TIMEOUT_SECS,
            },
            cache: CacheSettings {
                file: dir.join(DEFAULT_CACHE_FILE_NAME),
                auto_save: true,
            },
            download: DownloadSettings {
                workers: DEFAULT_DOWNLOAD_WORKERS,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            },
            render: RenderSettings {
                barrier: RenderBarrier::default(),
                radius: DEFAULT_RADIUS,
                palette: None,
            },
            logging: LoggingSettings {
                directory: dir.join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
