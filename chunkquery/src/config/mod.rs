//! Configuration file handling.
//!
//! User settings live in `~/.chunkquery/config.ini`. Every key is optional;
//! missing keys keep their defaults and invalid values are rejected with the
//! offending section and key named.
//!
//! ```ini
//! [server]
//! api_server = 127.0.0.1:8090
//! timeout = 30
//!
//! [cache]
//! file = ~/.chunkquery/chunk_cache.bin
//! auto_save = true
//!
//! [download]
//! workers = 6
//! max_attempts = 3
//! initial_delay_ms = 100
//!
//! [render]
//! barrier = region
//! radius = 12
//! palette = ~/.chunkquery/palette.json
//!
//! [logging]
//! directory = ~/.chunkquery/logs
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
pub use settings::{
    CacheSettings, DownloadSettings, LoggingSettings, RenderSettings, ServerSettings,
    DEFAULT_LOG_FILE, DEFAULT_RADIUS, DEFAULT_TIMEOUT_SECS, MAX_DOWNLOAD_WORKERS,
};
