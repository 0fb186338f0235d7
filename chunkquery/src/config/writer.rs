//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let palette = config
        .render
        .palette
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();

    format!(
        r#"[server]
; Game server API address (host:port)
api_server = {}
; Per-request timeout in seconds
timeout = {}

[cache]
; Chunk cache snapshot file
file = {}
; Save the cache after every render
auto_save = {}

[download]
; Number of concurrent download workers
workers = {}
; Attempts per chunk, including the first (connection errors only)
max_attempts = {}
; Delay before the first retry; doubles after each failure
initial_delay_ms = {}

[render]
; What a render waits for before reading the cache:
;   region - only downloads inside the rendered region
;   global - every outstanding download
barrier = {}
; Default region radius in chunks
radius = {}
; JSON block palette ({{"minecraft:stone": [125, 125, 125], ...}}); built-in when empty
palette = {}

[logging]
directory = {}
file = {}
"#,
        config.server.api_server,
        config.server.timeout,
        path_to_string(&config.cache.file),
        config.cache.auto_save,
        config.download.workers,
        config.download.max_attempts,
        config.download.initial_delay_ms,
        config.render.barrier,
        config.render.radius,
        palette,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
