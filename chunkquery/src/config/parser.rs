//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use crate::coord::MAX_RADIUS;
use super::settings::{ConfigFile, MAX_DOWNLOAD_WORKERS};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("api_server") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("server", "api_server", v, "must not be empty"));
            }
            config.server.api_server = v.to_string();
        }
        if let Some(v) = parse_number::<u64>(section, "server", "timeout")? {
            if v == 0 {
                return Err(invalid("server", "timeout", "0", "must be at least 1 second"));
            }
            config.server.timeout = v;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.file = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("auto_save") {
            config.cache.auto_save = parse_bool(v).ok_or_else(|| {
                invalid(
                    "cache",
                    "auto_save",
                    v,
                    "expected true/false, yes/no, 1/0 or on/off",
                )
            })?;
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = parse_number::<usize>(section, "download", "workers")? {
            if v == 0 || v > MAX_DOWNLOAD_WORKERS {
                return Err(invalid(
                    "download",
                    "workers",
                    &v.to_string(),
                    &format!("must be between 1 and {}", MAX_DOWNLOAD_WORKERS),
                ));
            }
            config.download.workers = v;
        }
        if let Some(v) = parse_number::<u32>(section, "download", "max_attempts")? {
            if v == 0 {
                return Err(invalid("download", "max_attempts", "0", "must be at least 1"));
            }
            config.download.max_attempts = v;
        }
        if let Some(v) = parse_number::<u64>(section, "download", "initial_delay_ms")? {
            config.download.initial_delay_ms = v;
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = section.get("barrier") {
            config.render.barrier = v
                .parse()
                .map_err(|reason: String| invalid("render", "barrier", v, &reason))?;
        }
        if let Some(v) = parse_number::<u32>(section, "render", "radius")? {
            if v == 0 {
                return Err(invalid("render", "radius", "0", "must be at least 1"));
            }
            if v > MAX_RADIUS {
                return Err(invalid(
                    "render",
                    "radius",
                    &v.to_string(),
                    &format!("must be at most {}", MAX_RADIUS),
                ));
            }
            config.render.radius = v;
        }
        if let Some(v) = section.get("palette") {
            let v = v.trim();
            config.render.palette = (!v.is_empty()).then(|| expand_tilde(v));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    match section.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section_name, key, v, "expected a non-negative integer")),
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
