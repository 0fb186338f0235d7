//! Full-snapshot persistence of the chunk cache.
//!
//! The whole cache is written as one bincode blob. There is no incremental
//! format and no version header: a file that does not decode is treated the
//! same as a missing one and the cache starts empty.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory::ChunkCache;
use crate::chunk::ChunkRecord;
use crate::coord::ChunkKey;

/// File name used for the snapshot when none is configured.
pub const DEFAULT_CACHE_FILE_NAME: &str = "chunk_cache.bin";

/// Default snapshot location: `~/.chunkquery/chunk_cache.bin`.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".chunkquery").join(DEFAULT_CACHE_FILE_NAME))
}

/// Owned form of a snapshot, as read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<(ChunkKey, ChunkRecord)>,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Borrowed form with the same encoding as [`CacheSnapshot`], used for writing
/// without cloning every record.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    entries: Vec<(&'a ChunkKey, &'a ChunkRecord)>,
}

/// Errors from reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(String),

    #[error("failed to decode snapshot: {0}")]
    Decode(String),

    #[error("snapshot task failed: {0}")]
    Task(String),
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveStats {
    pub entries: usize,
    pub bytes: u64,
    pub duration: Duration,
}

/// Loads the snapshot at startup and writes it on demand.
///
/// Saves are serialized through an async mutex, so an explicit save and an
/// auto-save after a render never write the file at the same time.
#[derive(Debug)]
pub struct PersistenceManager {
    path: PathBuf,
    write_lock: Mutex<()>,
    saves: AtomicU64,
}

impl PersistenceManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            saves: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of completed saves since construction.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Reads the snapshot file. Any failure is logged and reported as `None`.
    pub fn load(&self) -> Option<CacheSnapshot> {
        let start = Instant::now();
        match read_snapshot(&self.path) {
            Ok(snapshot) => {
                info!(
                    path = %self.path.display(),
                    entries = snapshot.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Loaded chunk cache snapshot"
                );
                Some(snapshot)
            }
            Err(PersistenceError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No chunk cache snapshot found, starting empty");
                None
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable chunk cache snapshot, starting empty"
                );
                None
            }
        }
    }

    /// Writes the full cache to disk.
    ///
    /// The snapshot goes to a temporary file next to the target which is then
    /// renamed over it, so the target always holds a complete snapshot.
    pub async fn save(&self, cache: &ChunkCache) -> Result<SaveStats, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();

        let entries = cache.snapshot();
        let count = entries.len();
        let path = self.path.clone();

        let bytes = tokio::task::spawn_blocking(move || write_snapshot(&path, &entries))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))??;

        self.saves.fetch_add(1, Ordering::Relaxed);
        let stats = SaveStats {
            entries: count,
            bytes,
            duration: start.elapsed(),
        };

        info!(
            path = %self.path.display(),
            entries = stats.entries,
            bytes = stats.bytes,
            elapsed_ms = stats.duration.as_millis() as u64,
            "Saved chunk cache snapshot"
        );

        Ok(stats)
    }
}

fn read_snapshot(path: &Path) -> Result<CacheSnapshot, PersistenceError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    bincode::deserialize_from(reader).map_err(|e| PersistenceError::Decode(e.to_string()))
}

fn write_snapshot(
    path: &Path,
    entries: &[(ChunkKey, Arc<ChunkRecord>)],
) -> Result<u64, PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let snapshot = SnapshotRef {
        entries: entries.iter().map(|(k, r)| (k, r.as_ref())).collect(),
    };

    let temp_path = temp_path_for(path);
    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &snapshot)
        .map_err(|e| PersistenceError::Encode(e.to_string()))?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), "Renamed snapshot into place");

    Ok(std::fs::metadata(path)?.len())
}

/// Sibling of `path` with `.tmp` appended to the full file name, so it never
/// equals `path` whatever its extension.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_CACHE_FILE_NAME.into());
    name.push(".tmp");
    path.with_file_name(name)
}
