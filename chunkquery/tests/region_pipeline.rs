//! End-to-end tests for the download → cache → render → image flow.
//!
//! A scripted fetcher stands in for the game server so the tests can control
//! which chunks exist, which fail, and when downloads complete.
//!
//! Run with: `cargo test --test region_pipeline`

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::GenericImageView;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use chunkquery::app::{AppConfig, ChunkQueryApp, RegionError};
use chunkquery::cache::{ChunkCache, PersistenceManager};
use chunkquery::chunk::ChunkRecord;
use chunkquery::coord::{ChunkCoord, ChunkKey, Region};
use chunkquery::executor::RetryPolicy;
use chunkquery::images::{ImageKind, ImageQueryError};
use chunkquery::provider::{BoxFuture, ChunkFetcher, FetchError};
use chunkquery::render::{BlockPalette, RenderBarrier};

// ============================================================================
// Helpers
// ============================================================================

/// Fetcher serving uniform chunks, with optional failures and a gate.
struct ScriptedFetcher {
    heights: HashMap<(i32, i32), i32>,
    failing: HashSet<(i32, i32)>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            heights: HashMap::new(),
            failing: HashSet::new(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_height(mut self, cx: i32, cz: i32, height: i32) -> Self {
        self.heights.insert((cx, cz), height);
        self
    }

    fn failing_at(mut self, cx: i32, cz: i32) -> Self {
        self.failing.insert((cx, cz));
        self
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChunkFetcher for ScriptedFetcher {
    fn fetch<'a>(&'a self, key: &'a ChunkKey) -> BoxFuture<'a, Result<ChunkRecord, FetchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.map_err(|_| {
                    FetchError::Connection("gate closed".to_string())
                })?;
            }
            if self.failing.contains(&(key.cx, key.cz)) {
                return Err(FetchError::Server("chunk not generated".to_string()));
            }
            let height = self.heights.get(&(key.cx, key.cz)).copied().unwrap_or(64);
            Ok(ChunkRecord::filled(height, "minecraft:stone"))
        })
    }
}

fn memory_config() -> AppConfig {
    AppConfig::default()
        .without_persistence()
        .with_workers(4)
        .with_retry(RetryPolicy::None)
}

fn palette() -> BlockPalette {
    BlockPalette::new().with("minecraft:stone", [128, 128, 128])
}

/// The four chunks of a radius-1 region around the origin, with distinct heights.
fn two_by_two() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .with_height(-1, -1, 10)
        .with_height(0, -1, 20)
        .with_height(-1, 0, 30)
        .with_height(0, 0, 40)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_two_by_two_region_renders_both_images() {
    let app = ChunkQueryApp::start(memory_config(), Arc::new(two_by_two()), palette())
        .await
        .unwrap();
    let center = ChunkCoord::new(0, 0);

    let summary = app.load_region(center, 1, "world", false).unwrap();
    assert_eq!(summary.queued, 4);

    let report = app
        .render_region_and_wait(center, 1, "world", "alice")
        .await
        .unwrap();
    assert_eq!(report.size, 32);
    assert_eq!(report.chunks_present, 4);
    assert_eq!(report.chunks_missing, 0);
    assert_eq!(report.height_range, Some((10, 40)));

    let heightmap = app.get_image("alice", ImageKind::Heightmap).unwrap();
    let heightmap = image::load_from_memory(&heightmap).unwrap();
    assert_eq!(heightmap.dimensions(), (32, 32));
    let gray = heightmap.to_luma8();

    // Lowest chunk maps to 0, highest to 255.
    assert_eq!(gray.get_pixel(0, 0).0[0], 0);
    assert_eq!(gray.get_pixel(31, 31).0[0], 255);

    let texture = app.get_image_by_name("alice", "texture").unwrap();
    let texture = image::load_from_memory(&texture).unwrap().to_rgb8();
    assert_eq!(texture.dimensions(), (32, 32));
    assert_eq!(texture.get_pixel(7, 23).0, [128, 128, 128]);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_images_are_per_requester() {
    let app = ChunkQueryApp::start(memory_config(), Arc::new(two_by_two()), palette())
        .await
        .unwrap();

    app.load_region(ChunkCoord::new(0, 0), 1, "world", false).unwrap();
    app.render_region_and_wait(ChunkCoord::new(0, 0), 1, "world", "alice")
        .await
        .unwrap();

    assert!(matches!(
        app.get_image("bob", ImageKind::Texture),
        Err(ImageQueryError::NotAvailable { .. })
    ));
    assert!(matches!(
        app.get_image_by_name("alice", "elevation"),
        Err(ImageQueryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_force_reload_fetches_again() {
    let fetcher = Arc::new(two_by_two());
    let app = ChunkQueryApp::start(memory_config(), fetcher.clone(), palette())
        .await
        .unwrap();
    let center = ChunkCoord::new(0, 0);

    app.load_region(center, 1, "world", false).unwrap();
    app.drain().await;
    assert_eq!(fetcher.calls(), 4);

    let cached = app.load_region(center, 1, "world", false).unwrap();
    assert_eq!(cached.skipped, 4);
    app.drain().await;
    assert_eq!(fetcher.calls(), 4);

    let forced = app.load_region(center, 1, "world", true).unwrap();
    assert_eq!(forced.queued, 4);
    app.drain().await;
    assert_eq!(fetcher.calls(), 8);
}

#[tokio::test]
async fn test_overlapping_loads_coalesce() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(two_by_two().gated(Arc::clone(&gate)));
    let app = ChunkQueryApp::start(memory_config(), fetcher.clone(), palette())
        .await
        .unwrap();
    let center = ChunkCoord::new(0, 0);

    let first = app.load_region(center, 1, "world", false).unwrap();
    let second = app.load_region(center, 1, "world", true).unwrap();
    assert_eq!(first.queued, 4);
    assert_eq!(second.joined, 4);
    assert_eq!(second.queued, 0);
    assert_eq!(app.status().outstanding_downloads, 4);

    gate.add_permits(16);
    app.drain().await;

    assert_eq!(fetcher.calls(), 4);
    assert_eq!(app.cache().len(), 4);
    assert_eq!(app.status().telemetry.downloads_coalesced, 4);
}

#[tokio::test]
async fn test_render_waits_for_region_downloads() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = Arc::new(two_by_two().gated(Arc::clone(&gate)));
    let app = Arc::new(
        ChunkQueryApp::start(memory_config(), fetcher, palette())
            .await
            .unwrap(),
    );
    let center = ChunkCoord::new(0, 0);

    app.load_region(center, 1, "world", false).unwrap();

    let render = {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            app.render_region_and_wait(center, 1, "world", "alice")
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!render.is_finished());

    gate.add_permits(4);
    let report = render.await.unwrap().unwrap();
    assert_eq!(report.chunks_present, 4);
}

#[tokio::test]
async fn test_failed_downloads_leave_gaps() {
    let fetcher = Arc::new(two_by_two().failing_at(0, 0));
    let app = ChunkQueryApp::start(memory_config(), fetcher, palette())
        .await
        .unwrap();
    let center = ChunkCoord::new(0, 0);

    app.load_region(center, 1, "world", false).unwrap();
    let report = app
        .render_region_and_wait(center, 1, "world", "alice")
        .await
        .unwrap();
    assert_eq!(report.chunks_present, 3);
    assert_eq!(report.chunks_missing, 1);
    assert_eq!(report.height_range, Some((10, 30)));

    let status = app.status();
    assert_eq!(status.chunk_count, 3);
    assert_eq!(status.telemetry.downloads_failed, 1);

    let texture = app.get_image("alice", ImageKind::Texture).unwrap();
    let texture = image::load_from_memory(&texture).unwrap().to_rgb8();
    assert_eq!(texture.get_pixel(24, 24).0, [0, 0, 0]);

    let heightmap = app.get_image("alice", ImageKind::Heightmap).unwrap();
    let heightmap = image::load_from_memory(&heightmap).unwrap().to_luma8();
    assert_eq!(heightmap.get_pixel(24, 24).0[0], 0);
}

#[tokio::test]
async fn test_global_barrier_waits_for_unrelated_downloads() {
    let config = memory_config().with_render_barrier(RenderBarrier::Global);
    let fetcher = Arc::new(two_by_two());
    let app = ChunkQueryApp::start(config, fetcher.clone(), palette())
        .await
        .unwrap();

    app.load_region(ChunkCoord::new(100, 100), 2, "world", false).unwrap();
    app.load_region(ChunkCoord::new(0, 0), 1, "world", false).unwrap();
    app.render_region_and_wait(ChunkCoord::new(0, 0), 1, "world", "alice")
        .await
        .unwrap();

    assert_eq!(app.status().outstanding_downloads, 0);
    assert_eq!(fetcher.calls(), 20);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let app = ChunkQueryApp::start(memory_config(), Arc::new(two_by_two()), palette())
        .await
        .unwrap();

    assert!(matches!(
        app.render_region(ChunkCoord::new(0, 0), 1, "world", ""),
        Err(RegionError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.get_image("", ImageKind::Heightmap),
        Err(ImageQueryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("chunk_cache.bin");
    let config = memory_config().with_cache_file(&path);

    let app = ChunkQueryApp::start(config.clone(), Arc::new(two_by_two()), palette())
        .await
        .unwrap();
    app.load_region(ChunkCoord::new(0, 0), 1, "world", false).unwrap();
    let report = app
        .render_region_and_wait(ChunkCoord::new(0, 0), 1, "world", "alice")
        .await
        .unwrap();
    assert!(report.saved);
    app.shutdown().await.unwrap();
    assert!(path.exists());

    // Second run: nothing is fetched and the render still sees every chunk.
    let fetcher = Arc::new(ScriptedFetcher::new());
    let app = ChunkQueryApp::start(config, fetcher.clone(), palette())
        .await
        .unwrap();
    assert_eq!(app.cache().len(), 4);
    app.load_region(ChunkCoord::new(0, 0), 1, "world", false).unwrap();
    let report = app
        .render_region_and_wait(ChunkCoord::new(0, 0), 1, "world", "alice")
        .await
        .unwrap();
    assert_eq!(report.chunks_present, 4);
    assert_eq!(report.height_range, Some((10, 40)));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("chunk_cache.bin");
    std::fs::write(&path, b"not a snapshot").unwrap();

    let app = ChunkQueryApp::start(
        memory_config().with_cache_file(&path),
        Arc::new(two_by_two()),
        palette(),
    )
    .await
    .unwrap();
    assert_eq!(app.cache().len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_and_bulk_reader() {
    let cache = Arc::new(ChunkCache::new());
    let region = Region::new(ChunkCoord::new(0, 0), 8);

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for (i, key) in region.keys("world").enumerate() {
                    if i % 4 == w {
                        cache.set(key, ChunkRecord::filled(w as i32, "minecraft:stone"));
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let reader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            let mut last = 0;
            for _ in 0..50 {
                let snapshot = cache.snapshot();
                assert!(snapshot.iter().all(|(_, record)| record.is_complete()));
                assert!(snapshot.len() >= last);
                last = snapshot.len();
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();
    assert_eq!(cache.len(), region.chunk_count());

    let temp = TempDir::new().unwrap();
    let persistence = PersistenceManager::new(temp.path().join("cache.bin"));
    let stats = persistence.save(&cache).await.unwrap();
    assert_eq!(stats.entries, 256);

    let restored = ChunkCache::from_snapshot(persistence.load().unwrap());
    assert_eq!(restored.len(), 256);
}
