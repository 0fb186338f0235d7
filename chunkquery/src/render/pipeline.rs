//! Sequential render worker.
//!
//! One task consumes the render queue in order. For each request it waits
//! for the downloads the region depends on, rasterizes the region from the
//! cache, encodes both PNGs, stores them in the [`ImageStore`] and, when
//! enabled, saves the cache.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::encode::encode_png;
use super::error::RenderError;
use super::palette::BlockPalette;
use super::raster::rasterize;
use crate::cache::{ChunkCache, PersistenceManager};
use crate::coord::{ChunkCoord, ChunkKey, Region};
use crate::executor::DownloadDispatcher;
use crate::images::{ImageKind, ImageStore};
use crate::telemetry::PipelineMetrics;

// =============================================================================
// Configuration
// =============================================================================

/// What a render waits for before reading the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderBarrier {
    /// Only downloads of chunks inside the region being rendered.
    #[default]
    Region,
    /// Every outstanding download, whatever region it belongs to.
    Global,
}

impl FromStr for RenderBarrier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(Self::Region),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown render barrier '{}' (expected region or global)", other)),
        }
    }
}

impl fmt::Display for RenderBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region => write!(f, "region"),
            Self::Global => write!(f, "global"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderConfig {
    pub barrier: RenderBarrier,
    /// Save the cache after every render.
    pub auto_save: bool,
}

/// Shared services the render worker reads from and writes to.
pub struct RenderServices {
    pub cache: Arc<ChunkCache>,
    pub dispatcher: Arc<DownloadDispatcher>,
    pub images: Arc<ImageStore>,
    pub palette: Arc<BlockPalette>,
    pub persistence: Option<Arc<PersistenceManager>>,
    pub metrics: Arc<PipelineMetrics>,
}

// =============================================================================
// Requests and reports
// =============================================================================

/// A queued render request.
#[derive(Debug)]
pub struct RenderTask {
    pub region: Region,
    pub world: String,
    pub requester: String,
    submitted_at: Instant,
    reply: Option<oneshot::Sender<Result<RenderReport, RenderError>>>,
}

impl RenderTask {
    pub fn new(
        center: ChunkCoord,
        radius: u32,
        world: impl Into<String>,
        requester: impl Into<String>,
    ) -> Self {
        Self {
            region: Region::new(center, radius),
            world: world.into(),
            requester: requester.into(),
            submitted_at: Instant::now(),
            reply: None,
        }
    }
}

/// What a finished render observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub requester: String,
    pub world: String,
    pub region: Region,
    /// Edge length of both images in pixels.
    pub size: u32,
    pub chunks_present: usize,
    pub chunks_missing: usize,
    pub height_range: Option<(i32, i32)>,
    /// Blocks painted with the fallback color.
    pub unassigned: BTreeSet<String>,
    pub block_counts: BTreeMap<String, u64>,
    /// Time spent waiting for downloads.
    pub wait_time: Duration,
    /// Time spent rasterizing and encoding.
    pub render_time: Duration,
    /// Whether the cache was saved afterwards.
    pub saved: bool,
}

/// Render worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
}

const STATE_IDLE: u8 = 0;
const STATE_RENDERING: u8 = 1;

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Rendering => write!(f, "rendering"),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Handle to the render worker.
pub struct RenderPipeline {
    sender: Mutex<Option<mpsc::UnboundedSender<RenderTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: Arc<AtomicU8>,
}

impl RenderPipeline {
    /// Spawns the render worker. Must be called from within a Tokio runtime.
    pub fn start(config: RenderConfig, services: RenderServices) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(AtomicU8::new(STATE_IDLE));

        info!(
            barrier = %config.barrier,
            auto_save = config.auto_save && services.persistence.is_some(),
            "Render pipeline started"
        );

        let worker = RenderWorker {
            config,
            services,
            state: Arc::clone(&state),
        };
        let handle = tokio::spawn(worker.run(rx));

        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            state,
        }
    }

    /// Queues a render without waiting for it.
    pub fn submit(&self, task: RenderTask) -> Result<(), RenderError> {
        validate(&task)?;
        let sender = self.sender.lock();
        let tx = sender.as_ref().ok_or(RenderError::ShutDown)?;
        tx.send(task).map_err(|_| RenderError::ShutDown)
    }

    /// Queues a render and waits for its report.
    pub async fn submit_and_wait(&self, mut task: RenderTask) -> Result<RenderReport, RenderError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        task.reply = Some(reply_tx);
        self.submit(task)?;
        reply_rx.await.map_err(|_| RenderError::ShutDown)?
    }

    pub fn state(&self) -> RenderState {
        match self.state.load(Ordering::Acquire) {
            STATE_RENDERING => RenderState::Rendering,
            _ => RenderState::Idle,
        }
    }

    /// Stops accepting requests and waits for the queued ones to finish.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Render worker ended abnormally");
            }
            info!("Render pipeline stopped");
        }
    }
}

fn validate(task: &RenderTask) -> Result<(), RenderError> {
    task.region
        .validate()
        .map_err(|e| RenderError::InvalidArgument(e.to_string()))
}

struct RenderWorker {
    config: RenderConfig,
    services: RenderServices,
    state: Arc<AtomicU8>,
}

impl RenderWorker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<RenderTask>) {
        while let Some(mut task) = rx.recv().await {
            self.state.store(STATE_RENDERING, Ordering::Release);

            let reply = task.reply.take();
            let result = self.render(&task).await;

            match &result {
                Ok(report) => info!(
                    requester = %report.requester,
                    world = %report.world,
                    center = %report.region.center,
                    radius = report.region.radius,
                    present = report.chunks_present,
                    missing = report.chunks_missing,
                    wait_ms = report.wait_time.as_millis() as u64,
                    render_ms = report.render_time.as_millis() as u64,
                    unassigned = ?report.unassigned,
                    "Rendered region"
                ),
                Err(e) => {
                    self.services.metrics.render_failed();
                    warn!(requester = %task.requester, error = %e, "Render failed");
                }
            }
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }

            self.state.store(STATE_IDLE, Ordering::Release);
        }
        debug!("Render worker exiting");
    }

    async fn render(&self, task: &RenderTask) -> Result<RenderReport, RenderError> {
        let services = &self.services;
        let queued_for = task.submitted_at.elapsed();

        let wait_start = Instant::now();
        match self.config.barrier {
            RenderBarrier::Region => {
                let keys: Vec<ChunkKey> = task.region.keys(&task.world).collect();
                services.dispatcher.wait_for(keys.iter()).await;
            }
            RenderBarrier::Global => services.dispatcher.drain().await,
        }
        let wait_time = wait_start.elapsed();
        debug!(
            requester = %task.requester,
            queued_ms = queued_for.as_millis() as u64,
            wait_ms = wait_time.as_millis() as u64,
            "Downloads settled, rendering"
        );

        let render_start = Instant::now();
        let cache = Arc::clone(&services.cache);
        let palette = Arc::clone(&services.palette);
        let region = task.region;
        let world = task.world.clone();

        let (raster, heightmap_png, texture_png) = tokio::task::spawn_blocking(move || {
            let raster = rasterize(&region, &world, &cache, &palette);
            let heightmap = raster.heightmap();
            let (heightmap_png, texture_png) =
                rayon::join(|| encode_png(&heightmap), || encode_png(raster.texture()));
            Ok::<_, RenderError>((raster, heightmap_png?, texture_png?))
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

        services
            .images
            .put(&task.requester, ImageKind::Heightmap, heightmap_png);
        services
            .images
            .put(&task.requester, ImageKind::Texture, texture_png);

        let render_time = render_start.elapsed();
        services.metrics.render_completed(render_time);
        debug!(
            requester = %task.requester,
            block_counts = ?raster.block_counts,
            "Block counts"
        );

        let saved = self.auto_save().await;

        Ok(RenderReport {
            requester: task.requester.clone(),
            world: task.world.clone(),
            region: task.region,
            size: raster.size(),
            chunks_present: raster.chunks_present,
            chunks_missing: raster.chunks_missing,
            height_range: raster.height_range,
            unassigned: raster.unassigned,
            block_counts: raster.block_counts,
            wait_time,
            render_time,
            saved,
        })
    }

    /// Saves the cache if enabled. Failures are logged, not returned.
    async fn auto_save(&self) -> bool {
        if !self.config.auto_save {
            return false;
        }
        let Some(persistence) = &self.services.persistence else {
            return false;
        };
        match persistence.save(&self.services.cache).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Auto-save after render failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkRecord;
    use crate::coord::MAX_RADIUS;
    use crate::executor::{DownloadConfig, RetryPolicy};
    use crate::provider::{BoxFuture, ChunkFetcher, FetchError};
    use tempfile::TempDir;

    /// Serves every chunk after a per-key delay; chunks with `cx >= 100` are slow.
    struct SlowFarFetcher;

    impl ChunkFetcher for SlowFarFetcher {
        fn fetch<'a>(
            &'a self,
            key: &'a ChunkKey,
        ) -> BoxFuture<'a, Result<ChunkRecord, FetchError>> {
            Box::pin(async move {
                let delay = if key.cx >= 100 { 2_000 } else { 10 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(ChunkRecord::filled(key.cx + key.cz, "minecraft:stone"))
            })
        }
    }

    struct Harness {
        pipeline: RenderPipeline,
        dispatcher: Arc<DownloadDispatcher>,
        cache: Arc<ChunkCache>,
        images: Arc<ImageStore>,
        _temp: TempDir,
    }

    fn harness(config: RenderConfig) -> Harness {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(ChunkCache::new());
        let metrics = Arc::new(PipelineMetrics::new());
        let dispatcher = Arc::new(DownloadDispatcher::start(
            DownloadConfig {
                workers: 4,
                retry: RetryPolicy::None,
            },
            Arc::new(SlowFarFetcher),
            Arc::clone(&cache),
            Arc::clone(&metrics),
        ));
        let images = Arc::new(ImageStore::new());
        let pipeline = RenderPipeline::start(
            config,
            RenderServices {
                cache: Arc::clone(&cache),
                dispatcher: Arc::clone(&dispatcher),
                images: Arc::clone(&images),
                palette: Arc::new(BlockPalette::new().with("minecraft:stone", [1, 2, 3])),
                persistence: Some(Arc::new(PersistenceManager::new(
                    temp.path().join("cache.bin"),
                ))),
                metrics,
            },
        );
        Harness {
            pipeline,
            dispatcher,
            cache,
            images,
            _temp: temp,
        }
    }

    #[test]
    fn test_barrier_parsing() {
        assert_eq!("region".parse::<RenderBarrier>(), Ok(RenderBarrier::Region));
        assert_eq!("GLOBAL".parse::<RenderBarrier>(), Ok(RenderBarrier::Global));
        assert!("sometimes".parse::<RenderBarrier>().is_err());
    }

    #[tokio::test]
    async fn test_render_waits_for_region_downloads() {
        let h = harness(RenderConfig::default());
        for key in Region::new(ChunkCoord::new(0, 0), 1).keys("world") {
            h.dispatcher.enqueue(key).unwrap();
        }

        let report = h
            .pipeline
            .submit_and_wait(RenderTask::new(ChunkCoord::new(0, 0), 1, "world", "alice"))
            .await
            .unwrap();

        assert_eq!(report.size, 32);
        assert_eq!(report.chunks_present, 4);
        assert_eq!(report.chunks_missing, 0);
        assert_eq!(report.height_range, Some((-2, 0)));
        assert!(!report.saved);
        assert!(h.images.get("alice", ImageKind::Heightmap).is_ok());
        assert!(h.images.get("alice", ImageKind::Texture).is_ok());
        assert_eq!(h.pipeline.state(), RenderState::Idle);
    }

    #[tokio::test]
    async fn test_region_barrier_ignores_slow_download_elsewhere() {
        let h = harness(RenderConfig::default());
        h.dispatcher.enqueue(ChunkKey::new("world", 100, 100)).unwrap();
        h.dispatcher.enqueue(ChunkKey::new("world", 0, 0)).unwrap();

        let report = tokio::time::timeout(
            Duration::from_millis(1_000),
            h.pipeline
                .submit_and_wait(RenderTask::new(ChunkCoord::new(0, 0), 1, "world", "bob")),
        )
        .await
        .expect("render should not wait for the far chunk")
        .unwrap();

        assert_eq!(report.chunks_present, 1);
        assert!(h.dispatcher.is_in_flight(&ChunkKey::new("world", 100, 100)));
    }

    #[tokio::test]
    async fn test_global_barrier_waits_for_everything() {
        let h = harness(RenderConfig {
            barrier: RenderBarrier::Global,
            auto_save: false,
        });
        h.dispatcher.enqueue(ChunkKey::new("world", 100, 100)).unwrap();

        let report = h
            .pipeline
            .submit_and_wait(RenderTask::new(ChunkCoord::new(0, 0), 1, "world", "carol"))
            .await
            .unwrap();

        assert!(report.wait_time >= Duration::from_millis(1_500));
        assert!(h.cache.contains(&ChunkKey::new("world", 100, 100)));
    }

    #[tokio::test]
    async fn test_radius_zero_is_rejected() {
        let h = harness(RenderConfig::default());
        let result = h
            .pipeline
            .submit(RenderTask::new(ChunkCoord::new(0, 0), 0, "world", "dave"));
        assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_oversized_region_is_rejected() {
        let h = harness(RenderConfig::default());
        let result = h.pipeline.submit(RenderTask::new(
            ChunkCoord::new(0, 0),
            MAX_RADIUS + 1,
            "world",
            "dave",
        ));
        match result {
            Err(RenderError::InvalidArgument(msg)) => assert!(msg.contains("exceeds")),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }

        let result = h.pipeline.submit(RenderTask::new(
            ChunkCoord::new(i32::MAX, 0),
            2,
            "world",
            "dave",
        ));
        assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_auto_save_after_render() {
        let h = harness(RenderConfig {
            barrier: RenderBarrier::Region,
            auto_save: true,
        });
        h.cache
            .set(ChunkKey::new("world", 0, 0), ChunkRecord::filled(1, "x"));

        let report = h
            .pipeline
            .submit_and_wait(RenderTask::new(ChunkCoord::new(0, 0), 1, "world", "erin"))
            .await
            .unwrap();

        assert!(report.saved);
        assert!(h._temp.path().join("cache.bin").exists());
        assert_eq!(report.unassigned, BTreeSet::from(["x".to_string()]));
    }

    #[tokio::test]
    async fn test_renders_run_in_submission_order() {
        let h = harness(RenderConfig::default());
        h.cache
            .set(ChunkKey::new("world", 0, 0), ChunkRecord::filled(1, "minecraft:stone"));

        h.pipeline
            .submit(RenderTask::new(ChunkCoord::new(0, 0), 1, "world", "first"))
            .unwrap();
        let last = h
            .pipeline
            .submit_and_wait(RenderTask::new(ChunkCoord::new(0, 0), 2, "world", "second"))
            .await
            .unwrap();

        assert_eq!(last.size, 64);
        assert!(h.images.get("first", ImageKind::Texture).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_requests() {
        let h = harness(RenderConfig::default());
        h.pipeline.shutdown().await;

        let result = h
            .pipeline
            .submit(RenderTask::new(ChunkCoord::new(0, 0), 1, "world", "late"));
        assert!(matches!(result, Err(RenderError::ShutDown)));
    }
}
