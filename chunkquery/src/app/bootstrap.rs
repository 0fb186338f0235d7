//! Application bootstrap implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::config::AppConfig;
use super::error::{AppError, RegionError};
use crate::cache::{ChunkCache, PersistenceError, PersistenceManager, SaveStats};
use crate::coord::{ChunkCoord, Region};
use crate::executor::{DownloadDispatcher, EnqueueOutcome};
use crate::images::{ImageKind, ImageQueryError, ImageStore};
use crate::provider::{
    AsyncReqwestClient, ChunkFetcher, FetchError, HttpChunkFetcher, PlayerLocation, PlayerLocator,
};
use crate::render::{
    BlockPalette, RenderPipeline, RenderReport, RenderServices, RenderState, RenderTask,
};
use crate::telemetry::{PipelineMetrics, TelemetrySnapshot};

/// ChunkQuery application with service lifecycle management.
///
/// Services are started in order:
/// 1. Persistence, and the cache pre-populated from the snapshot
/// 2. The download worker pool
/// 3. The render worker
///
/// and stopped in reverse by [`shutdown`](Self::shutdown).
pub struct ChunkQueryApp {
    config: AppConfig,
    cache: Arc<ChunkCache>,
    dispatcher: Arc<DownloadDispatcher>,
    renderer: RenderPipeline,
    images: Arc<ImageStore>,
    persistence: Option<Arc<PersistenceManager>>,
    metrics: Arc<PipelineMetrics>,
    locator: PlayerLocator<AsyncReqwestClient>,
}

/// Result of [`ChunkQueryApp::load_region`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// New downloads queued.
    pub queued: usize,
    /// Chunks already queued or downloading.
    pub joined: usize,
    /// Chunks already cached and not forced.
    pub skipped: usize,
}

/// Point-in-time application status.
#[derive(Debug, Clone)]
pub struct AppStatus {
    pub chunk_count: usize,
    pub world_counts: BTreeMap<String, usize>,
    pub outstanding_downloads: usize,
    pub render_state: RenderState,
    pub images: usize,
    pub telemetry: TelemetrySnapshot,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunks cached, {} downloads outstanding, renderer {}, {} images",
            self.chunk_count, self.outstanding_downloads, self.render_state, self.images
        )
    }
}

impl ChunkQueryApp {
    /// Start the application with the given fetcher and palette.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for player lookups cannot be built
    /// or the snapshot load task fails to run. An unreadable snapshot is not
    /// an error; the cache starts empty.
    pub async fn start(
        config: AppConfig,
        fetcher: Arc<dyn ChunkFetcher>,
        palette: BlockPalette,
    ) -> Result<Self, AppError> {
        let client =
            AsyncReqwestClient::with_timeout(config.timeout_secs).map_err(AppError::HttpClient)?;
        Self::start_with_client(config, fetcher, palette, client).await
    }

    /// Start the application against the game server over HTTP.
    ///
    /// Chunk downloads and player lookups share one connection pool.
    pub async fn start_http(config: AppConfig, palette: BlockPalette) -> Result<Self, AppError> {
        let client =
            AsyncReqwestClient::with_timeout(config.timeout_secs).map_err(AppError::HttpClient)?;
        let fetcher = Arc::new(HttpChunkFetcher::new(client.clone(), &config.api_server));
        Self::start_with_client(config, fetcher, palette, client).await
    }

    async fn start_with_client(
        config: AppConfig,
        fetcher: Arc<dyn ChunkFetcher>,
        palette: BlockPalette,
        client: AsyncReqwestClient,
    ) -> Result<Self, AppError> {
        info!(
            api_server = %config.api_server,
            workers = config.download.workers,
            barrier = %config.render_barrier,
            "Starting ChunkQueryApp"
        );

        // 1. Persistence and cache
        let persistence = config
            .cache_file
            .as_ref()
            .map(|path| Arc::new(PersistenceManager::new(path)));

        let cache = match &persistence {
            Some(persistence) => {
                let loader = Arc::clone(persistence);
                let snapshot = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| AppError::Startup(e.to_string()))?;
                match snapshot {
                    Some(snapshot) => ChunkCache::from_snapshot(snapshot),
                    None => ChunkCache::new(),
                }
            }
            None => ChunkCache::new(),
        };
        let cache = Arc::new(cache);
        info!(chunks = cache.len(), "Chunk cache ready");

        // 2. Download workers
        let metrics = Arc::new(PipelineMetrics::new());
        let dispatcher = Arc::new(DownloadDispatcher::start(
            config.download.clone(),
            fetcher,
            Arc::clone(&cache),
            Arc::clone(&metrics),
        ));

        // 3. Render worker
        let images = Arc::new(ImageStore::new());
        let renderer = RenderPipeline::start(
            config.render_config(),
            RenderServices {
                cache: Arc::clone(&cache),
                dispatcher: Arc::clone(&dispatcher),
                images: Arc::clone(&images),
                palette: Arc::new(palette),
                persistence: persistence.clone(),
                metrics: Arc::clone(&metrics),
            },
        );

        let locator = PlayerLocator::new(client, &config.api_server);

        Ok(Self {
            config,
            cache,
            dispatcher,
            renderer,
            images,
            persistence,
            metrics,
            locator,
        })
    }

    // =========================================================================
    // Region surface
    // =========================================================================

    /// Queues downloads for the chunks of a region.
    ///
    /// Without `force`, chunks already cached are skipped. Chunks already
    /// queued or downloading are joined rather than queued again.
    pub fn load_region(
        &self,
        center: ChunkCoord,
        radius: u32,
        world: &str,
        force: bool,
    ) -> Result<LoadSummary, RegionError> {
        let region = check_region(center, radius)?;
        let mut summary = LoadSummary::default();

        for key in region.keys(world) {
            if !force && self.cache.contains(&key) {
                summary.skipped += 1;
                continue;
            }
            match self.dispatcher.enqueue(key)? {
                EnqueueOutcome::Queued => summary.queued += 1,
                EnqueueOutcome::Joined => summary.joined += 1,
            }
        }

        info!(
            center = %center,
            radius,
            world,
            force,
            queued = summary.queued,
            joined = summary.joined,
            skipped = summary.skipped,
            "Region load requested"
        );
        Ok(summary)
    }

    /// Queues a render of a region for `requester`.
    pub fn render_region(
        &self,
        center: ChunkCoord,
        radius: u32,
        world: &str,
        requester: &str,
    ) -> Result<(), RegionError> {
        check_render_args(center, radius, requester)?;
        self.renderer
            .submit(RenderTask::new(center, radius, world, requester))?;
        Ok(())
    }

    /// Queues a render and waits for it to finish.
    pub async fn render_region_and_wait(
        &self,
        center: ChunkCoord,
        radius: u32,
        world: &str,
        requester: &str,
    ) -> Result<RenderReport, RegionError> {
        check_render_args(center, radius, requester)?;
        let report = self
            .renderer
            .submit_and_wait(RenderTask::new(center, radius, world, requester))
            .await?;
        Ok(report)
    }

    /// Asks the game server where a player is.
    pub async fn locate_player(&self, name: &str) -> Result<PlayerLocation, FetchError> {
        self.locator.locate(name).await
    }

    // =========================================================================
    // Image surface
    // =========================================================================

    /// Most recent image of `kind` rendered for `requester`.
    pub fn get_image(
        &self,
        requester: &str,
        kind: ImageKind,
    ) -> Result<Arc<Vec<u8>>, ImageQueryError> {
        self.images.get(requester, kind)
    }

    /// Like [`get_image`](Self::get_image) with the kind given by name.
    pub fn get_image_by_name(
        &self,
        requester: &str,
        kind: &str,
    ) -> Result<Arc<Vec<u8>>, ImageQueryError> {
        self.images.query(requester, kind)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Writes the cache to disk. `None` when persistence is disabled.
    pub async fn save(&self) -> Result<Option<SaveStats>, PersistenceError> {
        match &self.persistence {
            Some(persistence) => persistence.save(&self.cache).await.map(Some),
            None => Ok(None),
        }
    }

    /// Waits until every queued download has finished.
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }

    pub fn status(&self) -> AppStatus {
        AppStatus {
            chunk_count: self.cache.len(),
            world_counts: self.cache.world_counts(),
            outstanding_downloads: self.dispatcher.outstanding(),
            render_state: self.renderer.state(),
            images: self.images.len(),
            telemetry: self.metrics.snapshot(),
        }
    }

    pub fn cache(&self) -> &Arc<ChunkCache> {
        &self.cache
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Drains downloads, finishes queued renders, stops all workers and
    /// flushes the cache to disk.
    pub async fn shutdown(self) -> Result<Option<SaveStats>, PersistenceError> {
        info!("Shutting down ChunkQueryApp");

        self.dispatcher.drain().await;
        self.renderer.shutdown().await;
        self.dispatcher.shutdown().await;

        let result = self.save().await;
        if let Err(e) = &result {
            warn!(error = %e, "Final cache save failed");
        }
        info!(snapshot = %self.metrics.snapshot(), "ChunkQueryApp stopped");
        result
    }
}

fn check_region(center: ChunkCoord, radius: u32) -> Result<Region, RegionError> {
    Region::try_new(center, radius).map_err(|e| RegionError::InvalidArgument(e.to_string()))
}

fn check_render_args(center: ChunkCoord, radius: u32, requester: &str) -> Result<(), RegionError> {
    check_region(center, radius)?;
    if requester.trim().is_empty() {
        return Err(RegionError::InvalidArgument(
            "no requester given".to_string(),
        ));
    }
    Ok(())
}
