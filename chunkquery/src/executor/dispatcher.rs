//! Download worker pool.
//!
//! The [`DownloadDispatcher`] owns a fixed number of worker tasks that pull
//! chunk keys from one unbounded FIFO queue, fetch them, and store the
//! results in the shared [`ChunkCache`].
//!
//! # Architecture
//!
//! ```text
//!  enqueue(key) ──► InFlightTracker ──► Joined ──► (nothing to do)
//!                        │ New
//!                        ▼
//!                 ┌─────────────┐     ┌──────────┐
//!                 │ FIFO queue  │ ──► │ worker 1 │ ──┐
//!                 │ (unbounded) │ ──► │   ...    │ ──┼──► ChunkCache::set
//!                 └─────────────┘ ──► │ worker N │ ──┘
//!                                     └──────────┘
//!                                          │
//!                                          ▼
//!                         complete(key) + outstanding - 1
//! ```
//!
//! A key stays registered in the [`InFlightTracker`] from acceptance until
//! its worker has written the cache (or given up), so waiting on the tracker
//! is enough to observe the result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::inflight::{InFlightTracker, Registration};
use super::policy::RetryPolicy;
use crate::cache::ChunkCache;
use crate::coord::ChunkKey;
use crate::provider::ChunkFetcher;
use crate::telemetry::PipelineMetrics;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of download workers.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 6;

/// Configuration for the download worker pool.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadConfig {
    /// Number of concurrent download workers.
    pub workers: usize,

    /// Retry policy for transient fetch failures.
    pub retry: RetryPolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_DOWNLOAD_WORKERS,
            retry: RetryPolicy::default(),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// A chunk waiting in the download queue.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub key: ChunkKey,
    pub enqueued_at: Instant,
}

/// What happened to an enqueue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new download was queued.
    Queued,
    /// The key was already queued or downloading.
    Joined,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("download dispatcher is shut down")]
    ShutDown,
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Fixed-size pool of download workers fed by a FIFO queue.
pub struct DownloadDispatcher {
    sender: Mutex<Option<mpsc::UnboundedSender<DownloadTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    inflight: Arc<InFlightTracker>,
    outstanding: Arc<watch::Sender<usize>>,
    metrics: Arc<PipelineMetrics>,
}

/// State shared by all workers.
struct WorkerContext {
    fetcher: Arc<dyn ChunkFetcher>,
    cache: Arc<ChunkCache>,
    retry: RetryPolicy,
    inflight: Arc<InFlightTracker>,
    outstanding: Arc<watch::Sender<usize>>,
    metrics: Arc<PipelineMetrics>,
}

impl DownloadDispatcher {
    /// Spawns the worker pool. Must be called from within a Tokio runtime.
    pub fn start(
        config: DownloadConfig,
        fetcher: Arc<dyn ChunkFetcher>,
        cache: Arc<ChunkCache>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let worker_count = config.workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(AsyncMutex::new(rx));
        let inflight = Arc::new(InFlightTracker::new());
        let (outstanding, _) = watch::channel(0usize);
        let outstanding = Arc::new(outstanding);

        let ctx = Arc::new(WorkerContext {
            fetcher,
            cache,
            retry: config.retry.clone(),
            inflight: Arc::clone(&inflight),
            outstanding: Arc::clone(&outstanding),
            metrics: Arc::clone(&metrics),
        });

        let workers = (0..worker_count)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&rx), Arc::clone(&ctx))))
            .collect();

        info!(
            workers = worker_count,
            max_attempts = config.retry.max_attempts(),
            "Download dispatcher started"
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            worker_count,
            inflight,
            outstanding,
            metrics,
        }
    }

    /// Queues a download for `key` unless one is already in flight.
    pub fn enqueue(&self, key: ChunkKey) -> Result<EnqueueOutcome, DispatchError> {
        let sender = self.sender.lock();
        let tx = sender.as_ref().ok_or(DispatchError::ShutDown)?;

        if self.inflight.register(&key) == Registration::Joined {
            self.metrics.download_coalesced();
            return Ok(EnqueueOutcome::Joined);
        }

        self.outstanding.send_modify(|n| *n += 1);
        let task = DownloadTask {
            key,
            enqueued_at: Instant::now(),
        };

        if let Err(mpsc::error::SendError(task)) = tx.send(task) {
            // Receiver gone: every worker has exited.
            self.inflight.complete(&task.key);
            self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
            return Err(DispatchError::ShutDown);
        }

        self.metrics.download_queued();
        Ok(EnqueueOutcome::Queued)
    }

    /// Accepted downloads that have not finished yet.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    pub fn is_in_flight(&self, key: &ChunkKey) -> bool {
        self.inflight.is_in_flight(key)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Waits until every accepted download has finished.
    pub async fn drain(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Waits until none of `keys` is queued or downloading.
    pub async fn wait_for<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a ChunkKey>,
    {
        self.inflight.wait_all(keys).await;
    }

    /// Closes the queue, lets the workers finish what was accepted, and
    /// joins them. Later enqueues fail with [`DispatchError::ShutDown`].
    pub async fn shutdown(&self) {
        let tx = self.sender.lock().take();
        if tx.is_none() {
            return;
        }
        drop(tx);

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Download worker ended abnormally");
            }
        }
        info!("Download dispatcher stopped");
    }
}

// =============================================================================
// Workers
// =============================================================================

async fn worker_loop(
    id: usize,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<DownloadTask>>>,
    ctx: Arc<WorkerContext>,
) {
    debug!(worker = id, "Download worker started");
    loop {
        let task = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(task) = task else {
            break;
        };
        ctx.process(id, task).await;
    }
    debug!(worker = id, "Download worker exiting");
}

/// Releases a key when the worker is done with it, even if the fetch panicked.
struct Completion<'a> {
    ctx: &'a WorkerContext,
    key: &'a ChunkKey,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.ctx.inflight.complete(self.key);
        self.ctx
            .outstanding
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl WorkerContext {
    async fn process(&self, worker: usize, task: DownloadTask) {
        let key = &task.key;
        let _completion = Completion { ctx: self, key };
        let queued_for = task.enqueued_at.elapsed();
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            match self.fetcher.fetch(key).await {
                Ok(record) => {
                    self.cache.set(key.clone(), record);
                    self.metrics.download_completed();
                    debug!(
                        worker,
                        chunk = %key,
                        attempt,
                        queued_ms = queued_for.as_millis() as u64,
                        fetch_ms = started.elapsed().as_millis() as u64,
                        "Chunk downloaded"
                    );
                    return;
                }
                Err(e) if e.is_transient() => match self.retry.delay_for_attempt(attempt) {
                    Some(delay) => {
                        debug!(
                            worker,
                            chunk = %key,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Retrying chunk download"
                        );
                        self.metrics.download_retried();
                        sleep_nonzero(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(chunk = %key, attempts = attempt, error = %e, "Giving up on chunk");
                        self.metrics.download_failed();
                        return;
                    }
                },
                Err(e) => {
                    warn!(chunk = %key, error = %e, "Error loading chunk");
                    self.metrics.download_failed();
                    return;
                }
            }
        }
    }
}

async fn sleep_nonzero(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkRecord;
    use crate::provider::{BoxFuture, FetchError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher with scripted per-key failures and a fixed delay.
    struct ScriptedFetcher {
        delay: Duration,
        failures: Mutex<HashMap<ChunkKey, Vec<FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                failures: Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn fail(self, key: ChunkKey, errors: Vec<FetchError>) -> Self {
            self.failures.lock().insert(key, errors);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ChunkFetcher for ScriptedFetcher {
        fn fetch<'a>(
            &'a self,
            key: &'a ChunkKey,
        ) -> BoxFuture<'a, Result<ChunkRecord, FetchError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                let scripted = {
                    let mut failures = self.failures.lock();
                    failures.get_mut(key).and_then(|errs| {
                        if errs.is_empty() {
                            None
                        } else {
                            Some(errs.remove(0))
                        }
                    })
                };
                match scripted {
                    Some(err) => Err(err),
                    None => Ok(ChunkRecord::filled(key.cx, "minecraft:stone")),
                }
            })
        }
    }

    fn key(cx: i32) -> ChunkKey {
        ChunkKey::new("world", cx, 0)
    }

    fn start(
        fetcher: Arc<ScriptedFetcher>,
        retry: RetryPolicy,
    ) -> (DownloadDispatcher, Arc<ChunkCache>, Arc<PipelineMetrics>) {
        let cache = Arc::new(ChunkCache::new());
        let metrics = Arc::new(PipelineMetrics::new());
        let dispatcher = DownloadDispatcher::start(
            DownloadConfig { workers: 4, retry },
            fetcher,
            Arc::clone(&cache),
            Arc::clone(&metrics),
        );
        (dispatcher, cache, metrics)
    }

    #[tokio::test]
    async fn test_enqueue_and_drain_fills_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new(Duration::from_millis(5)));
        let (dispatcher, cache, _) = start(Arc::clone(&fetcher), RetryPolicy::None);

        for cx in 0..10 {
            assert_eq!(dispatcher.enqueue(key(cx)), Ok(EnqueueOutcome::Queued));
        }
        dispatcher.drain().await;

        assert_eq!(cache.len(), 10);
        assert_eq!(dispatcher.outstanding(), 0);
        assert_eq!(fetcher.calls(), 10);
        assert_eq!(cache.get(&key(7)).unwrap().height_at(3, 3), Some(7));
    }

    #[tokio::test]
    async fn test_drain_on_idle_dispatcher_returns() {
        let fetcher = Arc::new(ScriptedFetcher::new(Duration::ZERO));
        let (dispatcher, _, _) = start(fetcher, RetryPolicy::None);

        tokio::time::timeout(Duration::from_millis(200), dispatcher.drain())
            .await
            .expect("idle drain should return");
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_fetches_once() {
        let fetcher = Arc::new(ScriptedFetcher::new(Duration::from_millis(50)));
        let (dispatcher, cache, metrics) = start(Arc::clone(&fetcher), RetryPolicy::None);

        assert_eq!(dispatcher.enqueue(key(1)), Ok(EnqueueOutcome::Queued));
        assert_eq!(dispatcher.enqueue(key(1)), Ok(EnqueueOutcome::Joined));
        assert_eq!(dispatcher.enqueue(key(1)), Ok(EnqueueOutcome::Joined));
        assert_eq!(dispatcher.outstanding(), 1);

        dispatcher.drain().await;

        assert_eq!(fetcher.calls(), 1);
        assert!(cache.contains(&key(1)));
        assert_eq!(metrics.snapshot().downloads_coalesced, 2);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let fetcher = Arc::new(
            ScriptedFetcher::new(Duration::ZERO).fail(
                key(1),
                vec![
                    FetchError::Connection("reset".into()),
                    FetchError::Connection("reset".into()),
                ],
            ),
        );
        let (dispatcher, cache, metrics) = start(
            Arc::clone(&fetcher),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
        );

        dispatcher.enqueue(key(1)).unwrap();
        dispatcher.drain().await;

        assert_eq!(fetcher.calls(), 3);
        assert!(cache.contains(&key(1)));
        let snap = metrics.snapshot();
        assert_eq!(snap.downloads_retried, 2);
        assert_eq!(snap.downloads_completed, 1);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted_drops_task() {
        let fetcher = Arc::new(ScriptedFetcher::new(Duration::ZERO).fail(
            key(1),
            vec![FetchError::Connection("down".into()); 5],
        ));
        let (dispatcher, cache, metrics) = start(
            Arc::clone(&fetcher),
            RetryPolicy::fixed(2, Duration::from_millis(1)),
        );

        dispatcher.enqueue(key(1)).unwrap();
        dispatcher.drain().await;

        assert_eq!(fetcher.calls(), 2);
        assert!(!cache.contains(&key(1)));
        assert_eq!(metrics.snapshot().downloads_failed, 1);
        assert!(!dispatcher.is_in_flight(&key(1)));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let fetcher = Arc::new(
            ScriptedFetcher::new(Duration::ZERO)
                .fail(key(1), vec![FetchError::Server("no such world".into())]),
        );
        let (dispatcher, cache, _) = start(Arc::clone(&fetcher), RetryPolicy::exponential(5));

        dispatcher.enqueue(key(1)).unwrap();
        dispatcher.enqueue(key(2)).unwrap();
        dispatcher.drain().await;

        assert_eq!(fetcher.calls(), 2);
        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
    }

    #[tokio::test]
    async fn test_wait_for_returns_after_cache_write() {
        let fetcher = Arc::new(ScriptedFetcher::new(Duration::from_millis(20)));
        let cache = Arc::new(ChunkCache::new());
        let dispatcher = DownloadDispatcher::start(
            DownloadConfig {
                workers: 2,
                retry: RetryPolicy::None,
            },
            fetcher,
            Arc::clone(&cache),
            Arc::new(PipelineMetrics::new()),
        );

        dispatcher.enqueue(key(1)).unwrap();
        dispatcher.wait_for([key(1)].iter()).await;

        assert!(cache.contains(&key(1)));
    }

    #[tokio::test]
    async fn test_shutdown_finishes_accepted_work_then_rejects() {
        let fetcher = Arc::new(ScriptedFetcher::new(Duration::from_millis(5)));
        let (dispatcher, cache, _) = start(fetcher, RetryPolicy::None);

        for cx in 0..8 {
            dispatcher.enqueue(key(cx)).unwrap();
        }
        dispatcher.shutdown().await;

        assert_eq!(cache.len(), 8);
        assert_eq!(dispatcher.enqueue(key(100)), Err(DispatchError::ShutDown));

        // Second shutdown is a no-op.
        dispatcher.shutdown().await;
    }
}
