use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::snapshot::TelemetrySnapshot;

/// Counters shared by the dispatcher and the renderer.
#[derive(Debug)]
pub struct PipelineMetrics {
    started: Instant,

    downloads_queued: AtomicU64,
    downloads_coalesced: AtomicU64,
    downloads_completed: AtomicU64,
    downloads_failed: AtomicU64,
    downloads_retried: AtomicU64,

    renders_completed: AtomicU64,
    renders_failed: AtomicU64,
    render_time_us: AtomicU64,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            downloads_queued: AtomicU64::new(0),
            downloads_coalesced: AtomicU64::new(0),
            downloads_completed: AtomicU64::new(0),
            downloads_failed: AtomicU64::new(0),
            downloads_retried: AtomicU64::new(0),
            renders_completed: AtomicU64::new(0),
            renders_failed: AtomicU64::new(0),
            render_time_us: AtomicU64::new(0),
        }
    }

    pub fn download_queued(&self) {
        self.downloads_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// A duplicate request joined a download already in flight.
    pub fn download_coalesced(&self) {
        self.downloads_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn download_completed(&self) {
        self.downloads_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn download_failed(&self) {
        self.downloads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn download_retried(&self) {
        self.downloads_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_completed(&self, duration: Duration) {
        self.renders_completed.fetch_add(1, Ordering::Relaxed);
        self.render_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn render_failed(&self) {
        self.renders_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let renders_completed = self.renders_completed.load(Ordering::Relaxed);
        let render_time_us = self.render_time_us.load(Ordering::Relaxed);

        TelemetrySnapshot {
            uptime: self.started.elapsed(),
            downloads_queued: self.downloads_queued.load(Ordering::Relaxed),
            downloads_coalesced: self.downloads_coalesced.load(Ordering::Relaxed),
            downloads_completed: self.downloads_completed.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
            downloads_retried: self.downloads_retried.load(Ordering::Relaxed),
            renders_completed,
            renders_failed: self.renders_failed.load(Ordering::Relaxed),
            avg_render_time_ms: if renders_completed > 0 {
                render_time_us as f64 / renders_completed as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}
