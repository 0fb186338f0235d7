use std::fmt;
use std::time::Duration;

/// Point-in-time copy of [`super::PipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub downloads_queued: u64,
    pub downloads_coalesced: u64,
    pub downloads_completed: u64,
    pub downloads_failed: u64,
    pub downloads_retried: u64,
    pub renders_completed: u64,
    pub renders_failed: u64,
    pub avg_render_time_ms: f64,
}

impl TelemetrySnapshot {
    /// Downloads accepted but not yet finished.
    pub fn downloads_pending(&self) -> u64 {
        self.downloads_queued
            .saturating_sub(self.downloads_completed + self.downloads_failed)
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "downloads: {} queued, {} joined, {} ok, {} failed, {} retries; renders: {} ok, {} failed ({:.1} ms avg)",
            self.downloads_queued,
            self.downloads_coalesced,
            self.downloads_completed,
            self.downloads_failed,
            self.downloads_retried,
            self.renders_completed,
            self.renders_failed,
            self.avg_render_time_ms
        )
    }
}
