//! Download and render telemetry.
//!
//! Lock-free atomic counters updated by the download workers and the render
//! worker, read out as a point-in-time [`TelemetrySnapshot`].
//!
//! ```text
//! Workers ─────► PipelineMetrics ─────► TelemetrySnapshot ─────► Views
//!                (atomic counters)      (point-in-time copy)     (status, CLI)
//! ```

mod metrics;
mod snapshot;

pub use metrics::PipelineMetrics;
pub use snapshot::TelemetrySnapshot;
