//! Chunk download execution.
//!
//! - [`DownloadDispatcher`]: worker pool draining the download queue
//! - [`InFlightTracker`]: coalesces duplicate requests, backs `wait_for`
//! - [`RetryPolicy`]: what to do about transient fetch failures

mod dispatcher;
mod inflight;
mod policy;

pub use dispatcher::{
    DispatchError, DownloadConfig, DownloadDispatcher, DownloadTask, EnqueueOutcome,
    DEFAULT_DOWNLOAD_WORKERS,
};
pub use inflight::{InFlightTracker, Registration};
pub use policy::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};
