//! In-flight download tracking.
//!
//! Every accepted download registers its key here until a worker finishes
//! with it. A second request for a key that is already registered joins the
//! existing download instead of queueing another fetch, and anyone can wait
//! for a set of keys to leave the table.
//!
//! # Implementation
//!
//! `DashMap` entry API for atomic check-and-insert; each entry holds a
//! `watch` sender that flips to `true` when the download finishes.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::watch;
use tracing::trace;

use crate::coord::ChunkKey;

/// Result of registering a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First registration, the caller must schedule the download.
    New,
    /// Already in flight, nothing to schedule.
    Joined,
}

/// Set of chunk keys queued or downloading.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    in_flight: DashMap<ChunkKey, watch::Sender<bool>>,
    joined: AtomicU64,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key`, or joins the download already registered for it.
    pub fn register(&self, key: &ChunkKey) -> Registration {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                self.joined.fetch_add(1, Ordering::Relaxed);
                trace!(chunk = %key, "Joined in-flight download");
                Registration::Joined
            }
            Entry::Vacant(entry) => {
                let (tx, _rx) = watch::channel(false);
                entry.insert(tx);
                Registration::New
            }
        }
    }

    /// Marks `key` finished and wakes everyone waiting on it.
    pub fn complete(&self, key: &ChunkKey) {
        if let Some((_, tx)) = self.in_flight.remove(key) {
            tx.send_replace(true);
        }
    }

    pub fn is_in_flight(&self, key: &ChunkKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Number of registrations that joined an existing download.
    pub fn joined_count(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }

    /// Resolves once `key` is not in flight. Immediate if it never was.
    pub async fn wait(&self, key: &ChunkKey) {
        // Subscribe while holding the shard read lock, then release it
        // before awaiting.
        let rx = self.in_flight.get(key).map(|tx| tx.subscribe());
        if let Some(mut rx) = rx {
            // A closed channel means the entry was dropped, which only
            // happens on completion.
            let _ = rx.wait_for(|done| *done).await;
        }
    }

    /// Resolves once none of `keys` is in flight.
    pub async fn wait_all<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a ChunkKey>,
    {
        let receivers: Vec<_> = keys
            .into_iter()
            .filter_map(|key| self.in_flight.get(key).map(|tx| tx.subscribe()))
            .collect();

        join_all(receivers.into_iter().map(|mut rx| async move {
            let _ = rx.wait_for(|done| *done).await;
        }))
        .await;
    }
}
