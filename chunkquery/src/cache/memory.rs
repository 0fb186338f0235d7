//! In-memory chunk cache backed by `DashMap`.
//!
//! Values are stored as `Arc<ChunkRecord>` and replaced wholesale on write,
//! so a reader holding a record never sees it change underneath it. DashMap
//! shards its locks, which keeps the download workers from contending with
//! each other or with the render worker's sweep over a region.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::snapshot::CacheSnapshot;
use crate::chunk::ChunkRecord;
use crate::coord::{ChunkCoord, ChunkKey};

/// Concurrent map from [`ChunkKey`] to the latest downloaded [`ChunkRecord`].
#[derive(Debug, Default)]
pub struct ChunkCache {
    entries: DashMap<ChunkKey, Arc<ChunkRecord>>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

/// Bounding box of the chunks cached for one world (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkExtent {
    pub min: ChunkCoord,
    pub max: ChunkCoord,
}

impl ChunkExtent {
    /// Smallest extent containing every coordinate, `None` for no coordinates.
    pub fn enclosing(coords: impl IntoIterator<Item = ChunkCoord>) -> Option<Self> {
        coords.into_iter().fold(None, |extent, coord| {
            Some(match extent {
                None => ChunkExtent {
                    min: coord,
                    max: coord,
                },
                Some(e) => ChunkExtent {
                    min: ChunkCoord::new(e.min.cx.min(coord.cx), e.min.cz.min(coord.cz)),
                    max: ChunkCoord::new(e.max.cx.max(coord.cx), e.max.cz.max(coord.cz)),
                },
            })
        })
    }

    /// Number of chunk columns along X.
    pub fn width(&self) -> usize {
        (self.max.cx as i64 - self.min.cx as i64 + 1) as usize
    }

    /// Number of chunk rows along Z.
    pub fn depth(&self) -> usize {
        (self.max.cz as i64 - self.min.cz as i64 + 1) as usize
    }
}

/// A world's cached chunks laid out on a dense rectangular grid.
///
/// Cells are indexed `[x][z]` relative to `extent.min`; positions inside the
/// bounding box that were never downloaded are `None`.
#[derive(Debug, Clone)]
pub struct ChunkGrid {
    pub extent: ChunkExtent,
    cells: Vec<Option<Arc<ChunkRecord>>>,
}

impl ChunkGrid {
    /// Record at absolute chunk coordinate, if cached.
    pub fn get(&self, coord: ChunkCoord) -> Option<&Arc<ChunkRecord>> {
        let x = coord.cx as i64 - self.extent.min.cx as i64;
        let z = coord.cz as i64 - self.extent.min.cz as i64;
        if x < 0 || z < 0 || x as usize >= self.extent.width() || z as usize >= self.extent.depth()
        {
            return None;
        }
        self.cells[x as usize * self.extent.depth() + z as usize].as_ref()
    }

    /// Number of grid positions holding a record.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Total number of grid positions.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated from a loaded snapshot.
    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let cache = Self::new();
        cache.replace_all(snapshot);
        cache
    }

    /// Get a cached chunk.
    pub fn get(&self, key: &ChunkKey) -> Option<Arc<ChunkRecord>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a chunk, replacing any previous record for the key.
    pub fn set(&self, key: ChunkKey, record: ChunkRecord) {
        self.set_shared(key, Arc::new(record));
    }

    /// Store an already shared record.
    pub fn set_shared(&self, key: ChunkKey, record: Arc<ChunkRecord>) {
        self.entries.insert(key, record);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Check if a chunk is cached. Does not count as a hit or miss.
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    /// Number of cached chunks per world.
    pub fn world_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.iter() {
            *counts.entry(entry.key().world.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Bounding box of the chunks cached for `world`.
    pub fn extent(&self, world: &str) -> Option<ChunkExtent> {
        ChunkExtent::enclosing(
            self.entries
                .iter()
                .filter(|e| e.key().world == world)
                .map(|e| e.key().coord()),
        )
    }

    /// Lays out every chunk cached for `world` on a dense grid.
    ///
    /// The world's entries are copied out in one pass and the extent is taken
    /// from that copy, so chunks written concurrently cannot fall outside it.
    /// Returns `None` when the world has no cached chunks.
    pub fn grid(&self, world: &str) -> Option<ChunkGrid> {
        let entries: Vec<(ChunkCoord, Arc<ChunkRecord>)> = self
            .entries
            .iter()
            .filter(|e| e.key().world == world)
            .map(|e| (e.key().coord(), Arc::clone(e.value())))
            .collect();

        let extent = ChunkExtent::enclosing(entries.iter().map(|(coord, _)| *coord))?;
        let depth = extent.depth();
        let mut cells = vec![None; extent.width() * depth];

        for (coord, record) in entries {
            let x = (coord.cx as i64 - extent.min.cx as i64) as usize;
            let z = (coord.cz as i64 - extent.min.cz as i64) as usize;
            cells[x * depth + z] = Some(record);
        }

        Some(ChunkGrid { extent, cells })
    }

    /// Copies out every entry, sorted by key.
    ///
    /// Each record is captured whole; entries written while the copy is
    /// running may or may not be included.
    pub fn snapshot(&self) -> Vec<(ChunkKey, Arc<ChunkRecord>)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Replaces the entire contents of the cache with a snapshot.
    pub fn replace_all(&self, snapshot: CacheSnapshot) {
        self.entries.clear();
        for (key, record) in snapshot.entries {
            self.entries.insert(key, Arc::new(record));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn key(cx: i32, cz: i32) -> ChunkKey {
        ChunkKey::new("world", cx, cz)
    }

    #[test]
    fn test_set_and_get() {
        let cache = ChunkCache::new();
        let record = ChunkRecord::filled(64, "minecraft:stone");

        cache.set(key(1, 2), record.clone());

        assert_eq!(cache.get(&key(1, 2)).as_deref(), Some(&record));
        assert!(cache.contains(&key(1, 2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let cache = ChunkCache::new();
        assert!(cache.get(&key(0, 0)).is_none());
        assert!(!cache.contains(&key(0, 0)));
    }

    #[test]
    fn test_worlds_are_separate() {
        let cache = ChunkCache::new();
        cache.set(ChunkKey::new("world", 0, 0), ChunkRecord::filled(1, "a"));
        cache.set(ChunkKey::new("world_nether", 0, 0), ChunkRecord::filled(2, "b"));

        assert_eq!(cache.len(), 2);
        let counts = cache.world_counts();
        assert_eq!(counts.get("world"), Some(&1));
        assert_eq!(counts.get("world_nether"), Some(&1));
    }

    #[test]
    fn test_overwrite_replaces_whole_record() {
        let cache = ChunkCache::new();
        cache.set(key(0, 0), ChunkRecord::filled(10, "old"));
        cache.set(key(0, 0), ChunkRecord::filled(20, "new"));

        let record = cache.get(&key(0, 0)).unwrap();
        assert_eq!(record.height_at(0, 0), Some(20));
        assert_eq!(record.block_at(15, 15), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stats_count_hits_misses_and_writes() {
        let cache = ChunkCache::new();
        cache.set(key(0, 0), ChunkRecord::default());
        cache.get(&key(0, 0));
        cache.get(&key(0, 0));
        cache.get(&key(9, 9));

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[test]
    fn test_extent_and_grid() {
        let cache = ChunkCache::new();
        cache.set(key(-2, 1), ChunkRecord::filled(1, "a"));
        cache.set(key(3, 4), ChunkRecord::filled(2, "b"));
        cache.set(ChunkKey::new("other", 100, 100), ChunkRecord::default());

        let extent = cache.extent("world").unwrap();
        assert_eq!(extent.min, ChunkCoord::new(-2, 1));
        assert_eq!(extent.max, ChunkCoord::new(3, 4));
        assert_eq!(extent.width(), 6);
        assert_eq!(extent.depth(), 4);

        let grid = cache.grid("world").unwrap();
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.filled(), 2);
        assert_eq!(
            grid.get(ChunkCoord::new(3, 4)).and_then(|r| r.height_at(0, 0)),
            Some(2)
        );
        assert!(grid.get(ChunkCoord::new(0, 2)).is_none());
        assert!(grid.get(ChunkCoord::new(50, 50)).is_none());
    }

    #[test]
    fn test_grid_of_unknown_world_is_none() {
        let cache = ChunkCache::new();
        assert!(cache.grid("world").is_none());
        assert!(cache.extent("world").is_none());
    }

    #[test]
    fn test_replace_all_drops_previous_entries() {
        let cache = ChunkCache::new();
        cache.set(key(0, 0), ChunkRecord::default());

        cache.replace_all(CacheSnapshot {
            entries: vec![(key(5, 5), ChunkRecord::filled(3, "x"))],
        });

        assert!(!cache.contains(&key(0, 0)));
        assert!(cache.contains(&key(5, 5)));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let cache = ChunkCache::new();
        cache.set(key(2, 0), ChunkRecord::default());
        cache.set(key(-1, 0), ChunkRecord::default());
        cache.set(key(0, 7), ChunkRecord::default());

        let keys: Vec<_> = cache.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![key(-1, 0), key(0, 7), key(2, 0)]);
    }

    #[test]
    fn test_concurrent_writers_and_bulk_reader() {
        let cache = Arc::new(ChunkCache::new());
        let mut handles = Vec::new();

        // Writers hammer an overlapping key range with uniform records.
        for writer in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for round in 0..200 {
                    let cx = (round % 16) as i32;
                    let value = writer * 1000 + round;
                    cache.set(key(cx, 0), ChunkRecord::filled(value, &value.to_string()));
                }
            }));
        }

        // A reader sweeps the range and checks every record is internally consistent.
        let reader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..200 {
                    for cx in 0..16 {
                        if let Some(record) = cache.get(&key(cx, 0)) {
                            let h = record.height_at(0, 0).unwrap();
                            let expected = h.to_string();
                            assert!(record.height.iter().flatten().all(|v| *v == h));
                            assert!(record.blocks.iter().flatten().all(|b| *b == expected));
                        }
                    }
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(cache.len(), 16);
    }

    #[test]
    fn test_grid_while_extent_grows() {
        let cache = Arc::new(ChunkCache::new());
        for cx in 0..32 {
            for cz in 0..32 {
                cache.set(key(cx, cz), ChunkRecord::filled(0, "stone"));
            }
        }

        // Each write pushes the world's extent outward on both corners.
        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for n in 32..532 {
                    cache.set(key(n, n), ChunkRecord::filled(n, "stone"));
                    cache.set(key(-n, -n), ChunkRecord::filled(-n, "stone"));
                }
            })
        };

        for _ in 0..500 {
            let grid = cache.grid("world").unwrap();
            assert_eq!(grid.len(), grid.extent.width() * grid.extent.depth());
            assert!(grid.filled() >= 32 * 32);
            assert!(grid.get(grid.extent.max).is_some());
        }

        writer.join().unwrap();
        let grid = cache.grid("world").unwrap();
        assert_eq!(grid.extent.min, ChunkCoord::new(-531, -531));
        assert_eq!(grid.extent.max, ChunkCoord::new(531, 531));
        assert_eq!(grid.filled(), 32 * 32 + 1000);
    }

    proptest! {
        #[test]
        fn prop_set_then_get_round_trips(
            world in "[a-z_]{1,12}",
            cx in any::<i32>(),
            cz in any::<i32>(),
            height in -64i32..320,
            block in "[a-z:_]{1,24}",
        ) {
            let cache = ChunkCache::new();
            let key = ChunkKey::new(world, cx, cz);
            let record = ChunkRecord::filled(height, &block);

            cache.set(key.clone(), record.clone());

            let got = cache.get(&key);
            prop_assert_eq!(got.as_deref(), Some(&record));
        }
    }
}
