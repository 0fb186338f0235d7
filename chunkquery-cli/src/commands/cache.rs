//! Cache inspection CLI commands.

use std::path::Path;

use clap::Subcommand;
use chunkquery::cache::{ChunkCache, PersistenceManager};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show what the cache snapshot on disk contains
    Stats,
}

/// Run a cache subcommand.
pub fn run(config_path: Option<&Path>, action: CacheAction) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    let cache_file = &runner.config().cache.file;

    match action {
        CacheAction::Stats => {
            println!("Chunk cache: {}", cache_file.display());

            let persistence = PersistenceManager::new(cache_file);
            let Some(snapshot) = persistence.load() else {
                println!("  No readable snapshot");
                return Ok(());
            };
            let cache = ChunkCache::from_snapshot(snapshot);

            println!("  Chunks: {}", cache.len());
            for (world, count) in cache.world_counts() {
                match cache.extent(&world) {
                    Some(extent) => println!(
                        "  {}: {} chunks, x {}..={}, z {}..={} ({}x{})",
                        world,
                        count,
                        extent.min.cx,
                        extent.max.cx,
                        extent.min.cz,
                        extent.max.cz,
                        extent.width(),
                        extent.depth()
                    ),
                    None => println!("  {}: {} chunks", world, count),
                }
            }
            Ok(())
        }
    }
}
