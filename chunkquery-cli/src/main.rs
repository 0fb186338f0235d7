//! ChunkQuery CLI - Command-line interface
//!
//! Downloads chunks from a game server into the local cache and renders
//! regions of it into `heightmap.png` and `texture.png`.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::player::PlayerArgs;
use commands::region::RegionArgs;

#[derive(Parser)]
#[command(name = "chunkquery")]
#[command(version)]
#[command(about = "Cache game-world chunks and render them into maps", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.chunkquery/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.chunkquery/config.ini
    Init,

    /// Load and render a region around a chunk coordinate
    Region(RegionArgs),

    /// Load and render the region around a player
    Player(PlayerArgs),

    /// Inspect the chunk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Region(args) => commands::region::run(config, args),
        Commands::Player(args) => commands::player::run(config, args),
        Commands::Cache { action } => commands::cache::run(config, action),
    };

    if let Err(e) = result {
        e.exit();
    }
}
