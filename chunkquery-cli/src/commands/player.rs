//! Player command - render the area around a player's current position.

use std::path::{Path, PathBuf};

use clap::Args;
use chunkquery::coord::ChunkCoord;
use chunkquery::render::RenderBarrier;

use super::{load_and_render, RenderRequest};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the player command.
#[derive(Debug, Args)]
pub struct PlayerArgs {
    /// Player name as known to the game server
    #[arg(long)]
    pub name: String,

    /// Region radius in chunks (default: render.radius from config)
    #[arg(long)]
    pub radius: Option<u32>,

    /// Download chunks again even if they are cached
    #[arg(long)]
    pub force: bool,

    /// What the render waits for: region or global
    #[arg(long)]
    pub barrier: Option<RenderBarrier>,

    /// Directory to write heightmap.png and texture.png into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

/// Run the player command.
pub fn run(config_path: Option<&Path>, args: PlayerArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("player");

    let radius = args.radius.unwrap_or(runner.config().render.radius);
    let runtime = runner.runtime()?;

    runtime.block_on(async {
        let app = runner.start_app(args.barrier).await?;

        let location = app
            .locate_player(&args.name)
            .await
            .map_err(CliError::Player)?;
        println!(
            "Player '{}' is in chunk {},{} of {}",
            location.name, location.cx, location.cz, location.world
        );

        load_and_render(
            app,
            RenderRequest {
                center: ChunkCoord::new(location.cx, location.cz),
                radius,
                world: &location.world,
                requester: &args.name,
                force: args.force,
                out_dir: &args.out,
            },
        )
        .await
    })
}
