//! Region command - load and render a square of chunks.

use std::path::{Path, PathBuf};

use clap::Args;
use chunkquery::coord::{ChunkCoord, DEFAULT_WORLD};
use chunkquery::render::RenderBarrier;

use super::{load_and_render, RenderRequest};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the region command.
#[derive(Debug, Args)]
pub struct RegionArgs {
    /// Center chunk X coordinate
    #[arg(long, allow_negative_numbers = true)]
    pub cx: i32,

    /// Center chunk Z coordinate
    #[arg(long, allow_negative_numbers = true)]
    pub cz: i32,

    /// Region radius in chunks (default: render.radius from config)
    #[arg(long)]
    pub radius: Option<u32>,

    /// World (dimension) name
    #[arg(long, default_value = DEFAULT_WORLD)]
    pub world: String,

    /// Name the rendered images are stored under
    #[arg(long, default_value = "cli")]
    pub requester: String,

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

/// Run the region command.
pub fn run(config_path: Option<&Path>, args: RegionArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("region");

    let radius = args.radius.unwrap_or(runner.config().render.radius);
    let runtime = runner.runtime()?;

    runtime.block_on(async {
        let app = runner.start_app(args.barrier).await?;
        load_and_render(
            app,
            RenderRequest {
                center: ChunkCoord::new(args.cx, args.cz),
                radius,
                world: &args.world,
                requester: &args.requester,
                force: args.force,
                out_dir: &args.out,
            },
        )
        .await
    })
}
