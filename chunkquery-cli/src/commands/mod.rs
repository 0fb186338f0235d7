//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache inspection (stats)
//! - [`init`] - Configuration initialization
//! - [`player`] - Render the area around a player
//! - [`region`] - Load and render a region by chunk coordinates

pub mod cache;
pub mod init;
pub mod player;
pub mod region;

use std::path::Path;

use chunkquery::app::ChunkQueryApp;
use chunkquery::coord::ChunkCoord;

use crate::error::CliError;
use crate::runner::{print_report, spinner, write_images};

/// A load-then-render request shared by `region` and `player`.
pub(crate) struct RenderRequest<'a> {
    pub center: ChunkCoord,
    pub radius: u32,
    pub world: &'a str,
    pub requester: &'a str,
    pub force: bool,
    pub out_dir: &'a Path,
}

/// Queue the region's downloads, render it, write the images and shut down.
pub(crate) async fn load_and_render(
    app: ChunkQueryApp,
    request: RenderRequest<'_>,
) -> Result<(), CliError> {
    let summary = app.load_region(request.center, request.radius, request.world, request.force)?;
    println!(
        "Region {} radius {}: {} queued, {} already downloading, {} cached",
        request.center, request.radius, summary.queued, summary.joined, summary.skipped
    );

    let progress = spinner(format!("Rendering for '{}'", request.requester));
    let report = app
        .render_region_and_wait(request.center, request.radius, request.world, request.requester)
        .await;
    progress.finish_and_clear();
    let report = report?;

    let written = write_images(&app, request.requester, request.out_dir)?;
    print_report(&report, &written);

    if let Some(stats) = app.shutdown().await? {
        println!(
            "  Saved {} chunks ({} bytes)",
            stats.entries, stats.bytes
        );
    }
    Ok(())
}
