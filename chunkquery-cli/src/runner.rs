//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, application startup
//! and image output so the command handlers only describe what to render.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use chunkquery::app::{AppConfig, AppError, ChunkQueryApp};
use chunkquery::config::ConfigFile;
use chunkquery::images::ImageKind;
use chunkquery::logging::{init_logging, LoggingGuard};
use chunkquery::render::{BlockPalette, RenderBarrier, RenderReport};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config (from `config_path` or the default location) and
    /// initialize logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let logging_guard = init_logging(&config.logging.directory, &config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("ChunkQuery v{}", chunkquery::VERSION);
        info!(
            command,
            api_server = %self.config.server.api_server,
            "ChunkQuery CLI"
        );
    }

    /// Build the multi-threaded runtime the application runs on.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }

    /// Application config from the config file with CLI overrides applied.
    pub fn app_config(&self, barrier: Option<RenderBarrier>) -> AppConfig {
        let config = AppConfig::from_config_file(&self.config);
        match barrier {
            Some(barrier) => config.with_render_barrier(barrier),
            None => config,
        }
    }

    /// Block palette from the configured JSON file, or the built-in one.
    pub fn palette(&self) -> Result<BlockPalette, CliError> {
        match &self.config.render.palette {
            Some(path) => {
                let palette = BlockPalette::load(path).map_err(AppError::from)?;
                info!(path = %path.display(), blocks = palette.len(), "Loaded block palette");
                Ok(palette)
            }
            None => Ok(BlockPalette::overworld()),
        }
    }

    /// Start the application against the configured game server.
    pub async fn start_app(
        &self,
        barrier: Option<RenderBarrier>,
    ) -> Result<ChunkQueryApp, CliError> {
        let app = ChunkQueryApp::start_http(self.app_config(barrier), self.palette()?).await?;
        Ok(app)
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            ConfigFile::load_from(path)?
        }
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Spinner shown while a render is in progress.
pub fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Write both images rendered for `requester` into `out_dir`.
pub fn write_images(
    app: &ChunkQueryApp,
    requester: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, CliError> {
    fs::create_dir_all(out_dir).map_err(|error| CliError::FileWrite {
        path: out_dir.to_path_buf(),
        error,
    })?;

    let mut written = Vec::with_capacity(ImageKind::ALL.len());
    for kind in ImageKind::ALL {
        let png = app.get_image(requester, kind)?;
        let path = out_dir.join(kind.file_name());
        fs::write(&path, png.as_slice()).map_err(|error| CliError::FileWrite {
            path: path.clone(),
            error,
        })?;
        written.push(path);
    }
    Ok(written)
}

/// Print a render report.
pub fn print_report(report: &RenderReport, written: &[PathBuf]) {
    println!(
        "Rendered {}x{} px for '{}' ({} chunks around {} in {})",
        report.size,
        report.size,
        report.requester,
        report.region.chunk_count(),
        report.region.center,
        report.world
    );
    println!(
        "  Chunks:  {} present, {} missing",
        report.chunks_present, report.chunks_missing
    );
    match report.height_range {
        Some((min, max)) => println!("  Heights: {}..={}", min, max),
        None => println!("  Heights: none"),
    }
    println!(
        "  Timing:  waited {:.1}s, rendered in {}ms",
        report.wait_time.as_secs_f64(),
        report.render_time.as_millis()
    );
    if !report.unassigned.is_empty() {
        let blocks: Vec<&str> = report.unassigned.iter().map(String::as_str).collect();
        println!("  Blocks without a palette color: {}", blocks.join(", "));
    }
    for path in written {
        println!("  Wrote {}", path.display());
    }
}
