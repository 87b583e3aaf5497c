//! WSI Pyramid - region and tile extraction for Whole Slide Images.
//!
//! This binary opens one slide from a directory root and runs a single
//! command against it.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_pyramid::{
    config::{
        AssociatedConfig, Cli, Command, DescribeConfig, SlideArgs, ThumbnailConfig, TileConfig,
        WindowConfig,
    },
    encode_jpeg, DirectoryOpener, DirectorySource, ImageSource, ReadError, Reader,
    ReaderOptions, SlideError, SlideRegistry, TileSpec,
};

/// Failures surfaced by a command.
#[derive(Debug, Error)]
enum CommandError {
    #[error("{0}")]
    Slide(#[from] SlideError),

    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.into_command();

    init_logging(command.verbose());

    if let Err(e) = command.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match command {
        Command::Describe(config) => run_describe(config).await,
        Command::Window(config) => run_window(config).await,
        Command::Tile(config) => run_tile(config).await,
        Command::Thumbnail(config) => run_thumbnail(config).await,
        Command::Associated(config) => run_associated(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_pyramid=debug"
    } else {
        "wsi_pyramid=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

type Slide = std::sync::Arc<ImageSource<DirectorySource>>;

/// Open the slide named on the command line.
async fn open_slide(args: &SlideArgs) -> Result<Slide, CommandError> {
    debug!(root = %args.root.display(), slide = %args.slide, "Opening slide");
    let registry = SlideRegistry::with_capacity(DirectoryOpener::new(&args.root), 1);
    Ok(registry.get_slide(&args.slide).await?)
}

/// Encode a raster at the reader's JPEG quality and write it to `path`.
async fn write_jpeg(
    path: &Path,
    options: &ReaderOptions,
    raster: &wsi_pyramid::Raster,
) -> Result<(), CommandError> {
    let jpeg = encode_jpeg(raster, options.jpeg_quality)?;
    write_file(path, &jpeg).await?;
    info!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        bytes = jpeg.len(),
        "Wrote JPEG"
    );
    Ok(())
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), CommandError> {
    tokio::fs::write(path, data)
        .await
        .map_err(|source| CommandError::Write {
            path: path.display().to_string(),
            source,
        })
}

// =============================================================================
// Commands
// =============================================================================

async fn run_describe(config: DescribeConfig) -> Result<(), CommandError> {
    let slide = open_slide(&config.slide).await?;

    let mut json = serde_json::json!({
        "identifier": slide.identifier(),
        "levels": slide.pyramid().tiers(),
        "metadata": slide.metadata(),
    });
    if config.raw_tags {
        json["raw_tags"] = serde_json::to_value(slide.raw_tags())?;
    }

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn run_window(config: WindowConfig) -> Result<(), CommandError> {
    let slide = open_slide(&config.slide).await?;
    let region = config.region().map_err(ReadError::from)?;
    let (out_width, out_height) = config.output_size();

    let reader = slide.reader_with(config.output.reader_options());
    let raster = reader.read_window(&region, out_width, out_height).await?;
    write_jpeg(&config.output.output, reader.options(), &raster).await
}

async fn run_tile(config: TileConfig) -> Result<(), CommandError> {
    let slide = open_slide(&config.slide).await?;
    let reader = slide.reader_with(config.output.reader_options());
    let raster = reader
        .read_tile(TileSpec::new(config.level, config.x, config.y))
        .await?;
    write_jpeg(&config.output.output, reader.options(), &raster).await
}

async fn run_thumbnail(config: ThumbnailConfig) -> Result<(), CommandError> {
    let slide = open_slide(&config.slide).await?;
    let reader = slide.reader_with(config.output.reader_options());
    let raster = reader.read_thumbnail(config.width, config.height).await?;
    write_jpeg(&config.output.output, reader.options(), &raster).await
}

async fn run_associated(config: AssociatedConfig) -> Result<(), CommandError> {
    let slide = open_slide(&config.slide).await?;
    let reader = slide.reader_with(config.output.reader_options());
    let raster = reader.read_associated(config.kind).await?;
    write_jpeg(&config.output.output, reader.options(), &raster).await
}
