//! Command-line configuration for the `wsi-pyramid` binary.
//!
//! Every command opens one slide from a root directory of tile directories
//! and either describes it or writes a JPEG.
//!
//! # Environment Variables
//!
//! - `WSI_ROOT` - Directory holding the slides (default: current directory)
//! - `WSI_JPEG_QUALITY` - JPEG quality for written images (default: 80)
//! - `WSI_FILTER` - Resampling filter (default: triangle)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::imageops::FilterType;

use crate::geometry::Region;
use crate::slide::ReaderOptions;
use crate::source::{AssociatedKind, DEFAULT_JPEG_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default slide root.
pub const DEFAULT_ROOT: &str = ".";

/// Largest output edge accepted by any command.
pub const MAX_OUTPUT_DIMENSION: u32 = 16_384;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Pyramid - region and tile extraction for Whole Slide Images.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-pyramid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the pyramid and metadata of a slide as JSON
    Describe(DescribeConfig),

    /// Extract a region resampled to an output size
    Window(WindowConfig),

    /// Extract one native tile
    Tile(TileConfig),

    /// Render the whole slide at a small size
    Thumbnail(ThumbnailConfig),

    /// Extract the label or macro image
    Associated(AssociatedConfig),
}

impl Command {
    pub fn slide(&self) -> &SlideArgs {
        match self {
            Command::Describe(c) => &c.slide,
            Command::Window(c) => &c.slide,
            Command::Tile(c) => &c.slide,
            Command::Thumbnail(c) => &c.slide,
            Command::Associated(c) => &c.slide,
        }
    }

    pub fn verbose(&self) -> bool {
        self.slide().verbose
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.slide().validate()?;
        match self {
            Command::Describe(_) => Ok(()),
            Command::Window(c) => c.validate(),
            Command::Tile(c) => c.output.validate(),
            Command::Thumbnail(c) => c.validate(),
            Command::Associated(c) => c.output.validate(),
        }
    }
}

// =============================================================================
// Shared argument groups
// =============================================================================

/// Which slide to open.
#[derive(Args, Debug, Clone)]
pub struct SlideArgs {
    /// Slide id: a tile directory below the root
    pub slide: String,

    /// Directory holding the slides.
    #[arg(long, default_value = DEFAULT_ROOT, env = "WSI_ROOT")]
    pub root: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SlideArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.slide.trim().is_empty() {
            return Err("slide id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Resampling filter for resized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Where and how to write the resulting JPEG.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output JPEG path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Resampling filter used when the output size differs from the tier.
    #[arg(long, value_enum, default_value_t = ResampleFilter::Triangle, env = "WSI_FILTER")]
    pub filter: ResampleFilter,
}

impl OutputArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }
        if self.output.as_os_str().is_empty() {
            return Err("output path is required".to_string());
        }
        Ok(())
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            filter: self.filter.into(),
            jpeg_quality: self.jpeg_quality,
        }
    }
}

fn check_output_size(width: u32, height: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("output size must be positive, got {}x{}", width, height));
    }
    if width > MAX_OUTPUT_DIMENSION || height > MAX_OUTPUT_DIMENSION {
        return Err(format!(
            "output size {}x{} exceeds the {} pixel limit",
            width, height, MAX_OUTPUT_DIMENSION
        ));
    }
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct DescribeConfig {
    #[command(flatten)]
    pub slide: SlideArgs,

    /// Include the flattened raw tag store.
    #[arg(long, default_value_t = false)]
    pub raw_tags: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WindowConfig {
    #[command(flatten)]
    pub slide: SlideArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Left edge in level 0 pixels.
    #[arg(long, default_value_t = 0)]
    pub left: u32,

    /// Top edge in level 0 pixels.
    #[arg(long, default_value_t = 0)]
    pub top: u32,

    /// Region width in level 0 pixels.
    #[arg(long)]
    pub width: u32,

    /// Region height in level 0 pixels.
    #[arg(long)]
    pub height: u32,

    /// Output width (defaults to the region width).
    #[arg(long)]
    pub out_width: Option<u32>,

    /// Output height (defaults to the region height).
    #[arg(long)]
    pub out_height: Option<u32>,
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.output.validate()?;
        self.region().map_err(|e| e.to_string())?;
        let (w, h) = self.output_size();
        check_output_size(w, h)
    }

    pub fn region(&self) -> Result<Region, crate::error::PyramidError> {
        Region::new(self.left, self.top, self.width, self.height)
    }

    /// Requested output size, falling back to the region size.
    pub fn output_size(&self) -> (u32, u32) {
        (
            self.out_width.unwrap_or(self.width),
            self.out_height.unwrap_or(self.height),
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    #[command(flatten)]
    pub slide: SlideArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Pyramid level (0 = highest resolution).
    #[arg(long, default_value_t = 0)]
    pub level: usize,

    /// Tile column.
    #[arg(long)]
    pub x: u32,

    /// Tile row.
    #[arg(long)]
    pub y: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ThumbnailConfig {
    #[command(flatten)]
    pub slide: SlideArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Thumbnail width.
    #[arg(long, default_value_t = 512)]
    pub width: u32,

    /// Thumbnail height.
    #[arg(long, default_value_t = 512)]
    pub height: u32,
}

impl ThumbnailConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.output.validate()?;
        check_output_size(self.width, self.height)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AssociatedConfig {
    #[command(flatten)]
    pub slide: SlideArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Which associated image to extract.
    #[arg(value_enum)]
    pub kind: AssociatedKind,
}

// =============================================================================
// Tests
// =============================================================================
