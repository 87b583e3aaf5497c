//! Format capability traits.
//!
//! A slide format is served through three independent capabilities:
//!
//! - [`Checker`]: does this location hold a slide of the format?
//! - [`Parser`]: build the pyramid, metadata and raw tags for one slide
//! - [`Reader`]: fetch pixels as windows, tiles, thumbnails or associated
//!   images
//!
//! The crate ships [`DirectoryChecker`] and [`SourceParser`] for tile
//! directories; [`crate::slide::RegionReader`] implements [`Reader`] on top
//! of any [`crate::source::PixelSource`].

mod detect;
mod parser;

pub use detect::{detect_format, DirectoryChecker, SlideFormat};
pub use parser::SourceParser;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{MetadataError, PyramidError, ReadError};
use crate::geometry::Region;
use crate::metadata::{ImageMetadata, RawTagStore};
use crate::pyramid::Pyramid;
use crate::source::{AssociatedKind, Raster};

/// Address of one native tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileSpec {
    pub level: usize,
    pub tile_x: u32,
    pub tile_y: u32,
}

impl TileSpec {
    pub const fn new(level: usize, tile_x: u32, tile_y: u32) -> Self {
        Self {
            level,
            tile_x,
            tile_y,
        }
    }
}

/// Recognizes locations holding a slide of one format.
pub trait Checker: Send + Sync {
    /// Human-readable format name.
    fn name(&self) -> &'static str;

    /// True when `path` can be opened by this format.
    fn matches(&self, path: &Path) -> bool;
}

/// Builds the structural description of one slide.
pub trait Parser {
    /// Namespace under which raw tags are stored.
    fn namespace(&self) -> &str;

    fn parse_pyramid(&self) -> Result<Pyramid, PyramidError>;

    fn parse_metadata(&self) -> Result<ImageMetadata, MetadataError>;

    fn parse_raw_tags(&self) -> RawTagStore;
}

/// Pixel access for one slide.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Read `region` (base coordinates) resampled to exactly
    /// `out_width` x `out_height`.
    async fn read_window(
        &self,
        region: &Region,
        out_width: u32,
        out_height: u32,
    ) -> Result<Raster, ReadError>;

    /// Read one native tile without resampling.
    async fn read_tile(&self, spec: TileSpec) -> Result<Raster, ReadError>;

    /// Read the whole image scaled to exactly `out_width` x `out_height`.
    async fn read_thumbnail(&self, out_width: u32, out_height: u32) -> Result<Raster, ReadError>;

    /// Read the label or macro image as RGB.
    async fn read_associated(&self, kind: AssociatedKind) -> Result<Raster, ReadError>;
}
