//! # WSI Pyramid
//!
//! Pyramid geometry, tier selection and region-to-tile addressing for Whole
//! Slide Images (WSI).
//!
//! A slide is stored as a resolution pyramid of tiled levels. This library
//! turns "give me this rectangle at that size" into the minimal set of tile
//! fetches on the right level, stitches the tiles, and resamples the result.
//! It also normalizes the slide's tag dictionary into one canonical metadata
//! shape.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geometry`] - Size, point and region value types
//! - [`pyramid`] - Tier table, tier selection and region mapping
//! - [`source`] - Pixel source trait, tag dictionary, tile directory source
//! - [`metadata`] - Canonical image metadata and raw tag store
//! - [`mod@format`] - Checker / parser / reader capability traits
//! - [`slide`] - Opened handles, region reader and registry
//! - [`config`] - CLI configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_pyramid::{DirectoryOpener, Reader, Region, SlideRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SlideRegistry::new(DirectoryOpener::new("/data/slides"));
//!     let slide = registry.get_slide("case-001").await?;
//!
//!     // 4096x4096 base pixels rendered at 512x512
//!     let region = Region::new(10_000, 8_000, 4096, 4096)?;
//!     let raster = slide.reader().read_window(&region, 512, 512).await?;
//!     assert_eq!((raster.width(), raster.height()), (512, 512));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod geometry;
pub mod metadata;
pub mod pyramid;
pub mod slide;
pub mod source;

// Re-export commonly used types
pub use config::{Cli, Command, ResampleFilter};
pub use error::{MetadataError, PyramidError, ReadError, SlideError, SourceError};
pub use format::{
    detect_format, Checker, DirectoryChecker, Parser, Reader, SlideFormat, SourceParser, TileSpec,
};
pub use geometry::{Point, Region, Size};
pub use metadata::{
    normalize_metadata, ChannelRole, ImageChannel, ImageMetadata, LengthUnit, PhysicalLength,
    PixelType, RawTagStore, RawValue,
};
pub use pyramid::{ideal_downsample, scale_to_tier, Pyramid, PyramidTier, TierSelection};
pub use slide::{
    DirectoryOpener, ImageSource, ReaderOptions, RegionReader, SlideOpener, SlideRegistry,
};
pub use source::{
    encode_jpeg, AssociatedKind, DirectorySource, LevelReport, PixelSource, Raster, TagDictionary,
    TagValue,
};
