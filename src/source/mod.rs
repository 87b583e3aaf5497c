//! Pixel source abstraction.
//!
//! A [`PixelSource`] is the external collaborator that knows how to decode a
//! slide's pixels. The pyramid engine only consumes what it reports: the
//! level geometry, the sample count, optional pixel spacing, a tag
//! dictionary, and tile/associated rasters.
//!
//! [`DirectorySource`] is the implementation shipped with the crate: a
//! directory of pre-cut tiles described by a JSON manifest.

mod directory;
mod raster;
mod tags;

pub use directory::{
    DirectorySource, Manifest, ManifestAssociated, ManifestLevel, PixelSpacing, MANIFEST_FILE,
};
pub use raster::{blank_raster, encode_jpeg, paste, resize_to, Raster, DEFAULT_JPEG_QUALITY};
pub use tags::{TagDictionary, TagValue};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::geometry::Size;

/// Side images bundled with a slide, outside the pyramid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AssociatedKind {
    /// Slide label (barcode / handwriting)
    Label,

    /// Low-magnification overview of the whole glass slide
    Macro,
}

impl AssociatedKind {
    pub const fn name(&self) -> &'static str {
        match self {
            AssociatedKind::Label => "label",
            AssociatedKind::Macro => "macro",
        }
    }
}

impl fmt::Display for AssociatedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry of one level as reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub size: Size,
    pub tile_size: Size,
}

/// Contract for the pixel-decoding collaborator behind a slide.
///
/// Levels are reported finest first; the pyramid is built in exactly that
/// order. Implementations must be thread-safe: one source is shared by all
/// concurrent reads of a slide.
#[async_trait]
pub trait PixelSource: Send + Sync {
    /// Identifier for logging and cache keys.
    fn identifier(&self) -> &str;

    /// Per-level size and native tile size, finest first.
    fn levels(&self) -> &[LevelReport];

    /// Samples per pixel delivered by tile reads.
    fn samples_per_pixel(&self) -> u16;

    /// Per-plane pixel spacing `(x, y)` in micrometers, if known.
    fn pixel_spacing(&self) -> Option<(f64, f64)> {
        None
    }

    /// Source-specific metadata dictionary.
    fn tags(&self) -> &TagDictionary;

    /// Size of an associated image, or `None` when the slide has none.
    fn associated_size(&self, kind: AssociatedKind) -> Option<Size>;

    /// Decode one tile. Edge tiles are clipped to the level bounds.
    async fn read_tile(&self, level: usize, tile_x: u32, tile_y: u32)
        -> Result<Raster, SourceError>;

    /// Decode an associated image.
    async fn read_associated(&self, kind: AssociatedKind) -> Result<Raster, SourceError>;
}
