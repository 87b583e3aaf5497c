//! A single resolution level of an image pyramid.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::geometry::{Region, Size};

/// One tier of a [`Pyramid`](super::Pyramid).
///
/// Level 0 is the highest resolution (full size), with higher levels being
/// progressively smaller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PyramidTier {
    /// Index of this tier in the pyramid (0 = highest resolution)
    pub level: usize,

    /// Tier width in pixels
    pub width: u32,

    /// Tier height in pixels
    pub height: u32,

    /// Native tile width in pixels
    pub tile_width: u32,

    /// Native tile height in pixels
    pub tile_height: u32,

    /// Downsample factor relative to level 0 (`base.width / width`)
    pub downsample: f64,

    /// `base.height / height`, kept for diagnostics only
    pub height_downsample: f64,
}

impl PyramidTier {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn tile_size(&self) -> Size {
        Size::new(self.tile_width, self.tile_height)
    }

    /// Number of tiles in X direction.
    pub fn tiles_x(&self) -> u32 {
        self.width.div_ceil(self.tile_width)
    }

    /// Number of tiles in Y direction.
    pub fn tiles_y(&self) -> u32 {
        self.height.div_ceil(self.tile_height)
    }

    pub fn tile_count(&self) -> u64 {
        self.tiles_x() as u64 * self.tiles_y() as u64
    }

    /// Row-major index of a tile, or `None` when out of the grid.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u64> {
        if tile_x >= self.tiles_x() || tile_y >= self.tiles_y() {
            return None;
        }
        Some(tile_y as u64 * self.tiles_x() as u64 + tile_x as u64)
    }

    /// Pixel dimensions of a specific tile.
    ///
    /// Edge tiles may be smaller than tile_width/tile_height.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<Size> {
        if tile_x >= self.tiles_x() || tile_y >= self.tiles_y() {
            return None;
        }
        let x0 = tile_x * self.tile_width;
        let y0 = tile_y * self.tile_height;
        Some(Size::new(
            (self.width - x0).min(self.tile_width),
            (self.height - y0).min(self.tile_height),
        ))
    }

    /// Tier-local rectangle covered by a tile.
    pub fn tile_region(&self, tile_x: u32, tile_y: u32) -> Option<Region> {
        let dims = self.tile_dimensions(tile_x, tile_y)?;
        Region::with_downsample(
            tile_x * self.tile_width,
            tile_y * self.tile_height,
            dims.width,
            dims.height,
            self.downsample,
        )
        .ok()
    }

    /// Inclusive tile index ranges covering a tier-local region.
    ///
    /// The region must already be clamped to the tier.
    pub fn tile_range(&self, region: &Region) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
        let first_x = region.left / self.tile_width;
        let first_y = region.top / self.tile_height;
        let last_x = ((region.right() - 1) / self.tile_width as u64) as u32;
        let last_y = ((region.bottom() - 1) / self.tile_height as u64) as u32;
        (first_x..=last_x, first_y..=last_y)
    }
}
