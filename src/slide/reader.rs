//! Region reader: (tier, region) → tile fetches → stitched raster.
//!
//! # Read path
//!
//! ```text
//!   region (base coords), output size
//!              │
//!              ▼
//!   most_appropriate_tier ──► scale_to_tier
//!              │
//!              ▼
//!   tile_range ──► read_tile × N (concurrent, first error aborts)
//!              │
//!              ▼
//!   paste onto canvas of the tier-local region size
//!              │
//!              ▼
//!   resize_exact to the output size (skipped when already equal)
//! ```
//!
//! A reader only borrows the immutable pieces of an opened slide, so any
//! number of reads can run against the same handle at once.

use async_trait::async_trait;
use futures_util::future::try_join_all;
use image::imageops::FilterType;
use image::ColorType;
use tracing::debug;

use crate::error::{PyramidError, ReadError};
use crate::format::{Reader, TileSpec};
use crate::geometry::{Point, Region, Size};
use crate::pyramid::{scale_to_tier, Pyramid, PyramidTier};
use crate::source::{
    blank_raster, paste, resize_to, AssociatedKind, PixelSource, Raster, DEFAULT_JPEG_QUALITY,
};

// =============================================================================
// Options
// =============================================================================

/// Knobs for pixel reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderOptions {
    /// Resampling filter used when the output size differs from the tier
    pub filter: FilterType,

    /// Quality used by callers that encode read results as JPEG
    pub jpeg_quality: u8,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

// =============================================================================
// RegionReader
// =============================================================================

/// [`Reader`] over a pixel source and its pyramid.
pub struct RegionReader<'a, P: PixelSource + ?Sized> {
    source: &'a P,
    pyramid: &'a Pyramid,
    options: ReaderOptions,
}

impl<'a, P: PixelSource + ?Sized> RegionReader<'a, P> {
    pub fn new(source: &'a P, pyramid: &'a Pyramid, options: ReaderOptions) -> Self {
        Self {
            source,
            pyramid,
            options,
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Fetch and stitch every tile covering a tier-local region.
    ///
    /// The result is exactly `local.size()`.
    async fn read_tier_region(
        &self,
        tier: &PyramidTier,
        local: &Region,
    ) -> Result<Raster, ReadError> {
        let (cols, rows) = tier.tile_range(local);
        let tiles: Vec<(u32, u32)> = rows
            .flat_map(|ty| cols.clone().map(move |tx| (tx, ty)))
            .collect();

        debug!(
            source = self.source.identifier(),
            level = tier.level,
            left = local.left,
            top = local.top,
            width = local.width,
            height = local.height,
            tiles = tiles.len(),
            "Reading tier region"
        );

        let fetched = try_join_all(tiles.iter().map(|&(tx, ty)| async move {
            let raster = self.source.read_tile(tier.level, tx, ty).await?;
            Ok::<_, ReadError>((tx, ty, raster))
        }))
        .await?;

        let color = fetched
            .first()
            .map(|(_, _, raster)| raster.color())
            .unwrap_or(ColorType::Rgb8);
        let mut canvas = blank_raster(color, local.size());
        let origin = local.origin();

        for (tx, ty, raster) in &fetched {
            let tile_origin = Point::new(
                *tx as i64 * tier.tile_width as i64,
                *ty as i64 * tier.tile_height as i64,
            );
            let offset = tile_origin.offset_from(origin);
            paste(&mut canvas, raster, offset.x, offset.y);
        }

        Ok(canvas)
    }
}

#[async_trait]
impl<P: PixelSource + ?Sized> Reader for RegionReader<'_, P> {
    async fn read_window(
        &self,
        region: &Region,
        out_width: u32,
        out_height: u32,
    ) -> Result<Raster, ReadError> {
        let output = Size::new(out_width, out_height);
        let selection = self.pyramid.most_appropriate_tier(region, output)?;
        let local = scale_to_tier(region, selection.tier)?;

        let raster = self.read_tier_region(selection.tier, &local).await?;
        Ok(resize_to(raster, output, self.options.filter))
    }

    async fn read_tile(&self, spec: TileSpec) -> Result<Raster, ReadError> {
        let tier = self.pyramid.get_level(spec.level)?;
        let local = tier.tile_region(spec.tile_x, spec.tile_y).ok_or(
            PyramidError::OutOfBounds {
                level: spec.level,
                left: spec.tile_x.saturating_mul(tier.tile_width),
                top: spec.tile_y.saturating_mul(tier.tile_height),
                width: tier.tile_width,
                height: tier.tile_height,
            },
        )?;

        self.read_tier_region(tier, &local).await
    }

    async fn read_thumbnail(&self, out_width: u32, out_height: u32) -> Result<Raster, ReadError> {
        let output = Size::new(out_width, out_height);
        if output.is_empty() {
            return Err(PyramidError::invalid_geometry(format!(
                "thumbnail size must be positive, got {}x{}",
                out_width, out_height
            ))
            .into());
        }

        // Coarsest tier that still covers the request on both axes
        let tier = match self
            .pyramid
            .tiers()
            .iter()
            .rev()
            .find(|tier| tier.size().covers(output))
        {
            Some(tier) => tier,
            None => self.pyramid.coarsest()?,
        };
        debug!(
            level = tier.level,
            width = out_width,
            height = out_height,
            "Reading thumbnail"
        );

        let whole = Region::with_downsample(0, 0, tier.width, tier.height, tier.downsample)?;
        let raster = self.read_tier_region(tier, &whole).await?;
        Ok(resize_to(raster, output, self.options.filter))
    }

    async fn read_associated(&self, kind: AssociatedKind) -> Result<Raster, ReadError> {
        if self.source.associated_size(kind).is_none() {
            return Err(ReadError::NotAvailable { kind });
        }
        let raster = self.source.read_associated(kind).await?;
        Ok(Raster::ImageRgb8(raster.to_rgb8()))
    }
}
