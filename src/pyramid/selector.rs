//! Tier selection and region mapping.
//!
//! Given a region in base coordinates and the pixel size the caller wants
//! back, pick the coarsest tier that still provides at least the requested
//! resolution, then express the region in that tier's pixel space.

use serde::Serialize;
use tracing::debug;

use crate::error::PyramidError;
use crate::geometry::{Region, Size};

use super::table::Pyramid;
use super::tier::PyramidTier;

/// Relative slack when comparing downsample factors.
const DOWNSAMPLE_EPSILON: f64 = 1e-9;

/// Outcome of [`Pyramid::most_appropriate_tier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierSelection<'a> {
    pub tier: &'a PyramidTier,

    /// Downsample the request asked for
    pub ideal_downsample: f64,

    /// True when the request is finer than level 0 and the caller will get
    /// upscaled pixels
    pub upsampled: bool,
}

/// `max(region.width / out.width, region.height / out.height)`.
///
/// Taking the tighter axis means the chosen tier never has to be stretched
/// beyond what it holds on either axis.
pub fn ideal_downsample(region: &Region, output_size: Size) -> Result<f64, PyramidError> {
    if output_size.is_empty() {
        return Err(PyramidError::invalid_geometry(format!(
            "output size must be positive, got {}x{}",
            output_size.width, output_size.height
        )));
    }
    let base = region.to_base();
    let dx = base.width as f64 / output_size.width as f64;
    let dy = base.height as f64 / output_size.height as f64;
    Ok(dx.max(dy))
}

impl Pyramid {
    /// Pick the tier best matching a request.
    ///
    /// Chooses the tier with the largest downsample not exceeding the ideal
    /// one; equal downsamples resolve to the lower level. When the request is
    /// finer than every tier, level 0 is returned with `upsampled` set.
    pub fn most_appropriate_tier(
        &self,
        region: &Region,
        output_size: Size,
    ) -> Result<TierSelection<'_>, PyramidError> {
        let ideal = ideal_downsample(region, output_size)?;
        let base = self.base()?;
        let limit = ideal * (1.0 + DOWNSAMPLE_EPSILON);

        let mut chosen = base;
        for tier in self.tiers() {
            if tier.downsample <= limit && tier.downsample > chosen.downsample {
                chosen = tier;
            }
        }

        let upsampled = base.downsample > limit;
        debug!(
            ideal_downsample = ideal,
            level = chosen.level,
            downsample = chosen.downsample,
            upsampled,
            "Selected pyramid tier"
        );

        Ok(TierSelection {
            tier: chosen,
            ideal_downsample: ideal,
            upsampled,
        })
    }
}

/// Rescale a base-resolution region into `tier` pixel space.
///
/// The rectangle is clipped to the tier in continuous coordinates before
/// rounding, so any region that overlaps the image keeps at least one pixel.
pub fn scale_to_tier(region: &Region, tier: &PyramidTier) -> Result<Region, PyramidError> {
    let base = region.to_base();
    let d = tier.downsample;

    let out_of_bounds = || PyramidError::OutOfBounds {
        level: tier.level,
        left: base.left,
        top: base.top,
        width: base.width,
        height: base.height,
    };

    let (left, width) =
        scale_axis(base.left, base.width, d, tier.width).ok_or_else(out_of_bounds)?;
    let (top, height) =
        scale_axis(base.top, base.height, d, tier.height).ok_or_else(out_of_bounds)?;

    Region::with_downsample(left, top, width, height, d)
}

/// Map `[start, start + len)` onto a tier axis of `extent` pixels.
///
/// Returns `(start, len)` in tier pixels, or `None` when nothing is left.
fn scale_axis(start: u32, len: u32, downsample: f64, extent: u32) -> Option<(u32, u32)> {
    let lo = (start as f64 / downsample).max(0.0);
    let hi = ((start as f64 + len as f64) / downsample).min(extent as f64);
    if hi <= lo {
        return None;
    }

    let mut first = lo.round() as u32;
    let mut last = hi.round() as u32;
    if last <= first {
        first = (lo.floor() as u32).min(extent - 1);
        last = first + 1;
    }
    Some((first, last - first))
}
