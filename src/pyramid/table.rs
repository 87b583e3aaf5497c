//! Ordered table of pyramid tiers.
//!
//! Tiers are appended in the order the pixel source reports its levels
//! (finest first). The table never sorts; it rejects a tier that is larger
//! than the previous one and checks that each tier scales uniformly
//! relative to level 0.

use serde::Serialize;

use crate::error::PyramidError;
use crate::geometry::Size;

use super::tier::PyramidTier;

/// Maximum relative divergence between width- and height-derived
/// downsample ratios.
pub const DOWNSAMPLE_TOLERANCE: f64 = 0.01;

/// Multi-resolution tier table for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pyramid {
    tiers: Vec<PyramidTier>,
}

impl Pyramid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier at the next level index.
    ///
    /// The first tier inserted becomes level 0 with downsample exactly 1.
    pub fn insert_tier(
        &mut self,
        width: u32,
        height: u32,
        tile_size: impl Into<Size>,
    ) -> Result<&PyramidTier, PyramidError> {
        let tile_size = tile_size.into();
        let level = self.tiers.len();

        if width == 0 || height == 0 {
            return Err(PyramidError::invalid_geometry(format!(
                "level {} size must be positive, got {}x{}",
                level, width, height
            )));
        }
        if tile_size.is_empty() {
            return Err(PyramidError::invalid_geometry(format!(
                "level {} tile size must be positive, got {}x{}",
                level, tile_size.width, tile_size.height
            )));
        }

        if let Some(previous) = self.tiers.last() {
            if width > previous.width || height > previous.height {
                return Err(PyramidError::OutOfOrder { level });
            }
        }

        let (downsample, height_downsample) = match self.tiers.first() {
            None => (1.0, 1.0),
            Some(base) => {
                let width_ratio = base.width as f64 / width as f64;
                let height_ratio = base.height as f64 / height as f64;
                check_uniform_scaling(level, base.height, height, width_ratio, height_ratio)?;
                (width_ratio, height_ratio)
            }
        };

        self.tiers.push(PyramidTier {
            level,
            width,
            height,
            tile_width: tile_size.width,
            tile_height: tile_size.height,
            downsample,
            height_downsample,
        });

        Ok(&self.tiers[level])
    }

    /// Get the tier at `level`.
    pub fn get_level(&self, level: usize) -> Result<&PyramidTier, PyramidError> {
        self.tiers.get(level).ok_or(PyramidError::NotFound {
            level,
            levels: self.tiers.len(),
        })
    }

    /// Level 0.
    pub fn base(&self) -> Result<&PyramidTier, PyramidError> {
        self.tiers.first().ok_or(PyramidError::Empty)
    }

    /// The lowest-resolution tier.
    pub fn coarsest(&self) -> Result<&PyramidTier, PyramidError> {
        self.tiers.last().ok_or(PyramidError::Empty)
    }

    /// Highest valid level index.
    pub fn max_level(&self) -> Option<usize> {
        self.tiers.len().checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// All tiers in level order.
    pub fn tiers(&self) -> &[PyramidTier] {
        &self.tiers
    }

    /// Tier whose downsample is nearest to `downsample`; ties favor the
    /// finer level.
    pub fn level_for_downsample(&self, downsample: f64) -> Result<&PyramidTier, PyramidError> {
        let mut best: Option<&PyramidTier> = None;
        for tier in &self.tiers {
            let distance = (tier.downsample - downsample).abs();
            match best {
                Some(current) if (current.downsample - downsample).abs() <= distance => {}
                _ => best = Some(tier),
            }
        }
        best.ok_or(PyramidError::Empty)
    }
}

/// Reject a tier whose two axes scale differently.
///
/// A divergence that comes from the source rounding the tier height to an
/// integer is not an inconsistency: the height must land less than one
/// pixel from the base height scaled by the width ratio.
fn check_uniform_scaling(
    level: usize,
    base_height: u32,
    height: u32,
    width_ratio: f64,
    height_ratio: f64,
) -> Result<(), PyramidError> {
    let divergence = (width_ratio - height_ratio).abs() / width_ratio.max(height_ratio);
    if divergence <= DOWNSAMPLE_TOLERANCE {
        return Ok(());
    }

    let expected_height = base_height as f64 / width_ratio;
    if (expected_height - height as f64).abs() < 1.0 {
        return Ok(());
    }

    Err(PyramidError::InconsistentDownsample {
        level,
        width_ratio,
        height_ratio,
    })
}
