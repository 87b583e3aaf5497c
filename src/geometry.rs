//! Integer geometry primitives.
//!
//! Regions carry the downsample of the coordinate space they are expressed
//! in: 1.0 for base (level 0) coordinates, the tier's downsample once a
//! region has been mapped onto a coarser tier.

use serde::{Deserialize, Serialize};

use crate::error::PyramidError;

// =============================================================================
// Size / Point
// =============================================================================

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when both dimensions are at least those of `other`.
    pub fn covers(&self, other: Size) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// A pixel offset. Only negative as an intermediate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Offset of `self` relative to `origin`.
    pub fn offset_from(&self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

// =============================================================================
// Region
// =============================================================================

/// A rectangle in some coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,

    /// Downsample of the coordinate space relative to level 0
    pub downsample: f64,
}

impl Region {
    /// Create a region in base (level 0) coordinates.
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Result<Self, PyramidError> {
        Self::with_downsample(left, top, width, height, 1.0)
    }

    /// Create a region in the coordinate space of a given downsample.
    pub fn with_downsample(
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        downsample: f64,
    ) -> Result<Self, PyramidError> {
        if width == 0 || height == 0 {
            return Err(PyramidError::invalid_geometry(format!(
                "region size must be positive, got {}x{}",
                width, height
            )));
        }
        if !(downsample.is_finite() && downsample > 0.0) {
            return Err(PyramidError::invalid_geometry(format!(
                "region downsample must be positive, got {}",
                downsample
            )));
        }
        Ok(Self {
            left,
            top,
            width,
            height,
            downsample,
        })
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left as i64, self.top as i64)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn area(&self) -> u64 {
        self.size().area()
    }

    /// True when the region overlaps an image of the given size.
    pub fn intersects(&self, bounds: Size) -> bool {
        (self.left as u64) < bounds.width as u64 && (self.top as u64) < bounds.height as u64
    }

    /// Divide every coordinate by `factor`, rounding to nearest.
    ///
    /// Dimensions never drop below one pixel.
    pub fn scale(&self, factor: f64) -> Result<Self, PyramidError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(PyramidError::invalid_geometry(format!(
                "scale factor must be positive, got {}",
                factor
            )));
        }
        let div = |v: u32| (v as f64 / factor).round() as u32;
        Ok(Self {
            left: div(self.left),
            top: div(self.top),
            width: div(self.width).max(1),
            height: div(self.height).max(1),
            downsample: self.downsample * factor,
        })
    }

    /// Map the region back to base (level 0) coordinates.
    pub fn to_base(&self) -> Self {
        let mul = |v: u32| (v as f64 * self.downsample).round() as u32;
        Self {
            left: mul(self.left),
            top: mul(self.top),
            width: mul(self.width).max(1),
            height: mul(self.height).max(1),
            downsample: 1.0,
        }
    }
}
