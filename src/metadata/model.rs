//! Canonical image metadata consumed by the rest of the serving stack.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

// =============================================================================
// Physical quantities
// =============================================================================

/// Unit of a physical length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Micrometer,
    Millimeter,
}

impl LengthUnit {
    /// Size of one unit in micrometers.
    const fn micrometers(&self) -> f64 {
        match self {
            LengthUnit::Micrometer => 1.0,
            LengthUnit::Millimeter => 1000.0,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Micrometer => "µm",
            LengthUnit::Millimeter => "mm",
        }
    }
}

/// A length tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalLength {
    pub value: f64,
    pub unit: LengthUnit,
}

impl PhysicalLength {
    pub const fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub const fn micrometers(value: f64) -> Self {
        Self::new(value, LengthUnit::Micrometer)
    }

    pub const fn millimeters(value: f64) -> Self {
        Self::new(value, LengthUnit::Millimeter)
    }

    /// Same length expressed in `unit`.
    pub fn to(&self, unit: LengthUnit) -> Self {
        Self::new(self.value * self.unit.micrometers() / unit.micrometers(), unit)
    }

    pub fn as_micrometers(&self) -> f64 {
        self.to(LengthUnit::Micrometer).value
    }

    pub fn as_millimeters(&self) -> f64 {
        self.to(LengthUnit::Millimeter).value
    }
}

impl fmt::Display for PhysicalLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

// =============================================================================
// Channels
// =============================================================================

/// Role suggested for a logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    Red,
    Green,
    Blue,
    Luminance,
}

impl ChannelRole {
    pub const fn suggested_name(&self) -> &'static str {
        match self {
            ChannelRole::Red => "R",
            ChannelRole::Green => "G",
            ChannelRole::Blue => "B",
            ChannelRole::Luminance => "L",
        }
    }
}

/// One logical channel of the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageChannel {
    pub index: usize,
    pub role: ChannelRole,

    /// Number of source samples this channel covers
    pub n_samples: u16,
}

impl ImageChannel {
    pub fn suggested_name(&self) -> &'static str {
        self.role.suggested_name()
    }
}

/// Bit depth of stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    U8,
    U16,
    U32,
}

impl PixelType {
    pub fn from_significant_bits(bits: u16) -> Self {
        match bits {
            0..=8 => PixelType::U8,
            9..=16 => PixelType::U16,
            _ => PixelType::U32,
        }
    }
}

// =============================================================================
// ImageMetadata
// =============================================================================

/// Size and layout of an associated (label / macro) image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssociatedImageInfo {
    pub width: u32,
    pub height: u32,
    pub n_channels: u16,
}

/// Normalized description of one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetadata {
    /// Base (level 0) width in pixels
    pub width: u32,

    /// Base (level 0) height in pixels
    pub height: u32,

    pub significant_bits: u16,
    pub pixel_type: PixelType,

    /// Logical channel count; always equals `channels.len()`
    pub n_channels: usize,

    /// Samples per pixel delivered by a read
    pub n_samples_per_pixel: u16,

    pub channels: Vec<ImageChannel>,

    pub physical_size_x: Option<PhysicalLength>,
    pub physical_size_y: Option<PhysicalLength>,
    pub physical_size_z: Option<PhysicalLength>,

    pub acquired_at: Option<NaiveDateTime>,
    pub objective_magnification: Option<f64>,
    pub microscope_model: Option<String>,

    pub associated_label: Option<AssociatedImageInfo>,
    pub associated_macro: Option<AssociatedImageInfo>,
}
