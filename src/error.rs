use thiserror::Error;

use crate::source::AssociatedKind;

/// Errors from the pixel-decoding source behind a slide.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Tile, associated image, or slide does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying read failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Bytes were read but could not be decoded into pixels
    #[error("Decode error: {0}")]
    Decode(String),

    /// Directory manifest is missing or malformed
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Errors raised by pyramid construction, lookup and region mapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PyramidError {
    /// Zero width, height or tile dimension
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Level lookup out of range
    #[error("Level {level} not found (pyramid has {levels} levels)")]
    NotFound { level: usize, levels: usize },

    /// Region has zero area once mapped and clamped to a tier
    #[error("Region {left},{top} {width}x{height} is outside level {level}")]
    OutOfBounds {
        level: usize,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },

    /// Width- and height-derived downsample ratios disagree
    #[error(
        "Inconsistent downsample at level {level}: width ratio {width_ratio:.4}, height ratio {height_ratio:.4}"
    )]
    InconsistentDownsample {
        level: usize,
        width_ratio: f64,
        height_ratio: f64,
    },

    /// Tier is larger than the one inserted before it
    #[error("Level {level} is larger than the level before it")]
    OutOfOrder { level: usize },

    /// Operation needs at least one tier
    #[error("Pyramid has no levels")]
    Empty,
}

impl PyramidError {
    pub(crate) fn invalid_geometry(message: impl Into<String>) -> Self {
        PyramidError::InvalidGeometry {
            message: message.into(),
        }
    }
}

/// Fatal failures while building image metadata.
///
/// Optional fields never produce these; they are left unset instead.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// A field the rest of the stack cannot work without
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors returned by the region reader.
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("Pyramid error: {0}")]
    Pyramid(#[from] PyramidError),

    /// A tile or associated image fetch failed; the whole read is abandoned
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The slide has no label or macro image
    #[error("Associated image '{kind}' is not available")]
    NotAvailable { kind: AssociatedKind },

    #[error("Encode error: {0}")]
    Encode(String),
}

/// Errors that can occur when opening a slide handle.
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Pyramid error: {0}")]
    Pyramid(#[from] PyramidError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// The format checker rejected the location
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}
