//! Format detection for slide locations.
//!
//! The only format recognized today is the tile directory: a directory whose
//! `manifest.json` parses and declares at least one level. Anything else is
//! rejected with [`SlideError::UnsupportedFormat`].

use std::path::Path;

use crate::error::SlideError;
use crate::source::{Manifest, MANIFEST_FILE};

use super::Checker;

// =============================================================================
// SlideFormat
// =============================================================================

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
    /// Directory of pre-cut tiles described by a JSON manifest
    TileDirectory,
}

impl SlideFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::TileDirectory => "Tile Directory",
        }
    }
}

// =============================================================================
// Format Detection
// =============================================================================

/// Detect the format of a slide location.
///
/// # Errors
///
/// `SlideError::UnsupportedFormat` when the location is not a directory or
/// its manifest is missing or unusable.
pub async fn detect_format(path: &Path) -> Result<SlideFormat, SlideError> {
    let is_dir = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(unsupported(format!("{} is not a directory", path.display())));
    }

    let json = tokio::fs::read_to_string(path.join(MANIFEST_FILE))
        .await
        .map_err(|e| unsupported(format!("cannot read {}: {}", MANIFEST_FILE, e)))?;
    check_manifest(&json).map_err(unsupported)?;

    Ok(SlideFormat::TileDirectory)
}

fn check_manifest(json: &str) -> Result<(), String> {
    Manifest::from_json(json).map(|_| ()).map_err(|e| e.to_string())
}

fn unsupported(reason: String) -> SlideError {
    SlideError::UnsupportedFormat { reason }
}

// =============================================================================
// DirectoryChecker
// =============================================================================

/// [`Checker`] for tile directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryChecker;

impl Checker for DirectoryChecker {
    fn name(&self) -> &'static str {
        SlideFormat::TileDirectory.name()
    }

    fn matches(&self, path: &Path) -> bool {
        path.is_dir()
            && std::fs::read_to_string(path.join(MANIFEST_FILE))
                .map(|json| check_manifest(&json).is_ok())
                .unwrap_or(false)
    }
}

// =============================================================================
// Tests
// =============================================================================
