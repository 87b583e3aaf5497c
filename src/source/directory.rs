//! Tile-directory pixel source.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/manifest.json
//! <root>/<level>/<tile_x>_<tile_y>.<ext>
//! <root>/<label file>        (optional)
//! <root>/<macro file>        (optional)
//! ```
//!
//! The manifest describes the pyramid geometry and carries the slide's tag
//! dictionary. Tile files are decoded with the `image` crate on the blocking
//! thread pool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SourceError;
use crate::geometry::Size;

use super::raster::Raster;
use super::tags::TagDictionary;
use super::{AssociatedKind, LevelReport, PixelSource};

/// Name of the manifest file at the root of a tile directory.
pub const MANIFEST_FILE: &str = "manifest.json";

fn default_samples_per_pixel() -> u16 {
    3
}

fn default_tile_extension() -> String {
    "png".to_string()
}

// =============================================================================
// Manifest
// =============================================================================

/// One pyramid level as described in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManifestLevel {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

/// Pixel spacing in micrometers per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSpacing {
    pub x: f64,
    pub y: f64,
}

/// An associated image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestAssociated {
    pub file: String,
    pub width: u32,
    pub height: u32,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Levels, finest first
    pub levels: Vec<ManifestLevel>,

    #[serde(default = "default_samples_per_pixel")]
    pub samples_per_pixel: u16,

    #[serde(default = "default_tile_extension")]
    pub tile_extension: String,

    #[serde(default)]
    pub pixel_spacing: Option<PixelSpacing>,

    #[serde(default)]
    pub label: Option<ManifestAssociated>,

    #[serde(default, rename = "macro")]
    pub macro_image: Option<ManifestAssociated>,

    #[serde(default)]
    pub tags: TagDictionary,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| SourceError::InvalidManifest(e.to_string()))?;
        if manifest.levels.is_empty() {
            return Err(SourceError::InvalidManifest(
                "manifest declares no levels".to_string(),
            ));
        }
        Ok(manifest)
    }

    fn associated(&self, kind: AssociatedKind) -> Option<&ManifestAssociated> {
        match kind {
            AssociatedKind::Label => self.label.as_ref(),
            AssociatedKind::Macro => self.macro_image.as_ref(),
        }
    }
}

// =============================================================================
// DirectorySource
// =============================================================================

/// [`PixelSource`] over a directory of pre-cut tiles.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    identifier: String,
    manifest: Manifest,
    levels: Vec<LevelReport>,
}

impl DirectorySource {
    /// Open a tile directory by reading its manifest.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let root = root.into();
        let manifest_path = root.join(MANIFEST_FILE);
        let json = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| io_error(&manifest_path, e))?;
        let manifest = Manifest::from_json(&json)?;
        Ok(Self::from_manifest(root, manifest))
    }

    /// Build a source from an already-parsed manifest.
    pub fn from_manifest(root: impl Into<PathBuf>, manifest: Manifest) -> Self {
        let root = root.into();
        let levels = manifest
            .levels
            .iter()
            .map(|l| LevelReport {
                size: Size::new(l.width, l.height),
                tile_size: Size::new(l.tile_width, l.tile_height),
            })
            .collect();
        Self {
            identifier: format!("dir://{}", root.display()),
            root,
            manifest,
            levels,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Path of a tile file. Does not check that it exists.
    pub fn tile_path(&self, level: usize, tile_x: u32, tile_y: u32) -> PathBuf {
        self.root.join(level.to_string()).join(format!(
            "{}_{}.{}",
            tile_x, tile_y, self.manifest.tile_extension
        ))
    }

    async fn load(&self, path: PathBuf) -> Result<Raster, SourceError> {
        let bytes = tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| io_error(&path, e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Decoding image file");

        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| SourceError::Io(e.to_string()))?
            .map_err(|e| SourceError::Decode(format!("{}: {}", path.display(), e)))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> SourceError {
    if err.kind() == std::io::ErrorKind::NotFound {
        SourceError::NotFound(path.display().to_string())
    } else {
        SourceError::Io(format!("{}: {}", path.display(), err))
    }
}

#[async_trait]
impl PixelSource for DirectorySource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn levels(&self) -> &[LevelReport] {
        &self.levels
    }

    fn samples_per_pixel(&self) -> u16 {
        self.manifest.samples_per_pixel
    }

    fn pixel_spacing(&self) -> Option<(f64, f64)> {
        self.manifest.pixel_spacing.map(|s| (s.x, s.y))
    }

    fn tags(&self) -> &TagDictionary {
        &self.manifest.tags
    }

    fn associated_size(&self, kind: AssociatedKind) -> Option<Size> {
        self.manifest
            .associated(kind)
            .map(|a| Size::new(a.width, a.height))
    }

    async fn read_tile(
        &self,
        level: usize,
        tile_x: u32,
        tile_y: u32,
    ) -> Result<Raster, SourceError> {
        let report = self.levels.get(level).ok_or_else(|| {
            SourceError::NotFound(format!("{}: level {}", self.identifier, level))
        })?;
        let tiles_x = report.size.width.div_ceil(report.tile_size.width.max(1));
        let tiles_y = report.size.height.div_ceil(report.tile_size.height.max(1));
        if tile_x >= tiles_x || tile_y >= tiles_y {
            return Err(SourceError::NotFound(format!(
                "{}: tile ({}, {}) at level {}",
                self.identifier, tile_x, tile_y, level
            )));
        }

        self.load(self.tile_path(level, tile_x, tile_y)).await
    }

    async fn read_associated(&self, kind: AssociatedKind) -> Result<Raster, SourceError> {
        let entry = self.manifest.associated(kind).ok_or_else(|| {
            SourceError::NotFound(format!("{}: no {} image", self.identifier, kind))
        })?;
        self.load(self.root.join(&entry.file)).await
    }
}
