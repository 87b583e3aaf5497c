//! Test utilities for integration tests.
//!
//! This module provides a mock pixel source with read tracking and helpers
//! for writing tile directories to disk.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use tokio::sync::RwLock;

use wsi_pyramid::error::SourceError;
use wsi_pyramid::source::{
    Manifest, ManifestAssociated, ManifestLevel, PixelSpacing, MANIFEST_FILE,
};
use wsi_pyramid::{AssociatedKind, LevelReport, PixelSource, Raster, Size, TagDictionary};

// =============================================================================
// Pixel content
// =============================================================================

/// Color of a tier-local pixel: x and y modulo 256, level in blue.
///
/// Every pixel of every tier is predictable, so stitched output can be
/// checked pixel by pixel.
pub fn gradient_pixel(level: usize, x: u32, y: u32) -> Rgb<u8> {
    Rgb([(x % 256) as u8, (y % 256) as u8, level as u8])
}

/// The tile at (tile_x, tile_y) of a level, clipped at the level edge.
pub fn gradient_tile(level: usize, report: LevelReport, tile_x: u32, tile_y: u32) -> RgbImage {
    let x0 = tile_x * report.tile_size.width;
    let y0 = tile_y * report.tile_size.height;
    let w = (report.size.width - x0).min(report.tile_size.width);
    let h = (report.size.height - y0).min(report.tile_size.height);
    RgbImage::from_fn(w, h, |x, y| gradient_pixel(level, x0 + x, y0 + y))
}

// =============================================================================
// Mock Pixel Source with Request Tracking
// =============================================================================

/// A mock pixel source that synthesizes gradient tiles and tracks reads.
pub struct MockPixelSource {
    identifier: String,
    levels: Vec<LevelReport>,
    samples_per_pixel: u16,
    pixel_spacing: Option<(f64, f64)>,
    tags: TagDictionary,
    label: Option<Size>,
    macro_size: Option<Size>,
    failing_tiles: HashSet<(usize, u32, u32)>,
    read_count: Arc<AtomicUsize>,
    reads: Arc<RwLock<Vec<(usize, u32, u32)>>>,
}

impl MockPixelSource {
    /// Source with the given `(width, height)` levels and square tiles.
    pub fn new(levels: &[(u32, u32)], tile: u32) -> Self {
        Self {
            identifier: "mock://slide".to_string(),
            levels: levels
                .iter()
                .map(|&(w, h)| LevelReport {
                    size: Size::new(w, h),
                    tile_size: Size::new(tile, tile),
                })
                .collect(),
            samples_per_pixel: 3,
            pixel_spacing: None,
            tags: TagDictionary::new(),
            label: None,
            macro_size: None,
            failing_tiles: HashSet::new(),
            read_count: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_samples_per_pixel(mut self, samples: u16) -> Self {
        self.samples_per_pixel = samples;
        self
    }

    pub fn with_pixel_spacing(mut self, x: f64, y: f64) -> Self {
        self.pixel_spacing = Some((x, y));
        self
    }

    pub fn with_tags(mut self, tags: TagDictionary) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_label(mut self, width: u32, height: u32) -> Self {
        self.label = Some(Size::new(width, height));
        self
    }

    pub fn with_macro(mut self, width: u32, height: u32) -> Self {
        self.macro_size = Some(Size::new(width, height));
        self
    }

    /// Make one tile fail with an I/O error.
    pub fn with_failing_tile(mut self, level: usize, tile_x: u32, tile_y: u32) -> Self {
        self.failing_tiles.insert((level, tile_x, tile_y));
        self
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Tiles read so far, sorted.
    pub async fn get_reads(&self) -> Vec<(usize, u32, u32)> {
        let mut reads = self.reads.read().await.clone();
        reads.sort_unstable();
        reads
    }

    pub async fn reset_tracking(&self) {
        self.read_count.store(0, Ordering::SeqCst);
        self.reads.write().await.clear();
    }
}

#[async_trait]
impl PixelSource for MockPixelSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn levels(&self) -> &[LevelReport] {
        &self.levels
    }

    fn samples_per_pixel(&self) -> u16 {
        self.samples_per_pixel
    }

    fn pixel_spacing(&self) -> Option<(f64, f64)> {
        self.pixel_spacing
    }

    fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    fn associated_size(&self, kind: AssociatedKind) -> Option<Size> {
        match kind {
            AssociatedKind::Label => self.label,
            AssociatedKind::Macro => self.macro_size,
        }
    }

    async fn read_tile(
        &self,
        level: usize,
        tile_x: u32,
        tile_y: u32,
    ) -> Result<Raster, SourceError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.reads.write().await.push((level, tile_x, tile_y));

        if self.failing_tiles.contains(&(level, tile_x, tile_y)) {
            return Err(SourceError::Io(format!(
                "{}: tile ({}, {}) at level {} is unreadable",
                self.identifier, tile_x, tile_y, level
            )));
        }

        let report = *self.levels.get(level).ok_or_else(|| {
            SourceError::NotFound(format!("{}: level {}", self.identifier, level))
        })?;
        Ok(DynamicImage::ImageRgb8(gradient_tile(
            level, report, tile_x, tile_y,
        )))
    }

    async fn read_associated(&self, kind: AssociatedKind) -> Result<Raster, SourceError> {
        let size = self.associated_size(kind).ok_or_else(|| {
            SourceError::NotFound(format!("{}: no {} image", self.identifier, kind))
        })?;
        // Associated images come back as RGBA to exercise normalization
        Ok(DynamicImage::new_rgba8(size.width, size.height))
    }
}

// =============================================================================
// Tile directories on disk
// =============================================================================

/// Manifest for a gradient slide with square tiles.
pub fn gradient_manifest(levels: &[(u32, u32)], tile: u32) -> Manifest {
    Manifest {
        levels: levels
            .iter()
            .map(|&(width, height)| ManifestLevel {
                width,
                height,
                tile_width: tile,
                tile_height: tile,
            })
            .collect(),
        samples_per_pixel: 3,
        tile_extension: "png".to_string(),
        pixel_spacing: Some(PixelSpacing { x: 0.25, y: 0.25 }),
        label: None,
        macro_image: Some(ManifestAssociated {
            file: "macro.png".to_string(),
            width: 512,
            height: 384,
        }),
        tags: TagDictionary::new()
            .with("Bits Stored", 8i64)
            .with("Manufacturer's Model Name", "Mock Scanner")
            .with("Device Serial Number", "SN-0001"),
    }
}

/// Write a manifest and every gradient tile it declares below `root`.
pub fn write_tile_directory(root: &Path, manifest: &Manifest) {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(
        root.join(MANIFEST_FILE),
        serde_json::to_string_pretty(manifest).unwrap(),
    )
    .unwrap();

    for (level, entry) in manifest.levels.iter().enumerate() {
        let report = LevelReport {
            size: Size::new(entry.width, entry.height),
            tile_size: Size::new(entry.tile_width, entry.tile_height),
        };
        let level_dir = root.join(level.to_string());
        std::fs::create_dir_all(&level_dir).unwrap();

        for tile_y in 0..entry.height.div_ceil(entry.tile_height) {
            for tile_x in 0..entry.width.div_ceil(entry.tile_width) {
                gradient_tile(level, report, tile_x, tile_y)
                    .save(level_dir.join(format!("{}_{}.png", tile_x, tile_y)))
                    .unwrap();
            }
        }
    }

    if let Some(ref macro_image) = manifest.macro_image {
        RgbImage::from_pixel(macro_image.width, macro_image.height, Rgb([200, 180, 220]))
            .save(root.join(&macro_image.file))
            .unwrap();
    }
}
