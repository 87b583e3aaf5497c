//! Tile directories written to disk and read back.

use std::path::Path;
use std::sync::Arc;

use image::{ColorType, GenericImageView, Rgba};
use tempfile::TempDir;

use wsi_pyramid::metadata::RawValue;
use wsi_pyramid::{
    detect_format, AssociatedKind, Checker, DirectoryChecker, DirectorySource, ImageSource,
    LengthUnit, ReadError, Reader, Region, SlideError, SlideFormat, SourceError, TileSpec,
};

use super::test_utils::{gradient_manifest, gradient_pixel, write_tile_directory};

fn rgba(level: usize, x: u32, y: u32) -> Rgba<u8> {
    let p = gradient_pixel(level, x, y);
    Rgba([p[0], p[1], p[2], 255])
}

/// 600x400 and 300x200 levels with 256px tiles, plus a macro image.
fn slide_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_tile_directory(dir.path(), &gradient_manifest(&[(600, 400), (300, 200)], 256));
    dir
}

async fn open(path: &Path) -> ImageSource<DirectorySource> {
    let source = DirectorySource::open(path).await.unwrap();
    ImageSource::open(Arc::new(source)).unwrap()
}

#[tokio::test]
async fn test_detects_tile_directory() {
    let dir = slide_dir();

    assert_eq!(
        detect_format(dir.path()).await.unwrap(),
        SlideFormat::TileDirectory
    );
    assert!(DirectoryChecker.matches(dir.path()));
    assert!(!DirectoryChecker.matches(&dir.path().join("0")));
}

#[tokio::test]
async fn test_metadata_from_manifest() {
    let dir = slide_dir();
    let slide = open(dir.path()).await;
    let metadata = slide.metadata();

    assert_eq!((metadata.width, metadata.height), (600, 400));
    assert_eq!(metadata.n_channels, 3);
    let spacing = metadata.physical_size_x.unwrap();
    assert_eq!(spacing.unit, LengthUnit::Micrometer);
    assert_eq!(spacing.value, 0.25);
    assert_eq!(metadata.microscope_model.as_deref(), Some("Mock Scanner"));
    assert!(metadata.associated_label.is_none());
    assert_eq!(metadata.associated_macro.map(|m| m.width), Some(512));

    assert_eq!(
        slide.raw_tags().get("DICOM", "Device Serial Number"),
        Some(&RawValue::Text("SN-0001".to_string()))
    );
}

#[tokio::test]
async fn test_window_across_tile_files() {
    let dir = slide_dir();
    let slide = open(dir.path()).await;

    // Crosses the tile boundary at 256 on both axes
    let region = Region::new(200, 100, 300, 250).unwrap();
    let raster = slide.reader().read_window(&region, 300, 250).await.unwrap();
    assert_eq!(raster.dimensions(), (300, 250));

    for &(x, y) in &[(0, 0), (55, 155), (56, 156), (299, 249)] {
        assert_eq!(raster.get_pixel(x, y), rgba(0, 200 + x, 100 + y));
    }
}

#[tokio::test]
async fn test_window_served_from_coarser_level() {
    let dir = slide_dir();
    let slide = open(dir.path()).await;

    let region = Region::new(0, 0, 600, 400).unwrap();
    let raster = slide.reader().read_window(&region, 300, 200).await.unwrap();

    // Exactly level 1, no resampling
    assert_eq!(raster.dimensions(), (300, 200));
    assert_eq!(raster.get_pixel(0, 0), rgba(1, 0, 0));
    assert_eq!(raster.get_pixel(299, 199), rgba(1, 299, 199));
}

#[tokio::test]
async fn test_edge_tile_and_thumbnail() {
    let dir = slide_dir();
    let slide = open(dir.path()).await;
    let reader = slide.reader();

    let tile = reader.read_tile(TileSpec::new(1, 1, 0)).await.unwrap();
    assert_eq!(tile.dimensions(), (44, 200));
    assert_eq!(tile.get_pixel(43, 199), rgba(1, 299, 199));

    let thumb = reader.read_thumbnail(150, 100).await.unwrap();
    assert_eq!(thumb.dimensions(), (150, 100));
}

#[tokio::test]
async fn test_associated_images() {
    let dir = slide_dir();
    let slide = open(dir.path()).await;
    let reader = slide.reader();

    let macro_image = reader.read_associated(AssociatedKind::Macro).await.unwrap();
    assert_eq!(macro_image.dimensions(), (512, 384));
    assert_eq!(macro_image.color(), ColorType::Rgb8);
    assert_eq!(macro_image.get_pixel(10, 10), Rgba([200, 180, 220, 255]));

    assert!(matches!(
        reader.read_associated(AssociatedKind::Label).await,
        Err(ReadError::NotAvailable { .. })
    ));
}

#[tokio::test]
async fn test_missing_tile_file_fails_window() {
    let dir = slide_dir();
    std::fs::remove_file(dir.path().join("0").join("1_1.png")).unwrap();
    let slide = open(dir.path()).await;

    let region = Region::new(200, 200, 100, 100).unwrap();
    assert!(matches!(
        slide.reader().read_window(&region, 100, 100).await,
        Err(ReadError::Source(SourceError::NotFound(_)))
    ));

    // Tile (0, 0) is still there
    let region = Region::new(0, 0, 100, 100).unwrap();
    assert!(slide.reader().read_window(&region, 100, 100).await.is_ok());
}

#[tokio::test]
async fn test_corrupt_tile_is_decode_error() {
    let dir = slide_dir();
    std::fs::write(dir.path().join("0").join("0_0.png"), b"not a png").unwrap();
    let slide = open(dir.path()).await;

    assert!(matches!(
        slide.reader().read_tile(TileSpec::new(0, 0, 0)).await,
        Err(ReadError::Source(SourceError::Decode(_)))
    ));
}

#[tokio::test]
async fn test_unusable_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("manifest.json"), r#"{"levels": []}"#).unwrap();

    assert!(matches!(
        detect_format(dir.path()).await,
        Err(SlideError::UnsupportedFormat { .. })
    ));
    assert!(matches!(
        DirectorySource::open(dir.path()).await,
        Err(SourceError::InvalidManifest(_))
    ));
}
