//! Metadata normalization and associated images through an opened handle.

use std::sync::Arc;

use chrono::NaiveDate;
use image::{ColorType, GenericImageView};

use wsi_pyramid::metadata::RawValue;
use wsi_pyramid::{
    AssociatedKind, ImageSource, LengthUnit, MetadataError, PixelType, ReadError, Reader,
    SlideError, TagDictionary,
};

use super::test_utils::MockPixelSource;

fn dicom_tags() -> TagDictionary {
    TagDictionary::new()
        .with("Bits Stored", 8i64)
        .with("Samples per Pixel", 3i64)
        .with("Acquisition DateTime", "20240102030405.25")
        .with("Manufacturer's Model Name", "Mock Scanner")
        .with("Device Serial Number", "SN-0001")
        .with("Software Versions", "4.2")
        .with(
            "Optical Path Sequence",
            vec![TagDictionary::new().with("Objective Lens Power", 20i64)],
        )
        .with(
            "Shared Functional Groups Sequence",
            vec![TagDictionary::new().with(
                "Pixel Measures Sequence",
                vec![TagDictionary::new()
                    .with("Spacing Between Slices", "0.0005")
                    .with("Pixel Spacing", "0.00025")],
            )],
        )
}

#[test]
fn test_rgb_slide_metadata() {
    let source = MockPixelSource::new(&[(40_000, 30_000), (10_000, 7_500)], 512)
        .with_pixel_spacing(0.25, 0.25)
        .with_tags(dicom_tags());
    let slide = ImageSource::open(Arc::new(source)).unwrap();
    let metadata = slide.metadata();

    assert_eq!((metadata.width, metadata.height), (40_000, 30_000));
    assert_eq!(metadata.significant_bits, 8);
    assert_eq!(metadata.pixel_type, PixelType::U8);

    assert_eq!(metadata.n_channels, 3);
    assert_eq!(metadata.channels.len(), metadata.n_channels);
    let names: Vec<_> = metadata.channels.iter().map(|c| c.suggested_name()).collect();
    assert_eq!(names, ["R", "G", "B"]);
    let indices: Vec<_> = metadata.channels.iter().map(|c| c.index).collect();
    assert_eq!(indices, [0, 1, 2]);

    let x = metadata.physical_size_x.unwrap();
    assert_eq!(x.unit, LengthUnit::Micrometer);
    assert_eq!(x.value, 0.25);
    let z = metadata.physical_size_z.unwrap();
    assert_eq!(z.unit, LengthUnit::Millimeter);
    assert!((z.as_micrometers() - 0.5).abs() < 1e-9);

    assert_eq!(
        metadata.acquired_at,
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 250)
    );
    assert_eq!(metadata.objective_magnification, Some(20.0));
    assert_eq!(metadata.microscope_model.as_deref(), Some("Mock Scanner"));
}

#[test]
fn test_single_sample_slide_is_luminance() {
    let source = MockPixelSource::new(&[(1024, 1024)], 256).with_samples_per_pixel(1);
    let slide = ImageSource::open(Arc::new(source)).unwrap();
    let metadata = slide.metadata();

    assert_eq!(metadata.n_channels, 1);
    assert_eq!(metadata.channels[0].index, 0);
    assert_eq!(metadata.channels[0].suggested_name(), "L");
    assert!(metadata.physical_size_x.is_none());
    assert!(metadata.acquired_at.is_none());
}

#[test]
fn test_zero_samples_fails_open() {
    let source = MockPixelSource::new(&[(1024, 1024)], 256).with_samples_per_pixel(0);
    assert!(matches!(
        ImageSource::open(Arc::new(source)),
        Err(SlideError::Metadata(MetadataError::MissingField(_)))
    ));
}

#[test]
fn test_raw_tags_flattened() {
    let source = MockPixelSource::new(&[(1024, 1024)], 256).with_tags(dicom_tags());
    let slide = ImageSource::open(Arc::new(source)).unwrap();
    let raw = slide.raw_tags();

    assert_eq!(
        raw.get("DICOM", "Device Serial Number"),
        Some(&RawValue::Text("SN-0001".to_string()))
    );
    assert_eq!(
        raw.get("DICOM", "Software Versions"),
        Some(&RawValue::Text("4.2".to_string()))
    );
    assert_eq!(
        raw.get("DICOM", "Optical Path Sequence[0].Objective Lens Power"),
        Some(&RawValue::Integer(20))
    );
    assert!(raw
        .get(
            "DICOM",
            "Shared Functional Groups Sequence[0].Pixel Measures Sequence[0].Pixel Spacing"
        )
        .is_some());
}

#[test]
fn test_metadata_serializes() {
    let source = MockPixelSource::new(&[(1024, 1024)], 256)
        .with_tags(dicom_tags())
        .with_macro(512, 384);
    let slide = ImageSource::open(Arc::new(source)).unwrap();

    let json = serde_json::to_value(slide.metadata()).unwrap();
    assert_eq!(json["width"], 1024);
    assert_eq!(json["pixel_type"], "u8");
    assert_eq!(json["channels"][0]["role"], "red");
    assert_eq!(json["physical_size_z"]["unit"], "millimeter");
    assert_eq!(json["associated_macro"]["width"], 512);
    assert!(json["associated_label"].is_null());
}

// =============================================================================
// Associated images
// =============================================================================

#[tokio::test]
async fn test_label_absent_macro_present() {
    let source = MockPixelSource::new(&[(1024, 1024)], 256).with_macro(512, 384);
    let slide = ImageSource::open(Arc::new(source)).unwrap();
    let reader = slide.reader();

    assert!(slide.metadata().associated_label.is_none());
    let info = slide.metadata().associated_macro.unwrap();
    assert_eq!((info.width, info.height, info.n_channels), (512, 384, 3));

    assert!(matches!(
        reader.read_associated(AssociatedKind::Label).await,
        Err(ReadError::NotAvailable {
            kind: AssociatedKind::Label
        })
    ));

    let macro_image = reader.read_associated(AssociatedKind::Macro).await.unwrap();
    assert_eq!(macro_image.dimensions(), (512, 384));
    assert_eq!(macro_image.color(), ColorType::Rgb8);
}

#[tokio::test]
async fn test_label_is_normalized_to_rgb() {
    let source = MockPixelSource::new(&[(1024, 1024)], 256).with_label(300, 100);
    let slide = ImageSource::open(Arc::new(source)).unwrap();

    let info = slide.metadata().associated_label.unwrap();
    assert_eq!((info.width, info.height), (300, 100));
    assert!(slide.metadata().associated_macro.is_none());

    // The source hands back RGBA
    let label = slide
        .reader()
        .read_associated(AssociatedKind::Label)
        .await
        .unwrap();
    assert_eq!(label.dimensions(), (300, 100));
    assert_eq!(label.color(), ColorType::Rgb8);
}
