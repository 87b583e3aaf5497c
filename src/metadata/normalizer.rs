//! Tag dictionary → [`ImageMetadata`] mapping.
//!
//! Only the width, height and sample count are required. Every other field
//! is best effort: a missing or malformed tag leaves it unset and is logged.

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::error::MetadataError;
use crate::source::{AssociatedKind, PixelSource, TagDictionary, TagValue};

use super::model::{
    AssociatedImageInfo, ChannelRole, ImageChannel, ImageMetadata, PhysicalLength, PixelType,
};
use super::raw::RawTagStore;

/// Bit depth assumed when `Bits Stored` is absent.
pub const DEFAULT_SIGNIFICANT_BITS: u16 = 8;

/// Namespace used for raw tags unless a parser says otherwise.
pub const DEFAULT_TAG_NAMESPACE: &str = "DICOM";

/// Channel count reported for label and macro images.
const ASSOCIATED_CHANNELS: u16 = 3;

const BITS_STORED: &str = "Bits Stored";
const SAMPLES_PER_PIXEL: &str = "Samples per Pixel";
const ACQUISITION_DATETIME: &str = "Acquisition DateTime";
const MODEL_NAME: &str = "Manufacturer's Model Name";
const SHARED_GROUPS: &str = "Shared Functional Groups Sequence";
const PIXEL_MEASURES: &str = "Pixel Measures Sequence";
const SLICE_SPACING: &str = "Spacing Between Slices";
const OPTICAL_PATH: &str = "Optical Path Sequence";
const OBJECTIVE_POWER: &str = "Objective Lens Power";

// =============================================================================
// Entry points
// =============================================================================

/// Build the canonical metadata for a source.
pub fn normalize_metadata<P: PixelSource + ?Sized>(
    source: &P,
) -> Result<ImageMetadata, MetadataError> {
    let tags = source.tags();

    let base = source
        .levels()
        .first()
        .ok_or(MetadataError::MissingField("level 0 size"))?;

    let n_samples_per_pixel = samples_per_pixel(tags, source.samples_per_pixel());
    if n_samples_per_pixel == 0 {
        return Err(MetadataError::MissingField("samples per pixel"));
    }

    let significant_bits = significant_bits(tags);
    let channels = channels_for(n_samples_per_pixel);

    let (physical_size_x, physical_size_y) = match source.pixel_spacing() {
        Some((x, y)) => (
            positive(x).map(PhysicalLength::micrometers),
            positive(y).map(PhysicalLength::micrometers),
        ),
        None => {
            debug!(source = source.identifier(), "No pixel spacing reported");
            (None, None)
        }
    };

    let metadata = ImageMetadata {
        width: base.size.width,
        height: base.size.height,
        significant_bits,
        pixel_type: PixelType::from_significant_bits(significant_bits),
        n_channels: channels.len(),
        n_samples_per_pixel,
        channels,
        physical_size_x,
        physical_size_y,
        physical_size_z: slice_spacing(tags).map(PhysicalLength::millimeters),
        acquired_at: acquisition_datetime(tags),
        objective_magnification: objective_magnification(tags),
        microscope_model: tags
            .get(MODEL_NAME)
            .and_then(TagValue::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        associated_label: associated_info(source, AssociatedKind::Label),
        associated_macro: associated_info(source, AssociatedKind::Macro),
    };

    debug!(
        source = source.identifier(),
        width = metadata.width,
        height = metadata.height,
        channels = metadata.n_channels,
        samples = metadata.n_samples_per_pixel,
        "Normalized image metadata"
    );

    Ok(metadata)
}

/// Logical channels for a sample count.
///
/// Three samples are read as RGB; anything else collapses into a single
/// luminance channel covering every sample.
pub fn channels_for(samples_per_pixel: u16) -> Vec<ImageChannel> {
    if samples_per_pixel == 3 {
        [ChannelRole::Red, ChannelRole::Green, ChannelRole::Blue]
            .into_iter()
            .enumerate()
            .map(|(index, role)| ImageChannel {
                index,
                role,
                n_samples: 1,
            })
            .collect()
    } else {
        vec![ImageChannel {
            index: 0,
            role: ChannelRole::Luminance,
            n_samples: samples_per_pixel,
        }]
    }
}

/// Flatten every scalar tag into a raw tag store.
pub fn collect_raw_tags(tags: &TagDictionary, namespace: &str) -> RawTagStore {
    let mut store = RawTagStore::new();
    store.extend_from_tags(namespace, tags);
    store
}

/// Parse `YYYYMMDDHHMMSS[.fraction]`.
///
/// The fraction is read as decimal seconds and kept to nanosecond precision.
pub fn parse_acquisition_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };

    if whole.len() != 14 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let datetime = NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S").ok()?;

    match fraction {
        None => Some(datetime),
        Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => {
            let nanos: String = f.chars().chain(std::iter::repeat('0')).take(9).collect();
            datetime.with_nanosecond(nanos.parse().ok()?)
        }
        Some(_) => None,
    }
}

// =============================================================================
// Field extraction
// =============================================================================

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

fn significant_bits(tags: &TagDictionary) -> u16 {
    let Some(value) = tags.get(BITS_STORED) else {
        return DEFAULT_SIGNIFICANT_BITS;
    };
    match value
        .as_i64()
        .and_then(|v| u16::try_from(v).ok())
        .filter(|&v| v > 0)
    {
        Some(bits) => bits,
        None => {
            warn!(?value, "Unusable '{}' tag, assuming {} bits", BITS_STORED, DEFAULT_SIGNIFICANT_BITS);
            DEFAULT_SIGNIFICANT_BITS
        }
    }
}

fn samples_per_pixel(tags: &TagDictionary, reported: u16) -> u16 {
    let Some(value) = tags.get(SAMPLES_PER_PIXEL) else {
        return reported;
    };
    match value.as_i64().and_then(|v| u16::try_from(v).ok()) {
        Some(samples) => samples,
        None => {
            warn!(?value, reported, "Unusable '{}' tag, using source report", SAMPLES_PER_PIXEL);
            reported
        }
    }
}

fn slice_spacing(tags: &TagDictionary) -> Option<f64> {
    let value = tags
        .first_item(SHARED_GROUPS)
        .and_then(|group| group.first_item(PIXEL_MEASURES))
        .and_then(|measures| measures.get(SLICE_SPACING))?;
    let spacing = value.as_f64().and_then(positive);
    if spacing.is_none() {
        warn!(?value, "Ignoring unusable slice spacing");
    }
    spacing
}

fn acquisition_datetime(tags: &TagDictionary) -> Option<NaiveDateTime> {
    let value = tags.get(ACQUISITION_DATETIME)?;
    let text = match value {
        TagValue::Text(s) => s.clone(),
        TagValue::Integer(v) => v.to_string(),
        _ => String::new(),
    };
    let parsed = parse_acquisition_datetime(&text);
    if parsed.is_none() {
        warn!(?value, "Ignoring malformed acquisition datetime");
    }
    parsed
}

fn objective_magnification(tags: &TagDictionary) -> Option<f64> {
    let value = tags
        .first_item(OPTICAL_PATH)
        .and_then(|path| path.get(OBJECTIVE_POWER))?;
    let power = value.as_f64().and_then(positive);
    if power.is_none() {
        warn!(?value, "Ignoring unusable objective lens power");
    }
    power
}

fn associated_info<P: PixelSource + ?Sized>(
    source: &P,
    kind: AssociatedKind,
) -> Option<AssociatedImageInfo> {
    let size = source.associated_size(kind)?;
    Some(AssociatedImageInfo {
        width: size.width,
        height: size.height,
        n_channels: ASSOCIATED_CHANNELS,
    })
}
