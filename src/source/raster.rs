//! Raster helpers: blank canvases, stitching, exact resizing and JPEG encoding.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage};

use crate::error::ReadError;
use crate::geometry::Size;

/// Decoded pixels.
pub type Raster = DynamicImage;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// A zeroed raster with the given color layout.
///
/// Float and unusual layouts fall back to 8-bit RGBA.
pub fn blank_raster(color: ColorType, size: Size) -> Raster {
    let (w, h) = (size.width, size.height);
    match color {
        ColorType::L8 => DynamicImage::new_luma8(w, h),
        ColorType::La8 => DynamicImage::new_luma_a8(w, h),
        ColorType::Rgb8 => DynamicImage::new_rgb8(w, h),
        ColorType::L16 => DynamicImage::new_luma16(w, h),
        ColorType::La16 => DynamicImage::new_luma_a16(w, h),
        ColorType::Rgb16 => DynamicImage::new_rgb16(w, h),
        ColorType::Rgba16 => DynamicImage::new_rgba16(w, h),
        _ => DynamicImage::new_rgba8(w, h),
    }
}

/// Copy `tile` onto `canvas` with its top-left corner at `(x, y)`.
///
/// Negative or overflowing offsets are clipped. The tile is converted to
/// the canvas layout first so 16-bit canvases keep full precision.
pub fn paste(canvas: &mut Raster, tile: &Raster, x: i64, y: i64) {
    match canvas {
        DynamicImage::ImageLuma8(c) => imageops::replace(c, &tile.to_luma8(), x, y),
        DynamicImage::ImageLumaA8(c) => imageops::replace(c, &tile.to_luma_alpha8(), x, y),
        DynamicImage::ImageRgb8(c) => imageops::replace(c, &tile.to_rgb8(), x, y),
        DynamicImage::ImageRgba8(c) => imageops::replace(c, &tile.to_rgba8(), x, y),
        DynamicImage::ImageLuma16(c) => imageops::replace(c, &tile.to_luma16(), x, y),
        DynamicImage::ImageLumaA16(c) => imageops::replace(c, &tile.to_luma_alpha16(), x, y),
        DynamicImage::ImageRgb16(c) => imageops::replace(c, &tile.to_rgb16(), x, y),
        DynamicImage::ImageRgba16(c) => imageops::replace(c, &tile.to_rgba16(), x, y),
        other => imageops::replace(other, tile, x, y),
    }
}

/// Stretch a raster to exactly `size`. No-op when it already matches.
pub fn resize_to(raster: Raster, size: Size, filter: FilterType) -> Raster {
    if raster.width() == size.width && raster.height() == size.height {
        return raster;
    }
    raster.resize_exact(size.width, size.height, filter)
}

/// Encode a raster as baseline JPEG.
///
/// JPEG carries only grayscale or RGB, so other layouts are converted.
pub fn encode_jpeg(raster: &Raster, quality: u8) -> Result<Bytes, ReadError> {
    let quality = quality.clamp(1, 100);

    let converted;
    let image = match raster.color() {
        ColorType::L8 | ColorType::Rgb8 => raster,
        ColorType::L16 | ColorType::La8 | ColorType::La16 => {
            converted = DynamicImage::ImageLuma8(raster.to_luma8());
            &converted
        }
        _ => {
            converted = DynamicImage::ImageRgb8(raster.to_rgb8());
            &converted
        }
    };

    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| ReadError::Encode(e.to_string()))?;

    Ok(Bytes::from(output))
}
