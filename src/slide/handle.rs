//! Opened image handle.

use std::sync::Arc;

use tracing::info;

use crate::error::SlideError;
use crate::format::{Parser, SourceParser};
use crate::metadata::{ImageMetadata, RawTagStore};
use crate::pyramid::Pyramid;
use crate::source::PixelSource;

use super::reader::{ReaderOptions, RegionReader};

/// A pixel source together with everything parsed from it.
///
/// The pyramid, metadata and raw tags are built once in [`ImageSource::open`]
/// and never change afterwards; share the handle behind an `Arc`.
pub struct ImageSource<P: PixelSource + ?Sized> {
    source: Arc<P>,
    pyramid: Pyramid,
    metadata: ImageMetadata,
    raw_tags: RawTagStore,
}

impl<P: PixelSource + ?Sized> ImageSource<P> {
    /// Parse a source into a handle.
    ///
    /// # Errors
    ///
    /// Fails when the reported levels do not form a valid pyramid or a
    /// required metadata field is missing.
    pub fn open(source: Arc<P>) -> Result<Self, SlideError> {
        let parser = SourceParser::new(source.as_ref());
        Self::open_with(source.clone(), &parser)
    }

    /// Build a handle with a specific parser.
    pub fn open_with<T: Parser + ?Sized>(source: Arc<P>, parser: &T) -> Result<Self, SlideError> {
        let pyramid = parser.parse_pyramid()?;
        let metadata = parser.parse_metadata()?;
        let raw_tags = parser.parse_raw_tags();

        info!(
            source = source.identifier(),
            levels = pyramid.len(),
            width = metadata.width,
            height = metadata.height,
            raw_tags = raw_tags.len(),
            "Opened image"
        );

        Ok(Self {
            source,
            pyramid,
            metadata,
            raw_tags,
        })
    }

    pub fn identifier(&self) -> &str {
        self.source.identifier()
    }

    pub fn source(&self) -> &Arc<P> {
        &self.source
    }

    pub fn pyramid(&self) -> &Pyramid {
        &self.pyramid
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn raw_tags(&self) -> &RawTagStore {
        &self.raw_tags
    }

    /// Reader with default options.
    pub fn reader(&self) -> RegionReader<'_, P> {
        self.reader_with(ReaderOptions::default())
    }

    pub fn reader_with(&self, options: ReaderOptions) -> RegionReader<'_, P> {
        RegionReader::new(self.source.as_ref(), &self.pyramid, options)
    }
}

impl<P: PixelSource + ?Sized> std::fmt::Debug for ImageSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSource")
            .field("identifier", &self.identifier())
            .field("levels", &self.pyramid.len())
            .field("width", &self.metadata.width)
            .field("height", &self.metadata.height)
            .finish()
    }
}
