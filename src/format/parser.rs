//! Parser over any [`PixelSource`].

use tracing::debug;

use crate::error::{MetadataError, PyramidError};
use crate::metadata::{
    collect_raw_tags, normalize_metadata, ImageMetadata, RawTagStore, DEFAULT_TAG_NAMESPACE,
};
use crate::pyramid::Pyramid;
use crate::source::PixelSource;

use super::Parser;

/// Builds the pyramid, metadata and raw tags from what a source reports.
pub struct SourceParser<'a, P: PixelSource + ?Sized> {
    source: &'a P,
    namespace: String,
}

impl<'a, P: PixelSource + ?Sized> SourceParser<'a, P> {
    pub fn new(source: &'a P) -> Self {
        Self::with_namespace(source, DEFAULT_TAG_NAMESPACE)
    }

    pub fn with_namespace(source: &'a P, namespace: impl Into<String>) -> Self {
        Self {
            source,
            namespace: namespace.into(),
        }
    }
}

impl<P: PixelSource + ?Sized> Parser for SourceParser<'_, P> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Insert every reported level, finest first, in report order.
    fn parse_pyramid(&self) -> Result<Pyramid, PyramidError> {
        let mut pyramid = Pyramid::new();
        for report in self.source.levels() {
            pyramid.insert_tier(report.size.width, report.size.height, report.tile_size)?;
        }
        if pyramid.is_empty() {
            return Err(PyramidError::Empty);
        }

        debug!(
            source = self.source.identifier(),
            levels = pyramid.len(),
            "Parsed pyramid"
        );
        Ok(pyramid)
    }

    fn parse_metadata(&self) -> Result<ImageMetadata, MetadataError> {
        normalize_metadata(self.source)
    }

    fn parse_raw_tags(&self) -> RawTagStore {
        collect_raw_tags(self.source.tags(), &self.namespace)
    }
}
