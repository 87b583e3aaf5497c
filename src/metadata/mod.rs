//! Image metadata normalization.
//!
//! Sources describe themselves through a free-form [`TagDictionary`]; this
//! module maps that onto one canonical [`ImageMetadata`] shape and keeps
//! every original scalar in a flat [`RawTagStore`].
//!
//! [`TagDictionary`]: crate::source::TagDictionary

mod model;
mod normalizer;
mod raw;

pub use model::{
    AssociatedImageInfo, ChannelRole, ImageChannel, ImageMetadata, LengthUnit, PhysicalLength,
    PixelType,
};
pub use normalizer::{
    channels_for, collect_raw_tags, normalize_metadata, parse_acquisition_datetime,
    DEFAULT_SIGNIFICANT_BITS, DEFAULT_TAG_NAMESPACE,
};
pub use raw::{RawTagStore, RawValue};
