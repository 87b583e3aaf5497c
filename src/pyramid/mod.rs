//! Multi-resolution pyramid model.
//!
//! - [`Pyramid`] holds the tiers of one image in level order
//! - [`PyramidTier`] describes a single level and its tile grid
//! - [`Pyramid::most_appropriate_tier`] and [`scale_to_tier`] map a request
//!   in base coordinates onto one tier

mod selector;
mod table;
mod tier;

pub use selector::{ideal_downsample, scale_to_tier, TierSelection};
pub use table::{Pyramid, DOWNSAMPLE_TOLERANCE};
pub use tier::PyramidTier;
