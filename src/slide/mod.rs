//! Slide abstraction layer.
//!
//! This module ties a pixel source to the pyramid and metadata parsed from
//! it, and serves reads against the result.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 Caller                  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SlideRegistry                │
//! │  (caches handles, single-flight open)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ImageSource                 │
//! │  (pyramid + metadata + raw tags)        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            RegionReader                 │
//! │  (tier selection, tile stitching)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             PixelSource                 │
//! └─────────────────────────────────────────┘
//! ```

mod handle;
mod reader;
mod registry;

pub use handle::ImageSource;
pub use reader::{ReaderOptions, RegionReader};
pub use registry::{DirectoryOpener, SlideOpener, SlideRegistry, DEFAULT_SLIDE_CACHE_CAPACITY};
