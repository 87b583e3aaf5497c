//! Slide Registry for managing handle lifecycle and caching.
//!
//! The registry provides:
//! - LRU caching of opened handles so a slide's pyramid and metadata are
//!   parsed once
//! - Singleflight to prevent duplicate opens for the same slide
//! - Format detection when opening slides from a directory root
//!
//! # Example
//!
//! ```ignore
//! use wsi_pyramid::slide::{DirectoryOpener, SlideRegistry};
//!
//! let registry = SlideRegistry::new(DirectoryOpener::new("/data/slides"));
//!
//! // Opens and caches on first access
//! let slide = registry.get_slide("case-001").await?;
//! let tile = slide.reader().read_tile(TileSpec::new(0, 0, 0)).await?;
//! ```

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::error::SlideError;
use crate::format::detect_format;
use crate::source::{DirectorySource, PixelSource};

use super::handle::ImageSource;

// =============================================================================
// Configuration
// =============================================================================

/// Default capacity for the handle cache (number of slides).
pub const DEFAULT_SLIDE_CACHE_CAPACITY: usize = 100;

// =============================================================================
// SlideOpener Trait
// =============================================================================

/// Creates pixel sources from slide identifiers.
#[async_trait]
pub trait SlideOpener: Send + Sync {
    /// The type of pixel source this opener creates.
    type Source: PixelSource + 'static;

    /// Open the pixel source for `slide_id`.
    async fn open_source(&self, slide_id: &str) -> Result<Self::Source, SlideError>;
}

/// Opens tile directories below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryOpener {
    root: PathBuf,
}

impl DirectoryOpener {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a slide id to a directory below the root.
    ///
    /// Ids must be relative and may not climb out of the root.
    pub fn resolve(&self, slide_id: &str) -> Result<PathBuf, SlideError> {
        let relative = Path::new(slide_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if slide_id.is_empty() || escapes {
            return Err(SlideError::UnsupportedFormat {
                reason: format!("invalid slide id '{}'", slide_id),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SlideOpener for DirectoryOpener {
    type Source = DirectorySource;

    async fn open_source(&self, slide_id: &str) -> Result<Self::Source, SlideError> {
        let path = self.resolve(slide_id)?;
        let format = detect_format(&path).await?;
        debug!(slide_id, format = format.name(), "Detected slide format");
        Ok(DirectorySource::open(path).await?)
    }
}

// =============================================================================
// SlideRegistry
// =============================================================================

/// Registry for managing opened slide handles.
///
/// The registry:
/// - Caches handles with LRU eviction
/// - Opens slides on demand through its [`SlideOpener`]
/// - Uses singleflight so concurrent requests share one open
pub struct SlideRegistry<O: SlideOpener> {
    /// The opener for creating pixel sources
    opener: O,

    /// Cached handles indexed by slide ID
    cache: RwLock<LruCache<String, Arc<ImageSource<O::Source>>>>,

    /// In-flight opens for singleflight pattern
    in_flight: InFlightMap<O::Source>,
}

type OpenResult<S> = Result<Arc<ImageSource<S>>, SlideError>;

type InFlightMap<S> = Mutex<HashMap<String, Arc<InFlightState<S>>>>;

/// Progress of an in-flight open as seen by waiters.
enum Outcome<S: PixelSource + 'static> {
    Pending,
    Done(OpenResult<S>),
    /// The leader was dropped before finishing
    Abandoned,
}

/// State for an in-flight slide open operation.
struct InFlightState<S: PixelSource + 'static> {
    /// Notification for waiters
    notify: Notify,
    outcome: Mutex<Outcome<S>>,
}

impl<S: PixelSource + 'static> InFlightState<S> {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            outcome: Mutex::new(Outcome::Pending),
        }
    }

    fn outcome(&self) -> Outcome<S> {
        match &*lock(&self.outcome) {
            Outcome::Pending => Outcome::Pending,
            Outcome::Done(result) => Outcome::Done(result.clone()),
            Outcome::Abandoned => Outcome::Abandoned,
        }
    }
}

/// Held by the leader for the duration of an open.
///
/// Dropping it, whether the open finished or the leader's future was
/// cancelled, unregisters the open and wakes every waiter.
struct InFlightGuard<'a, S: PixelSource + 'static> {
    in_flight: &'a InFlightMap<S>,
    slide_id: &'a str,
    state: Arc<InFlightState<S>>,
}

impl<S: PixelSource + 'static> InFlightGuard<'_, S> {
    fn finish(self, result: OpenResult<S>) {
        *lock(&self.state.outcome) = Outcome::Done(result);
    }
}

impl<S: PixelSource + 'static> Drop for InFlightGuard<'_, S> {
    fn drop(&mut self) {
        {
            let mut outcome = lock(&self.state.outcome);
            if matches!(*outcome, Outcome::Pending) {
                *outcome = Outcome::Abandoned;
            }
        }
        {
            let mut in_flight = lock(self.in_flight);
            if in_flight
                .get(self.slide_id)
                .is_some_and(|state| Arc::ptr_eq(state, &self.state))
            {
                in_flight.remove(self.slide_id);
            }
        }
        self.state.notify.notify_waiters();
    }
}

/// Lock a std mutex, ignoring poisoning. No guard is held across an await.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<O: SlideOpener> SlideRegistry<O> {
    /// Create a new SlideRegistry holding up to
    /// [`DEFAULT_SLIDE_CACHE_CAPACITY`] slides.
    pub fn new(opener: O) -> Self {
        Self::with_capacity(opener, DEFAULT_SLIDE_CACHE_CAPACITY)
    }

    /// Create a new SlideRegistry with a custom cache capacity.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(opener: O, capacity: usize) -> Self {
        Self {
            opener,
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Get a slide, opening it if not already cached.
    ///
    /// Concurrent calls for the same id wait on a single open and all
    /// receive its result, success or failure. Failures are not cached.
    /// If the caller leading an open is cancelled, one of the waiters takes
    /// over.
    pub async fn get_slide(&self, slide_id: &str) -> OpenResult<O::Source> {
        // Fast path: check cache
        {
            let mut cache = self.cache.write().await;
            if let Some(slide) = cache.get(slide_id) {
                return Ok(slide.clone());
            }
        }

        // Slow path: check in_flight or become leader
        loop {
            let (state, leader) = {
                let mut in_flight = lock(&self.in_flight);
                match in_flight.get(slide_id) {
                    // Another task is opening this slide
                    Some(state) => (state.clone(), false),
                    None => {
                        let state = Arc::new(InFlightState::new());
                        in_flight.insert(slide_id.to_string(), state.clone());
                        (state, true)
                    }
                }
            };

            if leader {
                return self.lead_open(slide_id, state).await;
            }

            // Register interest before checking, so a leader finishing in
            // between cannot be missed
            let notified = state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match state.outcome() {
                Outcome::Done(result) => return result,
                Outcome::Abandoned => continue,
                Outcome::Pending => {}
            }

            notified.await;

            if let Outcome::Done(result) = state.outcome() {
                return result;
            }
        }
    }

    /// Open a slide as the single-flight leader.
    async fn lead_open(
        &self,
        slide_id: &str,
        state: Arc<InFlightState<O::Source>>,
    ) -> OpenResult<O::Source> {
        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            slide_id,
            state,
        };

        let result = self.open_slide_internal(slide_id).await;
        if let Ok(ref slide) = result {
            let mut cache = self.cache.write().await;
            cache.put(slide_id.to_string(), slide.clone());
        }

        guard.finish(result.clone());
        result
    }

    /// Open a slide without caching (internal implementation).
    async fn open_slide_internal(&self, slide_id: &str) -> OpenResult<O::Source> {
        debug!(slide_id, "Opening slide");
        let source = self.opener.open_source(slide_id).await?;
        Ok(Arc::new(ImageSource::open(Arc::new(source))?))
    }

    /// Remove a slide from the cache.
    pub async fn invalidate(&self, slide_id: &str) {
        let mut cache = self.cache.write().await;
        cache.pop(slide_id);
    }

    /// Clear all cached slides.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    /// Get the number of cached slides.
    pub async fn cached_count(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
