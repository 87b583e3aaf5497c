//! Registry caching and single-flight behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::GenericImageView;

use wsi_pyramid::{
    DirectoryOpener, Reader, Region, SlideError, SlideOpener, SlideRegistry, SourceError,
};

use super::test_utils::{gradient_manifest, write_tile_directory, MockPixelSource};

/// Opener that builds mock sources and counts opens.
struct CountingOpener {
    opens: AtomicUsize,
    delay: Duration,
}

impl CountingOpener {
    fn new() -> Self {
        Self {
            opens: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlideOpener for CountingOpener {
    type Source = MockPixelSource;

    async fn open_source(&self, slide_id: &str) -> Result<Self::Source, SlideError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if slide_id.starts_with("missing") {
            return Err(SourceError::NotFound(slide_id.to_string()).into());
        }
        Ok(MockPixelSource::new(&[(2048, 2048), (512, 512)], 256)
            .with_identifier(format!("mock://{}", slide_id)))
    }
}

#[tokio::test]
async fn test_same_handle_returned_from_cache() {
    let registry = SlideRegistry::new(CountingOpener::new());

    let first = registry.get_slide("a").await.unwrap();
    let second = registry.get_slide("a").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.identifier(), "mock://a");
    assert_eq!(registry.opener().opens(), 1);
    assert_eq!(registry.cached_count().await, 1);
}

#[tokio::test]
async fn test_least_recently_used_slide_is_evicted() {
    let registry = SlideRegistry::with_capacity(CountingOpener::new(), 2);

    registry.get_slide("a").await.unwrap();
    registry.get_slide("b").await.unwrap();
    // Touch "a" so "b" becomes the eviction candidate
    registry.get_slide("a").await.unwrap();
    registry.get_slide("c").await.unwrap();
    assert_eq!(registry.cached_count().await, 2);
    assert_eq!(registry.opener().opens(), 3);

    registry.get_slide("a").await.unwrap();
    assert_eq!(registry.opener().opens(), 3);

    registry.get_slide("b").await.unwrap();
    assert_eq!(registry.opener().opens(), 4);
}

#[tokio::test]
async fn test_evicted_handle_stays_usable() {
    let registry = SlideRegistry::with_capacity(CountingOpener::new(), 1);

    let held = registry.get_slide("a").await.unwrap();
    registry.get_slide("b").await.unwrap();
    assert_eq!(registry.cached_count().await, 1);

    let region = Region::new(0, 0, 512, 512).unwrap();
    let raster = held.reader().read_window(&region, 64, 64).await.unwrap();
    assert_eq!(raster.dimensions(), (64, 64));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_open() {
    let registry = Arc::new(SlideRegistry::new(CountingOpener::with_delay(
        Duration::from_millis(50),
    )));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.get_slide("shared").await
        }));
    }

    let mut slides = Vec::new();
    for handle in handles {
        slides.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(registry.opener().opens(), 1);
    assert!(slides.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[tokio::test]
async fn test_failed_open_is_retried() {
    let registry = SlideRegistry::new(CountingOpener::new());

    assert!(matches!(
        registry.get_slide("missing-1").await,
        Err(SlideError::Source(SourceError::NotFound(_)))
    ));
    assert!(registry.get_slide("missing-1").await.is_err());

    assert_eq!(registry.opener().opens(), 2);
    assert_eq!(registry.cached_count().await, 0);
}

#[tokio::test]
async fn test_invalidate_forces_reopen() {
    let registry = SlideRegistry::new(CountingOpener::new());

    let before = registry.get_slide("a").await.unwrap();
    registry.invalidate("a").await;
    let after = registry.get_slide("a").await.unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(registry.opener().opens(), 2);
}

// =============================================================================
// DirectoryOpener
// =============================================================================

#[tokio::test]
async fn test_directory_opener_opens_tile_directory() {
    let root = tempfile::tempdir().unwrap();
    write_tile_directory(
        &root.path().join("cases/001"),
        &gradient_manifest(&[(600, 400), (300, 200)], 256),
    );

    let registry = SlideRegistry::new(DirectoryOpener::new(root.path()));
    let slide = registry.get_slide("cases/001").await.unwrap();

    assert_eq!(slide.pyramid().len(), 2);
    assert_eq!((slide.metadata().width, slide.metadata().height), (600, 400));
    assert!(slide.identifier().starts_with("dir://"));
}

#[tokio::test]
async fn test_directory_opener_rejects_bad_ids() {
    let root = tempfile::tempdir().unwrap();
    let registry = SlideRegistry::new(DirectoryOpener::new(root.path()));

    for id in ["", "../outside", "/etc"] {
        assert!(
            matches!(
                registry.get_slide(id).await,
                Err(SlideError::UnsupportedFormat { .. })
            ),
            "id {:?} should be rejected",
            id
        );
    }

    // Exists but holds no manifest
    std::fs::create_dir_all(root.path().join("plain")).unwrap();
    assert!(matches!(
        registry.get_slide("plain").await,
        Err(SlideError::UnsupportedFormat { .. })
    ));
}
