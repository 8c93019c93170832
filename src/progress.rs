//! Progress-callback trait for per-image recognition events.
//!
//! Inject an [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::ScanConfigBuilder::progress_callback`] to receive events
//! as the pipeline works through the batch.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfscan::{ScanConfig, ScanProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ScanProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, position: usize, total: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Image {}/{} done ({} bytes)", position, total, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ScanConfig::builder()
//!     .progress_callback(counter as Arc<dyn ScanProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::extract::ImageFormat;
use std::sync::Arc;

/// Called by the pipeline as it scans and recognises images.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Images are processed sequentially, but the trait is
/// `Send + Sync` so implementations can be shared with other tasks.
pub trait ScanProgressCallback: Send + Sync {
    /// Called once after extraction and selection.
    ///
    /// # Arguments
    /// * `format`     — format family chosen for this run
    /// * `discovered` — images discovered before filtering
    /// * `selected`   — images that will be sent for recognition
    fn on_scan_complete(&self, format: ImageFormat, discovered: usize, selected: usize) {
        let _ = (format, discovered, selected);
    }

    /// Called just before an image is dispatched.
    fn on_image_start(&self, position: usize, total: usize) {
        let _ = (position, total);
    }

    /// Called when an image was recognised.
    ///
    /// `text_len` is the byte length of the recognised text.
    fn on_image_complete(&self, position: usize, total: usize, text_len: usize) {
        let _ = (position, total, text_len);
    }

    /// Called when recognition of an image failed.
    fn on_image_error(&self, position: usize, total: usize, error: &str) {
        let _ = (position, total, error);
    }

    /// Called once after every selected image has been attempted.
    fn on_run_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ScanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type ProgressCallback = Arc<dyn ScanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        selected: AtomicUsize,
    }

    impl ScanProgressCallback for TrackingCallback {
        fn on_scan_complete(&self, _format: ImageFormat, _discovered: usize, selected: usize) {
            self.selected.store(selected, Ordering::SeqCst);
        }

        fn on_image_start(&self, _position: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _position: usize, _total: usize, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_error(&self, _position: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_scan_complete(ImageFormat::Jpeg, 4, 2);
        cb.on_image_start(1, 2);
        cb.on_image_complete(1, 2, 42);
        cb.on_image_error(2, 2, "timeout");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_scan_complete(ImageFormat::Png, 3, 3);
        for pos in 1..=3 {
            tracker.on_image_start(pos, 3);
        }
        tracker.on_image_complete(1, 3, 10);
        tracker.on_image_error(2, 3, "HTTP 500");
        tracker.on_image_complete(3, 3, 10);

        assert_eq!(tracker.selected.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
