//! Progress-callback trait for per-paragraph translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events as the dispatcher settles each paragraph.
//!
//! # Example
//!
//! ```rust
//! use pdf2zh::{TranslationConfig, TranslationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl TranslationProgressCallback for Counter {
//!     fn on_paragraph_complete(&self, _position: usize, total: usize, _len: usize) {
//!         let done = self.0.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total}");
//!     }
//! }
//!
//! let config = TranslationConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the dispatcher as it processes each paragraph.
///
/// Paragraph events fire from worker tasks on different threads, in
/// completion order. Implementations must protect shared state with
/// `Mutex`, atomics, or similar. Every method defaults to a no-op.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once before any job is submitted.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when a worker picks up the paragraph at `position` (0-indexed).
    fn on_paragraph_start(&self, position: usize, total: usize) {
        let _ = (position, total);
    }

    /// Called when a paragraph settles successfully.
    /// `translated_len` is the byte length of the translation.
    fn on_paragraph_complete(&self, position: usize, total: usize, translated_len: usize) {
        let _ = (position, total, translated_len);
    }

    /// Called when a paragraph exhausts its retries.
    fn on_paragraph_error(&self, position: usize, total: usize, error: &str) {
        let _ = (position, total, error);
    }

    /// Called once after every job has settled.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// The shared callback type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(3);
        cb.on_paragraph_start(0, 3);
        cb.on_paragraph_complete(0, 3, 12);
        cb.on_paragraph_error(1, 3, "timed out");
        cb.on_batch_complete(3, 2);
    }

    #[test]
    fn callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TranslationProgressCallback>();
    }
}
