//! Progress-callback trait for extraction and synthesis events.
//!
//! Inject an [`Arc<dyn ExtractionProgress>`] via
//! [`crate::config::FlashcardConfigBuilder::progress_callback`] to be told
//! when each page starts, finishes or fails, and when the synthesis call
//! starts and returns. The CLI uses it to drive an `indicatif` progress bar;
//! a web front-end could forward the same events over a socket.
//!
//! # Example
//!
//! ```rust
//! use pdf2anki::{ExtractionProgress, FlashcardConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailedPages(AtomicUsize);
//!
//! impl ExtractionProgress for FailedPages {
//!     fn on_page_error(&self, page_num: usize, _total: usize, error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num} failed: {error}");
//!     }
//! }
//!
//! let config = FlashcardConfig::builder()
//!     .progress_callback(Arc::new(FailedPages(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipelines as they work through a document.
///
/// Pages are processed one at a time, so calls arrive in page order from a
/// single task. All methods default to no-ops.
pub trait ExtractionProgress: Send + Sync {
    /// Called once the document is open, before the first page.
    ///
    /// `total_pages` is the number of pages that will be attempted (after the
    /// page limit), not the document's page count.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's OCR request is sent.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page was transcribed; `text_len` is the cleaned text's byte length.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page failed to render or transcribe. Extraction continues.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after the last page.
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }

    /// Called before the synthesis request; `input_chars` is the prompt text length.
    fn on_synthesis_start(&self, input_chars: usize) {
        let _ = input_chars;
    }

    /// Called when synthesis produced a card set.
    fn on_synthesis_complete(&self, cards: usize) {
        let _ = cards;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ExtractionProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::FlashcardConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgress>;
