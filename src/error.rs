//! Error types for the pdf2anki library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FlashcardError`] — **Fatal**: the operation cannot produce a result
//!   (bad input path, unreadable PDF, model unreachable, nothing usable in the
//!   model output). Returned as `Err(FlashcardError)` from every public entry
//!   point.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be rendered or
//!   transcribed. Stored inside [`crate::output::PageContent`] next to the
//!   page's (empty) text so the page keeps its slot in the extraction result.
//!
//! The variants are deliberately distinct so callers can tell "no text
//! extracted" ([`FlashcardError::EmptyInput`]) from "model unreachable"
//! ([`FlashcardError::Inference`]) from "model returned nothing usable"
//! ([`FlashcardError::NoCardsProduced`]).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2anki library.
#[derive(Debug, Error)]
pub enum FlashcardError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but cannot be parsed as a PDF.
    #[error("PDF '{path}' is corrupt or not a PDF: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// Rasterisation could not start or produced no pages at all.
    #[error("Document processing failed: {detail}")]
    DocumentProcessing { detail: String },

    // ── Inference errors ──────────────────────────────────────────────────
    /// Transport failure, non-success status or empty body from a model endpoint.
    #[error("Inference request to '{endpoint}' failed: {detail}")]
    Inference { endpoint: String, detail: String },

    /// The model endpoint did not answer within the configured timeout.
    #[error("Inference request to '{endpoint}' timed out after {secs}s")]
    InferenceTimeout { endpoint: String, secs: u64 },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// There was no text to build flashcards from.
    #[error("No text to generate flashcards from (every page was empty, blank or failed)")]
    EmptyInput,

    /// The model answered, but none of its records survived parsing and validation.
    #[error(
        "The model returned no usable flashcards ({candidates} candidate records, {malformed} malformed)"
    )]
    NoCardsProduced { candidates: usize, malformed: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Export / integration errors ───────────────────────────────────────
    /// Could not write or read a flashcard export file.
    #[error("Flashcard export '{path}' failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// AnkiConnect rejected a request or could not be reached.
    #[error("AnkiConnect error: {0}")]
    AnkiConnect(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlashcardError {
    /// True for both flavours of model-endpoint failure.
    pub fn is_inference(&self) -> bool {
        matches!(
            self,
            FlashcardError::Inference { .. } | FlashcardError::InferenceTimeout { .. }
        )
    }
}

/// A non-fatal error for a single page.
///
/// Recorded on the page's [`crate::output::PageContent`]; extraction of the
/// remaining pages continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation or PNG encoding failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR call for this page failed.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. } | PageError::OcrFailed { page, .. } => *page,
        }
    }
}
