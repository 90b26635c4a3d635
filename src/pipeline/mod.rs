//! Pipeline stages for PDF-to-flashcard generation.
//!
//! Each submodule implements one transformation step and is testable on its
//! own; the stages that talk to the outside world do so through a trait
//! ([`render::PageRasterizer`], [`crate::inference::InferenceBackend`]).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ postprocess      (extract)
//! (path)    (pdfium)   (PNG)      (VLM)   (cleanup)
//!
//! page text ──▶ synthesize ──▶ parse                        (synthesize)
//!               (text LLM)     (Q:/A: records)
//! ```
//!
//! 1. [`input`]  — check the path names a readable PDF
//! 2. [`render`] — rasterise pages lazily on a blocking thread
//! 3. [`encode`] — PNG-encode each page; base64 at the HTTP boundary
//! 4. [`ocr`]    — one vision-model call per page, no retry
//! 5. [`postprocess`] — strip model chatter, classify blank pages
//! 6. [`extract`] — drive 2–5 in page order, fail-soft per page
//! 7. [`synthesize`] — one text-model call over the accumulated text
//! 8. [`parse`]  — turn the response into validated, deduplicated cards

pub mod encode;
pub mod extract;
pub mod input;
pub mod ocr;
pub mod parse;
pub mod postprocess;
pub mod render;
pub mod synthesize;
