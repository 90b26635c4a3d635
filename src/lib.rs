//! # pdf2anki
//!
//! Turn PDF documents into Anki flashcards using local or hosted language models.
//!
//! ## Why this crate?
//!
//! Lecture slides and scanned handouts rarely have a usable text layer, and
//! when they do, text extraction scrambles multi-column layouts and drops
//! everything in figures. Instead this crate rasterises each page and lets a
//! vision model read it, then asks a text model to write question/answer
//! cards from what was read.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the path and PDF header
//!  ├─ 2. Render     rasterise pages lazily via pdfium (spawn_blocking)
//!  ├─ 3. OCR        one vision-model call per page, in order, fail-soft
//!  ├─ 4. Filter     drop failed and empty pages (optionally blank/short ones)
//!  ├─ 5. Synthesise one text-model call over the joined page text
//!  └─ 6. Parse      Q:/A: records → validated, deduplicated FlashcardSet
//! ```
//!
//! The cards can then be written to a TSV file ([`export`]) or pushed into a
//! running Anki through AnkiConnect ([`anki`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2anki::{generate_flashcards, write_tsv, FlashcardConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Talks to Ollama on http://localhost:11434 by default
//!     let config = FlashcardConfig::builder()
//!         .model("llava:13b")
//!         .max_pages(Some(10))
//!         .build()?;
//!     let cards = generate_flashcards("lecture.pdf", &config).await?;
//!     write_tsv("flashcards.tsv", &cards)?;
//!     eprintln!("{} cards", cards.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2anki` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2anki = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! OCR needs a vision model (`llava`, `llama3.2-vision`, `ministral-3b`
//! builds with vision, `gpt-4.1-nano` through a hosted provider). Synthesis
//! can use any instruction-following model; it sees the whole document at
//! once, so give it a context window (`num_ctx`) large enough for every page.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod anki;
pub mod config;
pub mod error;
pub mod export;
pub mod generate;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use anki::{AddNotesSummary, AnkiConnectClient, DEFAULT_ANKICONNECT_HOST};
pub use config::{EndpointConfig, FlashcardConfig, FlashcardConfigBuilder, ProviderKind};
pub use error::{FlashcardError, PageError};
pub use export::{read_tsv, write_tsv};
pub use generate::{
    extract_pages, generate_flashcards, generate_flashcards_from_bytes,
    FlashcardGenerationPipeline,
};
pub use inference::{backend_for, InferenceBackend};
pub use output::{
    ExtractionResult, Flashcard, FlashcardSet, GenerationOutput, PageContent, ParseReport,
};
pub use pipeline::extract::PageExtractionPipeline;
pub use pipeline::ocr::VisionOcrClient;
pub use pipeline::postprocess::PageFilter;
pub use pipeline::render::{PageImage, PageImages, PageRasterizer, PdfiumRasterizer};
pub use pipeline::synthesize::FlashcardSynthesizer;
pub use progress::{ExtractionProgress, NoopProgress, ProgressCallback};
