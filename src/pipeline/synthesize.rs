//! Flashcard synthesis: accumulated page text → one model call → parsed cards.

use crate::error::FlashcardError;
use crate::inference::InferenceBackend;
use crate::output::{FlashcardSet, ParseReport};
use crate::pipeline::parse::parse_flashcards;
use crate::progress::ProgressCallback;
use crate::prompts::flashcard_prompt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Turns source text into a [`FlashcardSet`] with one text-model request.
#[derive(Clone)]
pub struct FlashcardSynthesizer {
    backend: Arc<dyn InferenceBackend>,
    cards_per_page: usize,
    progress: Option<ProgressCallback>,
}

impl FlashcardSynthesizer {
    pub fn new(backend: Arc<dyn InferenceBackend>, cards_per_page: usize) -> Self {
        Self {
            backend,
            cards_per_page,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Synthesise cards from `text`.
    pub async fn synthesize(&self, text: &str) -> Result<FlashcardSet, FlashcardError> {
        self.synthesize_with_report(text).await.map(|(set, _)| set)
    }

    /// Synthesise cards and report what happened to every candidate record.
    ///
    /// `text` is treated as a single page of source material; use
    /// [`synthesize_pages`](Self::synthesize_pages) when it spans several.
    pub async fn synthesize_with_report(
        &self,
        text: &str,
    ) -> Result<(FlashcardSet, ParseReport), FlashcardError> {
        self.synthesize_pages(text, 1).await
    }

    /// Synthesise cards from `text` holding `pages` pages of source, asking
    /// for about `cards_per_page × pages` cards.
    ///
    /// # Errors
    ///
    /// * [`FlashcardError::EmptyInput`] if `text` is blank. No request is sent.
    /// * [`FlashcardError::Inference`] / [`FlashcardError::InferenceTimeout`]
    ///   if the model call fails.
    /// * [`FlashcardError::NoCardsProduced`] if no record survived parsing.
    pub async fn synthesize_pages(
        &self,
        text: &str,
        pages: usize,
    ) -> Result<(FlashcardSet, ParseReport), FlashcardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FlashcardError::EmptyInput);
        }

        let pages = pages.max(1);
        let prompt = flashcard_prompt(text, pages, self.cards_per_page);
        if let Some(cb) = &self.progress {
            cb.on_synthesis_start(text.len());
        }
        info!(
            "Synthesising flashcards from {} chars ({} pages) via {}",
            text.len(),
            pages,
            self.backend.endpoint()
        );

        let start = Instant::now();
        let response = self.backend.generate_text(&prompt).await?;
        debug!(
            "Synthesis response: {} chars in {:?}",
            response.len(),
            start.elapsed()
        );

        let (set, report) = parse_flashcards(&response);
        if set.is_empty() {
            return Err(FlashcardError::NoCardsProduced {
                candidates: report.candidates,
                malformed: report.malformed,
            });
        }

        info!(
            "{} flashcards ({} malformed, {} empty, {} duplicate records skipped)",
            report.accepted, report.malformed, report.empty, report.duplicates
        );
        if let Some(cb) = &self.progress {
            cb.on_synthesis_complete(set.len());
        }
        Ok((set, report))
    }
}
