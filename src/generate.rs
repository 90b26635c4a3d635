//! Full-document entry points: extraction followed by synthesis.
//!
//! [`FlashcardGenerationPipeline`] composes a [`PageExtractionPipeline`] and a
//! [`FlashcardSynthesizer`]. Between the two, failed pages and pages with no
//! text are dropped, and a [`PageFilter`] can drop more: pages shorter than
//! `min_chars` and pages the model described as blank, so they cannot turn
//! into cards about scanner artefacts. The default filter keeps every page
//! with text.
//!
//! The free functions at the bottom build the production components from a
//! [`FlashcardConfig`] and are what most callers want.

use crate::config::FlashcardConfig;
use crate::error::FlashcardError;
use crate::inference::backend_for;
use crate::output::{join_pages, ExtractionResult, FlashcardSet, GenerationOutput, PageContent};
use crate::pipeline::extract::PageExtractionPipeline;
use crate::pipeline::ocr::VisionOcrClient;
use crate::pipeline::postprocess::{PageFilter, PageUsability};
use crate::pipeline::render::PdfiumRasterizer;
use crate::pipeline::synthesize::FlashcardSynthesizer;
use crate::prompts::page_separator;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Extraction, page filtering, then synthesis.
#[derive(Clone)]
pub struct FlashcardGenerationPipeline {
    extraction: PageExtractionPipeline,
    synthesizer: FlashcardSynthesizer,
    filter: PageFilter,
}

impl FlashcardGenerationPipeline {
    pub fn new(extraction: PageExtractionPipeline, synthesizer: FlashcardSynthesizer) -> Self {
        Self {
            extraction,
            synthesizer,
            filter: PageFilter::default(),
        }
    }

    /// Choose which extracted pages are sent to synthesis.
    pub fn page_filter(mut self, filter: PageFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build the production pipeline (pdfium + configured model endpoints).
    pub fn from_config(config: &FlashcardConfig) -> Result<Self, FlashcardError> {
        config.validate()?;
        let synthesizer = FlashcardSynthesizer::new(
            backend_for(&config.synthesis)?,
            config.cards_per_page,
        )
        .with_progress(config.progress_callback.clone());
        Ok(Self::new(extraction_pipeline(config)?, synthesizer)
            .page_filter(config.page_filter()))
    }

    /// The extraction half, for callers that only need page text.
    pub fn extraction(&self) -> &PageExtractionPipeline {
        &self.extraction
    }

    /// Generate flashcards from the first `max_pages` pages of `path`.
    pub async fn generate(
        &self,
        path: &Path,
        max_pages: Option<usize>,
    ) -> Result<FlashcardSet, FlashcardError> {
        self.generate_detailed(path, max_pages)
            .await
            .map(|output| output.cards)
    }

    /// Like [`generate`](Self::generate), also returning the per-page text
    /// and the parse report.
    ///
    /// # Errors
    ///
    /// Everything [`PageExtractionPipeline::extract`] and
    /// [`FlashcardSynthesizer::synthesize`] return, unchanged, plus
    /// [`FlashcardError::EmptyInput`] when no page passes the filter. In that case
    /// no synthesis request is made.
    pub async fn generate_detailed(
        &self,
        path: &Path,
        max_pages: Option<usize>,
    ) -> Result<GenerationOutput, FlashcardError> {
        let extraction = self.extraction.extract(path, max_pages).await?;
        let (text, used) = {
            let pages = usable_pages(&extraction, &self.filter);
            (join_pages(pages.iter().copied(), page_separator), pages.len())
        };
        info!(
            "{} chars of usable text from {} of {} pages",
            text.len(),
            used,
            extraction.len()
        );
        if text.is_empty() {
            return Err(FlashcardError::EmptyInput);
        }

        let (cards, report) = self.synthesizer.synthesize_pages(&text, used).await?;
        Ok(GenerationOutput {
            extraction,
            cards,
            report,
        })
    }
}

/// Pages that pass `filter`, in page order. Failed pages never do.
pub fn usable_pages<'a>(
    extraction: &'a ExtractionResult,
    filter: &PageFilter,
) -> Vec<&'a PageContent> {
    extraction
        .iter()
        .filter(|page| {
            if page.is_failed() {
                return false;
            }
            match filter.classify(page.text()) {
                PageUsability::Usable => true,
                reason => {
                    debug!("Skipping page {}: {:?}", page.page_number(), reason);
                    false
                }
            }
        })
        .collect()
}

/// Join the usable pages' text with page-boundary markers.
pub fn usable_text(extraction: &ExtractionResult, filter: &PageFilter) -> String {
    join_pages(usable_pages(extraction, filter).into_iter(), page_separator)
}

fn extraction_pipeline(config: &FlashcardConfig) -> Result<PageExtractionPipeline, FlashcardError> {
    let backend = backend_for(&config.ocr)?;
    let ocr = match &config.ocr_prompt {
        Some(prompt) => VisionOcrClient::with_prompt(backend, prompt.clone()),
        None => VisionOcrClient::new(backend),
    };
    Ok(
        PageExtractionPipeline::new(Arc::new(PdfiumRasterizer::new(config)), ocr)
            .with_progress(config.progress_callback.clone()),
    )
}

// ── Convenience entry points ─────────────────────────────────────────────

/// Extract per-page text from a PDF, honouring `config.max_pages`.
pub async fn extract_pages(
    path: impl AsRef<Path>,
    config: &FlashcardConfig,
) -> Result<ExtractionResult, FlashcardError> {
    config.validate()?;
    extraction_pipeline(config)?
        .extract(path.as_ref(), config.max_pages)
        .await
}

/// Generate flashcards from a PDF, honouring `config.max_pages`.
///
/// # Example
/// ```rust,no_run
/// use pdf2anki::{generate_flashcards, FlashcardConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FlashcardConfig::builder().max_pages(Some(3)).build()?;
/// let cards = generate_flashcards("lecture.pdf", &config).await?;
/// for card in &cards {
///     println!("{} → {}", card.front(), card.back());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn generate_flashcards(
    path: impl AsRef<Path>,
    config: &FlashcardConfig,
) -> Result<FlashcardSet, FlashcardError> {
    FlashcardGenerationPipeline::from_config(config)?
        .generate(path.as_ref(), config.max_pages)
        .await
}

/// Generate flashcards from PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed on return.
pub async fn generate_flashcards_from_bytes(
    bytes: &[u8],
    config: &FlashcardConfig,
) -> Result<FlashcardSet, FlashcardError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| FlashcardError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| FlashcardError::Internal(format!("tempfile write: {e}")))?;
    generate_flashcards(tmp.path(), config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;

    const LONG: &str = "Photosynthesis converts light energy into chemical energy. \
                        Chlorophyll in the chloroplasts absorbs mostly red and blue light.";

    #[test]
    fn unusable_pages_are_left_out() {
        let extraction = ExtractionResult {
            document_pages: 4,
            pages: vec![
                PageContent::new(1, LONG),
                PageContent::new(2, "The page appears to be blank."),
                PageContent::failed(PageError::OcrFailed {
                    page: 3,
                    detail: "timeout".into(),
                }),
                PageContent::new(4, LONG),
            ],
        };
        let text = usable_text(&extraction, &PageFilter::strict());
        assert_eq!(text, format!("{LONG}\n\n--- Page 4 ---\n\n{LONG}"));
        assert_eq!(usable_pages(&extraction, &PageFilter::strict()).len(), 2);
    }

    #[test]
    fn default_filter_keeps_every_page_with_text() {
        let extraction = ExtractionResult {
            document_pages: 3,
            pages: vec![
                PageContent::new(1, "Short."),
                PageContent::new(2, ""),
                PageContent::new(3, "The set does not contain any duplicates."),
            ],
        };
        assert_eq!(
            usable_text(&extraction, &PageFilter::default()),
            "Short.\n\n--- Page 3 ---\n\nThe set does not contain any duplicates."
        );
        assert_eq!(usable_text(&extraction, &PageFilter::strict()), "");
    }

    #[tokio::test]
    async fn bytes_that_are_not_a_pdf_are_rejected() {
        let err = generate_flashcards_from_bytes(b"not a pdf", &FlashcardConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlashcardError::CorruptDocument { .. }));
    }
}
