//! Page extraction: rasterise then transcribe every page, in order.
//!
//! Pages are processed strictly one at a time. A page that cannot be
//! rendered or transcribed does not stop the document: it is logged, handed
//! to the progress callback, and recorded with empty text and its
//! [`PageError`]. Only problems with the document as a whole are fatal.

use crate::error::{FlashcardError, PageError};
use crate::output::{ExtractionResult, PageContent};
use crate::pipeline::ocr::VisionOcrClient;
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rasteriser + OCR client, run sequentially over one document.
#[derive(Clone)]
pub struct PageExtractionPipeline {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: VisionOcrClient,
    progress: Option<ProgressCallback>,
}

impl PageExtractionPipeline {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, ocr: VisionOcrClient) -> Self {
        Self {
            rasterizer,
            ocr,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Extract text from the first `max_pages` pages of `path` (all pages if `None`).
    ///
    /// The result holds exactly one [`PageContent`] per attempted page,
    /// numbered `1..=N`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, `CorruptDocument` or
    /// `DocumentProcessing` from the rasteriser; `DocumentProcessing` if the
    /// document has no pages or not a single page could be rendered.
    pub async fn extract(
        &self,
        path: &Path,
        max_pages: Option<usize>,
    ) -> Result<ExtractionResult, FlashcardError> {
        let start = Instant::now();
        let mut images = self.rasterizer.open(path, max_pages).await?;
        let document_pages = images.document_pages();
        let total = images.len();

        if document_pages == 0 || total == 0 {
            return Err(FlashcardError::DocumentProcessing {
                detail: format!("'{}' has no pages", path.display()),
            });
        }

        info!(
            "Extracting {} of {} pages from {}",
            total,
            document_pages,
            path.display()
        );
        if let Some(cb) = &self.progress {
            cb.on_extraction_start(total);
        }

        let mut pages = Vec::with_capacity(total);
        let mut render_failures = 0;
        while let Some(item) = images.next().await {
            let content = match item {
                Ok(image) => {
                    let page_num = image.page_number;
                    if let Some(cb) = &self.progress {
                        cb.on_page_start(page_num, total);
                    }
                    match self.ocr.transcribe(&image).await {
                        Ok(text) => {
                            if let Some(cb) = &self.progress {
                                cb.on_page_complete(page_num, total, text.len());
                            }
                            PageContent::new(page_num, text)
                        }
                        Err(e) => self.page_failed(
                            PageError::OcrFailed {
                                page: page_num,
                                detail: e.to_string(),
                            },
                            total,
                        ),
                    }
                }
                Err(page_error) => {
                    render_failures += 1;
                    self.page_failed(page_error, total)
                }
            };
            pages.push(content);
        }
        drop(images);

        if pages.len() != total {
            return Err(FlashcardError::Internal(format!(
                "renderer stopped after {} of {} pages",
                pages.len(),
                total
            )));
        }
        if render_failures == total {
            return Err(FlashcardError::DocumentProcessing {
                detail: format!("none of the {total} pages could be rendered"),
            });
        }

        let succeeded = pages.iter().filter(|p| !p.is_failed()).count();
        if let Some(cb) = &self.progress {
            cb.on_extraction_complete(total, succeeded);
        }
        info!(
            "Extracted {}/{} pages in {:?}",
            succeeded,
            total,
            start.elapsed()
        );

        Ok(ExtractionResult {
            document_pages,
            pages,
        })
    }

    fn page_failed(&self, error: PageError, total: usize) -> PageContent {
        warn!("{}", error);
        if let Some(cb) = &self.progress {
            cb.on_page_error(error.page(), total, &error.to_string());
        }
        debug!("Page {} kept with empty text", error.page());
        PageContent::failed(error)
    }
}
