//! PDF rasterisation: render pages to PNG lazily via pdfium.
//!
//! ## Why a blocking thread and a channel?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-safe, so the document lives on a `spawn_blocking` thread for its
//! whole lifetime. Pages are handed to the async side over a channel of
//! capacity 1: the renderer is never more than one page ahead of the OCR
//! loop, pages past the page limit are never touched, and dropping
//! [`PageImages`] stops rendering at the next page boundary.
//!
//! ## Resolution
//!
//! Pages render at [`RENDER_SCALE`] (2×) native size. Small print on a
//! letter-size page stays legible to a vision model at 2× while the PNG stays
//! far below upload limits. `max_rendered_pixels` caps the longest edge for
//! oversized pages.

use crate::config::FlashcardConfig;
use crate::error::{FlashcardError, PageError};
use crate::pipeline::encode::encode_png;
use crate::pipeline::input::validate_pdf_path;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Scale factor applied to every page's native size.
pub const RENDER_SCALE: f32 = 2.0;

/// One rendered page, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number.
    pub page_number: usize,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A page, or the reason it could not be rendered.
pub type PageItem = Result<PageImage, PageError>;

/// Number of pages to attempt for a document of `total` pages.
pub fn page_limit(total: usize, max_pages: Option<usize>) -> usize {
    match max_pages {
        Some(n) if n >= 1 => total.min(n),
        _ => total,
    }
}

/// Lazy, finite, single-pass sequence of rendered pages in file order.
#[derive(Debug)]
pub struct PageImages {
    document_pages: usize,
    attempted: usize,
    rx: mpsc::Receiver<PageItem>,
}

impl PageImages {
    /// Render `render(index)` for the first `page_limit(document_pages, max_pages)`
    /// pages on a blocking thread. `index` is 0-based.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_renderer<F>(document_pages: usize, max_pages: Option<usize>, render: F) -> Self
    where
        F: FnMut(usize) -> PageItem + Send + 'static,
    {
        let attempted = page_limit(document_pages, max_pages);
        let (tx, rx) = mpsc::channel(1);
        tokio::task::spawn_blocking(move || feed_pages(&tx, attempted, render));
        Self {
            document_pages,
            attempted,
            rx,
        }
    }

    /// Pages in the source document.
    pub fn document_pages(&self) -> usize {
        self.document_pages
    }

    /// Pages this sequence will yield.
    pub fn len(&self) -> usize {
        self.attempted
    }

    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    /// Next page in order, or `None` once every attempted page was yielded.
    pub async fn next(&mut self) -> Option<PageItem> {
        self.rx.recv().await
    }
}

/// Push rendered pages into `tx` until done or the receiver is gone.
fn feed_pages(
    tx: &mpsc::Sender<PageItem>,
    count: usize,
    mut render: impl FnMut(usize) -> PageItem,
) {
    for idx in 0..count {
        if tx.blocking_send(render(idx)).is_err() {
            debug!("Page consumer dropped; stopping after page {}", idx + 1);
            return;
        }
    }
}

/// Opens a PDF and yields its pages as images.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Open `path` and prepare to yield at most `max_pages` pages.
    ///
    /// Fails with `NotFound`, `PermissionDenied` or `CorruptDocument` for bad
    /// input and `DocumentProcessing` when the renderer cannot start.
    async fn open(
        &self,
        path: &Path,
        max_pages: Option<usize>,
    ) -> Result<PageImages, FlashcardError>;
}

/// Production rasteriser backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    max_rendered_pixels: u32,
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(config: &FlashcardConfig) -> Self {
        Self {
            max_rendered_pixels: config.max_rendered_pixels,
            library: config.pdfium_library.clone(),
        }
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new(&FlashcardConfig::default())
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn open(
        &self,
        path: &Path,
        max_pages: Option<usize>,
    ) -> Result<PageImages, FlashcardError> {
        let path = validate_pdf_path(path)?;
        let library = self.library.clone();
        let max_pixels = self.max_rendered_pixels as i32;

        let (opened_tx, opened_rx) = oneshot::channel();
        let (tx, rx) = mpsc::channel(1);

        tokio::task::spawn_blocking(move || {
            let pdfium = match bind_pdfium(library.as_deref()) {
                Ok(p) => p,
                Err(e) => {
                    let _ = opened_tx.send(Err(e));
                    return;
                }
            };
            let document = match pdfium.load_pdf_from_file(&path, None) {
                Ok(d) => d,
                Err(e) => {
                    let _ = opened_tx.send(Err(load_error(&path, e)));
                    return;
                }
            };

            let pages = document.pages();
            let total = pages.len() as usize;
            let attempted = page_limit(total, max_pages);
            info!("PDF loaded: {} pages, rendering {}", total, attempted);
            if opened_tx.send(Ok((total, attempted))).is_err() {
                return;
            }

            let render_config = PdfRenderConfig::new()
                .scale_page_by_factor(RENDER_SCALE)
                .set_maximum_width(max_pixels)
                .set_maximum_height(max_pixels);

            feed_pages(&tx, attempted, |idx| {
                let page_number = idx + 1;
                let fail = |detail: String| PageError::RenderFailed {
                    page: page_number,
                    detail,
                };
                let page = pages.get(idx as u16).map_err(|e| fail(format!("{e:?}")))?;
                let bitmap = page
                    .render_with_config(&render_config)
                    .map_err(|e| fail(format!("{e:?}")))?;
                let image = bitmap.as_image();
                let png = encode_png(&image)
                    .map_err(|e| fail(format!("PNG encoding failed: {e}")))?;
                debug!(
                    "Rendered page {} → {}x{} px",
                    page_number,
                    image.width(),
                    image.height()
                );
                Ok(PageImage {
                    page_number,
                    png,
                    width: image.width(),
                    height: image.height(),
                })
            });
        });

        let (document_pages, attempted) = opened_rx
            .await
            .map_err(|_| FlashcardError::Internal("Render task panicked".into()))??;

        Ok(PageImages {
            document_pages,
            attempted,
            rx,
        })
    }
}

/// Bind to an explicit pdfium library, else one next to the binary, else the system one.
fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, FlashcardError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(&path.to_path_buf()),
        None => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| FlashcardError::DocumentProcessing {
        detail: format!(
            "failed to bind the pdfium library ({e:?}); set PDFIUM_LIB_PATH to a libpdfium build"
        ),
    })?;
    Ok(Pdfium::new(bindings))
}

fn load_error(path: &Path, e: PdfiumError) -> FlashcardError {
    let detail = format!("{e:?}");
    let detail = if detail.to_lowercase().contains("password") {
        format!("document is password protected ({detail})")
    } else {
        detail
    };
    FlashcardError::CorruptDocument {
        path: path.to_path_buf(),
        detail,
    }
}
