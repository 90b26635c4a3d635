//! Pipeline integration tests.
//!
//! Everything here runs offline: pages come from a fake rasteriser built on
//! `PageImages::from_renderer` (so laziness and page limits behave exactly as
//! with pdfium), and both model endpoints are a scripted `InferenceBackend`
//! that records every call it receives.

use async_trait::async_trait;
use pdf2anki::{
    read_tsv, write_tsv, ExtractionProgress, Flashcard, FlashcardError,
    FlashcardGenerationPipeline, FlashcardSynthesizer, InferenceBackend, PageError,
    PageExtractionPipeline, PageFilter, PageImage, PageImages, PageRasterizer, VisionOcrClient,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Renders `pages` pages; the PNG bytes are just the page number.
struct FakeRasterizer {
    pages: usize,
    fail_render: Vec<usize>,
    rendered: Arc<AtomicUsize>,
}

impl FakeRasterizer {
    fn new(pages: usize) -> Self {
        Self {
            pages,
            fail_render: vec![],
            rendered: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(mut self, pages: &[usize]) -> Self {
        self.fail_render = pages.to_vec();
        self
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn open(
        &self,
        _path: &Path,
        max_pages: Option<usize>,
    ) -> Result<PageImages, FlashcardError> {
        let fail = self.fail_render.clone();
        let rendered = self.rendered.clone();
        Ok(PageImages::from_renderer(self.pages, max_pages, move |idx| {
            let page_number = idx + 1;
            rendered.fetch_add(1, Ordering::SeqCst);
            if fail.contains(&page_number) {
                return Err(PageError::RenderFailed {
                    page: page_number,
                    detail: "bitmap allocation failed".into(),
                });
            }
            Ok(PageImage {
                page_number,
                png: page_number.to_string().into_bytes(),
                width: 1,
                height: 1,
            })
        }))
    }
}

type PageText = Box<dyn Fn(usize) -> String + Send + Sync>;

/// Answers OCR calls per page and synthesis calls with a canned response.
struct FakeModel {
    page_text: PageText,
    fail_ocr: Vec<usize>,
    synthesis: Result<String, String>,
    ocr_calls: Mutex<Vec<usize>>,
    synthesis_prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    fn new(synthesis: &str) -> Self {
        Self {
            page_text: Box::new(long_page),
            fail_ocr: vec![],
            synthesis: Ok(synthesis.to_string()),
            ocr_calls: Mutex::new(vec![]),
            synthesis_prompts: Mutex::new(vec![]),
        }
    }

    fn failing_ocr(mut self, pages: &[usize]) -> Self {
        self.fail_ocr = pages.to_vec();
        self
    }

    fn page_text(mut self, f: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        self.page_text = Box::new(f);
        self
    }

    fn unreachable_synthesis(mut self) -> Self {
        self.synthesis = Err("connection refused".into());
        self
    }

    fn ocr_calls(&self) -> Vec<usize> {
        self.ocr_calls.lock().unwrap().clone()
    }

    fn synthesis_prompts(&self) -> Vec<String> {
        self.synthesis_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for FakeModel {
    async fn generate_text(&self, prompt: &str) -> Result<String, FlashcardError> {
        self.synthesis_prompts
            .lock()
            .unwrap()
            .push(prompt.to_string());
        self.synthesis
            .clone()
            .map_err(|detail| FlashcardError::Inference {
                endpoint: self.endpoint(),
                detail,
            })
    }

    async fn generate_from_image(
        &self,
        _prompt: &str,
        png: &[u8],
    ) -> Result<String, FlashcardError> {
        let page: usize = String::from_utf8_lossy(png).parse().unwrap();
        self.ocr_calls.lock().unwrap().push(page);
        if self.fail_ocr.contains(&page) {
            return Err(FlashcardError::InferenceTimeout {
                endpoint: self.endpoint(),
                secs: 300,
            });
        }
        Ok((self.page_text)(page))
    }

    fn endpoint(&self) -> String {
        "fake".into()
    }
}

fn long_page(n: usize) -> String {
    format!(
        "Content of page {n}. {}",
        "Cells store genetic information in DNA molecules. ".repeat(3)
    )
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }
}

impl ExtractionProgress for Recorder {
    fn on_extraction_start(&self, total_pages: usize) {
        self.push(format!("start {total_pages}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, _len: usize) {
        self.push(format!("ok {page_num}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.push(format!("err {page_num}"));
    }
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        self.push(format!("done {success_count}/{total_pages}"));
    }
    fn on_synthesis_complete(&self, cards: usize) {
        self.push(format!("cards {cards}"));
    }
}

fn extraction(raster: FakeRasterizer, model: Arc<FakeModel>) -> PageExtractionPipeline {
    PageExtractionPipeline::new(Arc::new(raster), VisionOcrClient::new(model))
}

fn generation(raster: FakeRasterizer, model: Arc<FakeModel>) -> FlashcardGenerationPipeline {
    FlashcardGenerationPipeline::new(
        extraction(raster, model.clone()),
        FlashcardSynthesizer::new(model, 3),
    )
}

const PDF: &str = "lecture.pdf";

const THREE_CARDS: &str = "Here are your flashcards:\n\n\
    Q: Where is genetic information stored?\nA: In DNA\n\n\
    Q: What stores DNA?\nA: Cells\n\n\
    Q: What is page 1 about?\nA: Genetics";

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extraction_yields_one_page_per_attempted_page_in_order() {
    let model = Arc::new(FakeModel::new(""));
    let result = extraction(FakeRasterizer::new(5), model.clone())
        .extract(Path::new(PDF), None)
        .await
        .unwrap();

    let numbers: Vec<usize> = result.iter().map(|p| p.page_number()).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(result.document_pages, 5);
    assert_eq!(result.failed_pages(), 0);
    assert_eq!(result.pages[2].text(), long_page(3).trim());
    assert_eq!(model.ocr_calls(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn failed_ocr_page_keeps_its_slot_with_empty_text() {
    let model = Arc::new(FakeModel::new("").failing_ocr(&[2]));
    let recorder = Arc::new(Recorder::default());
    let result = extraction(FakeRasterizer::new(3), model.clone())
        .with_progress(Some(recorder.clone() as Arc<dyn ExtractionProgress>))
        .extract(Path::new(PDF), None)
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    let page2 = &result.pages[1];
    assert_eq!(page2.page_number(), 2);
    assert_eq!(page2.text(), "");
    assert!(matches!(page2.error(), Some(PageError::OcrFailed { page: 2, .. })));
    assert!(!result.pages[0].text().is_empty());
    assert!(!result.pages[2].text().is_empty());

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start 3", "ok 1", "err 2", "ok 3", "done 2/3"]
    );
}

#[tokio::test]
async fn failed_render_is_recorded_and_never_sent_to_ocr() {
    let model = Arc::new(FakeModel::new(""));
    let result = extraction(FakeRasterizer::new(3).failing(&[2]), model.clone())
        .extract(Path::new(PDF), None)
        .await
        .unwrap();

    assert!(matches!(
        result.pages[1].error(),
        Some(PageError::RenderFailed { page: 2, .. })
    ));
    assert_eq!(model.ocr_calls(), vec![1, 3]);
}

#[tokio::test]
async fn nothing_renderable_is_a_document_error() {
    let model = Arc::new(FakeModel::new(""));
    let err = extraction(FakeRasterizer::new(2).failing(&[1, 2]), model.clone())
        .extract(Path::new(PDF), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FlashcardError::DocumentProcessing { .. }));
    assert!(model.ocr_calls().is_empty());
}

#[tokio::test]
async fn zero_page_document_is_a_document_error() {
    let err = extraction(FakeRasterizer::new(0), Arc::new(FakeModel::new("")))
        .extract(Path::new(PDF), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FlashcardError::DocumentProcessing { .. }));
}

#[tokio::test]
async fn page_limit_renders_only_the_first_pages() {
    let raster = FakeRasterizer::new(10);
    let rendered = raster.rendered.clone();
    let model = Arc::new(FakeModel::new(""));
    let result = extraction(raster, model.clone())
        .extract(Path::new(PDF), Some(2))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.document_pages, 10);
    assert_eq!(rendered.load(Ordering::SeqCst), 2);
    assert_eq!(model.ocr_calls(), vec![1, 2]);
}

// ── Generation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn generation_skips_failed_pages_and_marks_page_boundaries() {
    let model = Arc::new(FakeModel::new(THREE_CARDS).failing_ocr(&[2]));
    let output = generation(FakeRasterizer::new(3), model.clone())
        .generate_detailed(Path::new(PDF), None)
        .await
        .unwrap();

    assert_eq!(output.cards.len(), 3);
    assert_eq!(output.extraction.failed_pages(), 1);

    let prompts = model.synthesis_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Content of page 1."));
    assert!(prompts[0].contains("\n\n--- Page 3 ---\n\nContent of page 3."));
    assert!(!prompts[0].contains("Content of page 2."));
    assert!(prompts[0].contains("about 6 Anki flashcards"));
}

#[tokio::test]
async fn malformed_records_are_skipped() {
    let response = "Q: One?\nA: 1\n\nQ: Two?\n\nQ: Three?\nA: 3\n\nQ: Four?\nA: 4";
    let model = Arc::new(FakeModel::new(response));
    let output = generation(FakeRasterizer::new(1), model)
        .generate_detailed(Path::new(PDF), None)
        .await
        .unwrap();

    assert_eq!(output.cards.len(), 3);
    assert_eq!(output.report.candidates, 4);
    assert_eq!(output.report.malformed, 1);
}

#[tokio::test]
async fn duplicate_cards_keep_their_first_position() {
    let response = "Q: a?\nA: 1\n\nQ: b?\nA: 2\n\nQ: a?\nA: 1";
    let cards = generation(FakeRasterizer::new(1), Arc::new(FakeModel::new(response)))
        .generate(Path::new(PDF), None)
        .await
        .unwrap();
    let fronts: Vec<&str> = cards.iter().map(|c| c.front()).collect();
    assert_eq!(fronts, vec!["a?", "b?"]);
}

#[tokio::test]
async fn short_page_reaches_synthesis() {
    let model = Arc::new(
        FakeModel::new("Q: capital of France? A: Paris")
            .page_text(|_| "Paris is the capital of France.".to_string()),
    );
    let cards = generation(FakeRasterizer::new(1), model.clone())
        .generate(Path::new(PDF), None)
        .await
        .unwrap();

    assert_eq!(
        cards.into_vec(),
        vec![Flashcard::new("capital of France?", "Paris").unwrap()]
    );
    let prompts = model.synthesis_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Paris is the capital of France."));
}

#[tokio::test]
async fn pages_without_text_give_empty_input() {
    let model = Arc::new(FakeModel::new(THREE_CARDS).page_text(|_| "  \n ".to_string()));
    let err = generation(FakeRasterizer::new(2), model.clone())
        .generate(Path::new(PDF), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FlashcardError::EmptyInput));
    assert!(model.synthesis_prompts().is_empty());
}

#[tokio::test]
async fn page_markers_in_page_text_do_not_inflate_the_card_target() {
    let model = Arc::new(
        FakeModel::new(THREE_CARDS)
            .page_text(|_| "--- Page 9 ---\nMitosis splits one nucleus into two.".to_string()),
    );
    generation(FakeRasterizer::new(1), model.clone())
        .generate(Path::new(PDF), None)
        .await
        .unwrap();
    assert!(model.synthesis_prompts()[0].contains("about 3 Anki flashcards"));
}

#[tokio::test]
async fn blank_pages_give_empty_input_without_a_synthesis_call() {
    let model = Arc::new(FakeModel::new(THREE_CARDS).page_text(|n| {
        if n == 1 {
            "The image appears to be completely blank, with no visible text or markings \
             anywhere on the page, only a uniform white background."
                .to_string()
        } else {
            format!("Page {n}")
        }
    }));
    let err = generation(FakeRasterizer::new(3), model.clone())
        .page_filter(PageFilter::strict())
        .generate(Path::new(PDF), None)
        .await
        .unwrap_err();

    assert!(matches!(err, FlashcardError::EmptyInput));
    assert_eq!(model.ocr_calls().len(), 3);
    assert!(model.synthesis_prompts().is_empty());
}

#[tokio::test]
async fn every_page_failing_ocr_is_empty_input() {
    let model = Arc::new(FakeModel::new(THREE_CARDS).failing_ocr(&[1, 2]));
    let err = generation(FakeRasterizer::new(2), model.clone())
        .generate(Path::new(PDF), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FlashcardError::EmptyInput));
    assert!(model.synthesis_prompts().is_empty());
}

#[tokio::test]
async fn unusable_model_output_is_no_cards_produced() {
    let model = Arc::new(FakeModel::new("Sorry, I cannot create flashcards from this."));
    let err = generation(FakeRasterizer::new(2), model)
        .generate(Path::new(PDF), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlashcardError::NoCardsProduced { candidates: 0, .. }
    ));
}

#[tokio::test]
async fn synthesis_transport_failure_propagates() {
    let model = Arc::new(FakeModel::new("").unreachable_synthesis());
    let err = generation(FakeRasterizer::new(1), model)
        .generate(Path::new(PDF), None)
        .await
        .unwrap_err();
    assert!(err.is_inference());
}

#[tokio::test]
async fn synthesis_progress_is_reported() {
    let model = Arc::new(FakeModel::new(THREE_CARDS));
    let recorder = Arc::new(Recorder::default());
    let pipeline = FlashcardGenerationPipeline::new(
        extraction(FakeRasterizer::new(1), model.clone()),
        FlashcardSynthesizer::new(model, 3)
            .with_progress(Some(recorder.clone() as Arc<dyn ExtractionProgress>)),
    );
    pipeline.generate(Path::new(PDF), None).await.unwrap();
    assert_eq!(*recorder.events.lock().unwrap(), vec!["cards 3"]);
}

#[tokio::test]
async fn generated_cards_survive_a_tsv_round_trip() {
    let response = "Q: What is \"DNA\"?\nA: Deoxyribonucleic\tacid\n\nQ: Where?\nA: Nucleus";
    let cards = generation(FakeRasterizer::new(1), Arc::new(FakeModel::new(response)))
        .generate(Path::new(PDF), None)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flashcards.tsv");
    write_tsv(&path, &cards).unwrap();
    assert_eq!(read_tsv(&path).unwrap(), cards);
}
