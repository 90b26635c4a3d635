//! Page transcription: one rendered page in, cleaned text out.
//!
//! This stage is intentionally thin. The prompt lives in [`crate::prompts`],
//! transport and timeouts live in the [`InferenceBackend`], and what to do
//! when a page fails is the extraction pipeline's call. There is no retry
//! here: one bounded attempt per page.

use crate::error::FlashcardError;
use crate::inference::InferenceBackend;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::render::PageImage;
use crate::prompts::OCR_PROMPT;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sends page images to a vision model.
#[derive(Clone)]
pub struct VisionOcrClient {
    backend: Arc<dyn InferenceBackend>,
    prompt: String,
}

impl VisionOcrClient {
    /// Use the default OCR prompt.
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self::with_prompt(backend, OCR_PROMPT)
    }

    pub fn with_prompt(backend: Arc<dyn InferenceBackend>, prompt: impl Into<String>) -> Self {
        Self {
            backend,
            prompt: prompt.into(),
        }
    }

    /// Transcribe one page.
    ///
    /// The result is opaque text; only wrapping artefacts (fences, generic
    /// lead-ins, invisible characters) are removed.
    pub async fn transcribe(&self, page: &PageImage) -> Result<String, FlashcardError> {
        let start = Instant::now();
        let raw = self
            .backend
            .generate_from_image(&self.prompt, &page.png)
            .await?;
        let text = clean_ocr_text(&raw);
        debug!(
            "Page {}: {} chars from {} in {:?}",
            page.page_number,
            text.len(),
            self.backend.endpoint(),
            start.elapsed()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Echo {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceBackend for Echo {
        async fn generate_text(&self, _prompt: &str) -> Result<String, FlashcardError> {
            unreachable!("OCR never sends text-only prompts")
        }

        async fn generate_from_image(
            &self,
            prompt: &str,
            png: &[u8],
        ) -> Result<String, FlashcardError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("```\n{} bytes\n```", png.len()))
        }

        fn endpoint(&self) -> String {
            "echo".into()
        }
    }

    #[tokio::test]
    async fn transcribe_sends_prompt_and_cleans_output() {
        let backend = Arc::new(Echo {
            prompts: Mutex::new(Vec::new()),
        });
        let client = VisionOcrClient::with_prompt(backend.clone(), "read it");
        let page = PageImage {
            page_number: 1,
            png: vec![0; 12],
            width: 2,
            height: 2,
        };
        assert_eq!(client.transcribe(&page).await.unwrap(), "12 bytes");
        assert_eq!(*backend.prompts.lock().unwrap(), vec!["read it"]);
    }
}
