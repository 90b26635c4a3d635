//! Configuration types for PDF-to-flashcard generation.
//!
//! Everything a pipeline needs is passed in through [`FlashcardConfig`],
//! built via [`FlashcardConfigBuilder`]. The library never reads environment
//! variables itself; the CLI maps `OLLAMA_HOST`, `OLLAMA_MODEL` and friends
//! onto the builder, and library users do the same from wherever their
//! settings live.
//!
//! Two model endpoints are configured independently: the vision model used
//! for per-page OCR and the text model used for flashcard synthesis. They
//! often point at the same Ollama server but do not have to.

use crate::error::FlashcardError;
use crate::pipeline::postprocess::PageFilter;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default Ollama server address.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default model for both OCR and synthesis.
pub const DEFAULT_MODEL: &str = "ministral-3b-instruct-64k:latest";

/// Default context window (`num_ctx`) passed to Ollama.
pub const DEFAULT_NUM_CTX: u32 = 16384;

/// Which client talks to a model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Native Ollama HTTP API (`/api/chat`, `/api/generate`). Honours `num_ctx`.
    #[default]
    Ollama,
    /// Any provider known to `edgequake-llm` (`openai`, `anthropic`, `gemini`, …).
    /// API keys are read by the provider factory.
    Hosted(String),
}

impl ProviderKind {
    /// Parse a provider name; `"ollama"` (any case) selects the native client.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("ollama") {
            ProviderKind::Ollama
        } else {
            ProviderKind::Hosted(name.trim().to_lowercase())
        }
    }
}

/// Connection settings for one model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub provider: ProviderKind,
    /// Base URL of the Ollama server. Ignored by hosted providers.
    pub host: String,
    /// Model identifier.
    pub model: String,
    /// Context window size sent with every Ollama request.
    pub num_ctx: u32,
    /// Sampling temperature. `None` leaves the model default.
    pub temperature: Option<f32>,
    /// Bound on a single request, in seconds.
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            num_ctx: DEFAULT_NUM_CTX,
            temperature: None,
            timeout_secs: 300,
        }
    }
}

impl EndpointConfig {
    /// Human-readable identity used in error messages and logs.
    pub fn label(&self) -> String {
        match &self.provider {
            ProviderKind::Ollama => format!("{} ({})", self.host, self.model),
            ProviderKind::Hosted(name) => format!("{} ({})", name, self.model),
        }
    }

    fn validate(&self, which: &str) -> Result<(), FlashcardError> {
        if matches!(self.provider, ProviderKind::Ollama) && self.host.trim().is_empty() {
            return Err(FlashcardError::InvalidConfig(format!(
                "{which} endpoint host must not be empty"
            )));
        }
        if let ProviderKind::Hosted(name) = &self.provider {
            if name.is_empty() {
                return Err(FlashcardError::InvalidConfig(format!(
                    "{which} provider name must not be empty"
                )));
            }
        }
        if self.model.trim().is_empty() {
            return Err(FlashcardError::InvalidConfig(format!(
                "{which} model must not be empty"
            )));
        }
        if self.num_ctx == 0 {
            return Err(FlashcardError::InvalidConfig(format!(
                "{which} num_ctx must be ≥ 1"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(FlashcardError::InvalidConfig(format!(
                "{which} timeout must be ≥ 1 second"
            )));
        }
        Ok(())
    }
}

/// Configuration for extraction and flashcard generation.
///
/// Built via [`FlashcardConfig::builder()`] or [`FlashcardConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2anki::FlashcardConfig;
///
/// let config = FlashcardConfig::builder()
///     .ollama_host("http://192.168.1.132:11435")
///     .model("llava:13b")
///     .max_pages(Some(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, Some(5));
/// ```
#[derive(Clone)]
pub struct FlashcardConfig {
    /// Vision endpoint used to transcribe page images.
    pub ocr: EndpointConfig,

    /// Text endpoint used to synthesise flashcards.
    pub synthesis: EndpointConfig,

    /// Process at most this many pages from the start of the document.
    /// `None` processes every page. Default: `None`.
    pub max_pages: Option<usize>,

    /// Cap on the longest edge of a rendered page in pixels. Default: 4000.
    ///
    /// Pages render at 2× native scale; a US-letter page comes out at
    /// 1224 × 1584 px, well under the cap. The cap only bites on posters and
    /// other oversized pages where 2× would exhaust memory.
    pub max_rendered_pixels: u32,

    /// Pages with fewer characters than this after cleanup are not used for
    /// synthesis. Default: 0 (every page with text is used).
    pub min_page_chars: usize,

    /// Leave out pages the vision model described as blank, or that hold
    /// nothing but a generic "here is the extracted text" line.
    /// Default: false.
    pub skip_blank_pages: bool,

    /// Roughly how many cards to ask for per page of source text. Default: 3.
    pub cards_per_page: usize,

    /// Custom OCR prompt. If None, uses [`crate::prompts::OCR_PROMPT`].
    pub ocr_prompt: Option<String>,

    /// Explicit path to the pdfium shared library. If None, binds to the
    /// library next to the executable or the system library.
    pub pdfium_library: Option<PathBuf>,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FlashcardConfig {
    fn default() -> Self {
        Self {
            ocr: EndpointConfig::default(),
            synthesis: EndpointConfig::default(),
            max_pages: None,
            max_rendered_pixels: 4000,
            min_page_chars: 0,
            skip_blank_pages: false,
            cards_per_page: 3,
            ocr_prompt: None,
            pdfium_library: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FlashcardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashcardConfig")
            .field("ocr", &self.ocr)
            .field("synthesis", &self.synthesis)
            .field("max_pages", &self.max_pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("min_page_chars", &self.min_page_chars)
            .field("skip_blank_pages", &self.skip_blank_pages)
            .field("cards_per_page", &self.cards_per_page)
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgress>"),
            )
            .finish()
    }
}

impl FlashcardConfig {
    /// Create a new builder for `FlashcardConfig`.
    pub fn builder() -> FlashcardConfigBuilder {
        FlashcardConfigBuilder {
            config: Self::default(),
        }
    }

    /// The page filter applied between extraction and synthesis.
    pub fn page_filter(&self) -> PageFilter {
        PageFilter {
            min_chars: self.min_page_chars,
            skip_blank: self.skip_blank_pages,
        }
    }

    /// Check the invariants the builder enforces.
    pub fn validate(&self) -> Result<(), FlashcardError> {
        self.ocr.validate("OCR")?;
        self.synthesis.validate("synthesis")?;
        if self.max_pages == Some(0) {
            return Err(FlashcardError::InvalidConfig(
                "max_pages must be ≥ 1 (use None for all pages)".into(),
            ));
        }
        if self.cards_per_page == 0 {
            return Err(FlashcardError::InvalidConfig(
                "cards_per_page must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`FlashcardConfig`].
///
/// Setters without an endpoint prefix apply to both endpoints; `ocr_*` and
/// `synthesis_*` setters override one side only.
#[derive(Debug)]
pub struct FlashcardConfigBuilder {
    config: FlashcardConfig,
}

impl FlashcardConfigBuilder {
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.config.ocr.provider = provider.clone();
        self.config.synthesis.provider = provider;
        self
    }

    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.config.ocr.host = host.clone();
        self.config.synthesis.host = host;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.config.ocr.model = model.clone();
        self.config.synthesis.model = model;
        self
    }

    pub fn num_ctx(mut self, n: u32) -> Self {
        self.config.ocr.num_ctx = n;
        self.config.synthesis.num_ctx = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        let t = t.clamp(0.0, 2.0);
        self.config.ocr.temperature = Some(t);
        self.config.synthesis.temperature = Some(t);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr.timeout_secs = secs;
        self.config.synthesis.timeout_secs = secs;
        self
    }

    pub fn ocr_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.config.ocr = endpoint;
        self
    }

    pub fn synthesis_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.config.synthesis = endpoint;
        self
    }

    pub fn ocr_host(mut self, host: impl Into<String>) -> Self {
        self.config.ocr.host = host.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr.model = model.into();
        self
    }

    pub fn synthesis_model(mut self, model: impl Into<String>) -> Self {
        self.config.synthesis.model = model.into();
        self
    }

    pub fn max_pages(mut self, n: Option<usize>) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn min_page_chars(mut self, n: usize) -> Self {
        self.config.min_page_chars = n;
        self
    }

    pub fn skip_blank_pages(mut self, skip: bool) -> Self {
        self.config.skip_blank_pages = skip;
        self
    }

    pub fn cards_per_page(mut self, n: usize) -> Self {
        self.config.cards_per_page = n;
        self
    }

    pub fn ocr_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.ocr_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FlashcardConfig, FlashcardError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
