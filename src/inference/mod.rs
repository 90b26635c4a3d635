//! Model endpoints behind one capability trait.
//!
//! The pipelines only ever need two things from a model: turn a prompt into
//! text, and turn a prompt plus a page image into text. [`InferenceBackend`]
//! is exactly that, so extraction and synthesis can be driven by the native
//! Ollama client, any hosted provider `edgequake-llm` knows about, or a
//! deterministic stand-in in tests.
//!
//! Backends make one request per call and never retry; each request is
//! bounded by the endpoint's `timeout_secs`.

pub mod hosted;
pub mod ollama;

use crate::config::{EndpointConfig, ProviderKind};
use crate::error::FlashcardError;
use async_trait::async_trait;
use std::sync::Arc;

pub use hosted::HostedBackend;
pub use ollama::OllamaClient;

/// A model endpoint that can answer text and image prompts.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Complete a text-only prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, FlashcardError>;

    /// Complete a prompt about one PNG-encoded image.
    async fn generate_from_image(&self, prompt: &str, png: &[u8])
        -> Result<String, FlashcardError>;

    /// Identity used in logs and error messages.
    fn endpoint(&self) -> String;
}

/// Build the production backend for an endpoint.
pub fn backend_for(endpoint: &EndpointConfig) -> Result<Arc<dyn InferenceBackend>, FlashcardError> {
    match &endpoint.provider {
        ProviderKind::Ollama => Ok(Arc::new(OllamaClient::new(endpoint)?)),
        ProviderKind::Hosted(name) => Ok(Arc::new(HostedBackend::new(name, endpoint)?)),
    }
}

/// Reject blank completions; models sometimes answer with nothing at all.
pub(crate) fn non_empty(endpoint: &str, content: String) -> Result<String, FlashcardError> {
    if content.trim().is_empty() {
        Err(FlashcardError::Inference {
            endpoint: endpoint.to_string(),
            detail: "model returned an empty response".into(),
        })
    } else {
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_completion_is_an_inference_error() {
        let err = non_empty("ollama", " \n ".into()).unwrap_err();
        assert!(err.is_inference());
        assert_eq!(non_empty("ollama", "ok".into()).unwrap(), "ok");
    }

    #[test]
    fn ollama_backend_from_default_endpoint() {
        let backend = backend_for(&EndpointConfig::default()).unwrap();
        assert!(backend.endpoint().contains("localhost:11434"));
    }
}
