//! Hosted model providers through `edgequake-llm`.
//!
//! `edgequake-llm` hides OpenAI, Anthropic, Gemini, Mistral and friends
//! behind one `LLMProvider` trait, reading API keys from the usual
//! environment variables. This adapter turns that chat interface into the
//! two calls the pipelines need. Images are sent as base64 PNG with
//! `detail: "high"` so GPT-4-class models see fine print.

use crate::config::EndpointConfig;
use crate::error::FlashcardError;
use crate::inference::{non_empty, InferenceBackend};
use crate::pipeline::encode::to_base64;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// An `edgequake-llm` provider plus the options used for every call.
pub struct HostedBackend {
    provider: Arc<dyn LLMProvider>,
    name: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl HostedBackend {
    /// Create the named provider (`"openai"`, `"anthropic"`, …) for the endpoint's model.
    pub fn new(name: &str, endpoint: &EndpointConfig) -> Result<Self, FlashcardError> {
        let provider = ProviderFactory::create_llm_provider(name, &endpoint.model).map_err(|e| {
            FlashcardError::InvalidConfig(format!(
                "LLM provider '{name}' is not configured: {e}"
            ))
        })?;
        Ok(Self::with_provider(provider, name, endpoint))
    }

    /// Wrap an already constructed provider.
    pub fn with_provider(
        provider: Arc<dyn LLMProvider>,
        name: &str,
        endpoint: &EndpointConfig,
    ) -> Self {
        Self {
            provider,
            name: name.to_string(),
            model: endpoint.model.clone(),
            temperature: endpoint.temperature,
            timeout: Duration::from_secs(endpoint.timeout_secs),
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            ..Default::default()
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, FlashcardError> {
        let options = self.options();
        let call = self.provider.chat(&messages, Some(&options));
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(FlashcardError::InferenceTimeout {
                endpoint: self.endpoint(),
                secs: self.timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(FlashcardError::Inference {
                endpoint: self.endpoint(),
                detail: e.to_string(),
            }),
            Ok(Ok(response)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    self.endpoint(),
                    response.prompt_tokens,
                    response.completion_tokens
                );
                non_empty(&self.endpoint(), response.content)
            }
        }
    }
}

#[async_trait]
impl InferenceBackend for HostedBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, FlashcardError> {
        self.chat(vec![ChatMessage::user(prompt)]).await
    }

    async fn generate_from_image(
        &self,
        prompt: &str,
        png: &[u8],
    ) -> Result<String, FlashcardError> {
        let image = ImageData::new(to_base64(png), "image/png").with_detail("high");
        self.chat(vec![ChatMessage::user_with_images(prompt, vec![image])])
            .await
    }

    fn endpoint(&self) -> String {
        format!("{} ({})", self.name, self.model)
    }
}
