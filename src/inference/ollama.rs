//! Native Ollama client.
//!
//! Talks to `/api/chat` for page images (the image rides along in the user
//! message's `images` array as base64) and to `/api/generate` for plain text
//! prompts. Streaming is disabled so every call is one request and one JSON
//! response. `num_ctx` is sent with every request: Ollama otherwise falls back
//! to a 2k-4k context and silently truncates long documents.

use crate::config::EndpointConfig;
use crate::error::FlashcardError;
use crate::inference::{non_empty, InferenceBackend};
use crate::pipeline::encode::to_base64;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Ollama client bound to one host and model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    options: ModelOptions,
    timeout_secs: u64,
}

/// Model parameters sent as `options`.
#[derive(Debug, Clone, Serialize)]
struct ModelOptions {
    num_ctx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: &'a ModelOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a ModelOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl OllamaClient {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, FlashcardError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()
            .map_err(|e| FlashcardError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: endpoint.host.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            options: ModelOptions {
                num_ctx: endpoint.num_ctx,
                temperature: endpoint.temperature,
            },
            timeout_secs: endpoint.timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// POST `body` to `path` and decode the JSON answer.
    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, FlashcardError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(FlashcardError::Inference {
                endpoint: self.endpoint(),
                detail: format!("HTTP {status}: {}", truncate(&detail, 300)),
            });
        }

        let decoded = response
            .json::<R>()
            .await
            .map_err(|e| self.transport_error(e))?;
        debug!("{} {} answered in {:?}", self.model, path, start.elapsed());
        Ok(decoded)
    }

    fn transport_error(&self, e: reqwest::Error) -> FlashcardError {
        if e.is_timeout() {
            FlashcardError::InferenceTimeout {
                endpoint: self.endpoint(),
                secs: self.timeout_secs,
            }
        } else {
            FlashcardError::Inference {
                endpoint: self.endpoint(),
                detail: e.to_string(),
            }
        }
    }

    fn chat_request(&self, prompt: &str, png: &[u8]) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt.to_string(),
                images: vec![to_base64(png)],
            }],
            stream: false,
            options: &self.options,
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, FlashcardError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: &self.options,
        };
        let response: GenerateResponse = self.post("/api/generate", &request).await?;
        non_empty(&self.endpoint(), response.response)
    }

    async fn generate_from_image(
        &self,
        prompt: &str,
        png: &[u8],
    ) -> Result<String, FlashcardError> {
        let request = self.chat_request(prompt, png);
        let response: ChatResponse = self.post("/api/chat", &request).await?;
        non_empty(&self.endpoint(), response.message.content)
    }

    fn endpoint(&self) -> String {
        format!("{} ({})", self.host, self.model)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}
