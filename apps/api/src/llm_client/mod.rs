//! LLM Client: the single point of entry for all Gemini API calls in DevCost.
//!
//! ARCHITECTURAL RULE: No other module may call the Generative Language API directly.
//! Services depend on the `GenerativeModel` trait; `LlmClient` is the production
//! implementation and tests substitute a scripted fake.
//!
//! Models are hardcoded per call type to prevent drift.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

pub mod json_extract;
pub mod prompts;
pub mod wire;

pub use wire::{Content, GenerateRequest, Part, Role};

use wire::{GenerateResponse, GoogleErrorEnvelope};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Search-grounded wage lookup. Fast model; search tool enabled.
pub const MARKET_DATA_MODEL: &str = "gemini-2.5-flash";
/// Schema-constrained estimation with extended thinking.
pub const ESTIMATION_MODEL: &str = "gemini-3-pro-preview";
pub const CHAT_MODEL: &str = "gemini-3-pro-preview";
/// Tokens the estimation model may spend deliberating before it answers.
pub const THINKING_BUDGET: u32 = 16_000;
const MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Prompt blocked: {0}")]
    Blocked(String),
}

/// Text-in, text-out access to a generative model.
///
/// Carried in `AppState` as `Arc<dyn GenerativeModel>`.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Sends one request and returns the answer text (thought parts excluded).
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError>;
}

/// Production client for the Generative Language REST API.
/// Wraps `generateContent` with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_base: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    /// Makes a raw call, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let url = self.endpoint(&request.model);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Gemini call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Gemini API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let llm_response: GenerateResponse = serde_json::from_str(&body)?;

            if let Some(usage) = &llm_response.usage_metadata {
                debug!(
                    "Gemini call succeeded: model={}, prompt_tokens={:?}, output_tokens={:?}, thought_tokens={:?}",
                    request.model,
                    usage.prompt_token_count,
                    usage.candidates_token_count,
                    usage.thoughts_token_count
                );
            }

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl GenerativeModel for LlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let response = self.call(request).await?;
        if let Some(reason) = response.block_reason() {
            return Err(LlmError::Blocked(reason.to_string()));
        }
        if let Some(candidate) = response.candidates.first() {
            if candidate.finish_reason.as_deref() == Some("SAFETY") {
                return Err(LlmError::Blocked("response blocked by safety filters".to_string()));
            }
        }
        response.text().ok_or(LlmError::EmptyContent)
    }
}
