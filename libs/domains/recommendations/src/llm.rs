//! OpenAI-compatible chat completion client.

use async_trait::async_trait;
use core_config::llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{RecommendationError, RecommendationResult};

/// Trait for text completion.
///
/// The generator treats this client as optional and falls back to a
/// deterministic template when it is absent or failing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> RecommendationResult<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> RecommendationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecommendationError::Llm(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl ChatCompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> RecommendationResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.config.model, "Requesting chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecommendationError::Llm(format!("Request failed: {e}")))?
            .error_for_status()
            .map_err(|e| RecommendationError::Llm(format!("API error: {e}")))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RecommendationError::Llm(format!("Invalid response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RecommendationError::Llm("Empty choices in response".to_string()))
    }
}
