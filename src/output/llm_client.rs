//! LLM completion clients.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ExtractError, Result};

/// A single, non-streaming completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
}

/// Source of completions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Return the generated text for `request`.
    async fn complete(&self, request: &LlmRequest) -> Result<String>;
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ExtractError::Llm(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        info!(model = %request.model, prompt_chars = request.prompt.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &request.model,
                prompt: &request.prompt,
                system: request.system.as_deref(),
                stream: false,
            })
            .send()
            .await
            .map_err(|e| ExtractError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Llm(format!("LLM service returned {}: {}", status, text)));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Llm(format!("malformed response: {}", e)))?;

        debug!(eval_count = ?result.eval_count, "Received completion");
        Ok(result.response)
    }
}
