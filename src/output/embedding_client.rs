//! Embedding providers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ExtractError, Result};

/// Source of embedding vectors.
///
/// Implementations return exactly one vector per input text, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Embed each text.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Client for an HTTP embedding service.
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    batch_size: usize,
}

/// Request payload for the embedding service.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

/// Response from the embedding service.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbeddingClient {
    /// Create a new embedding client.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExtractError::Embedding(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_size: 50,
        })
    }

    /// Set the batch size for embedding requests.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Send a single batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { input: texts })
            .send()
            .await
            .map_err(|e| ExtractError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Embedding(format!(
                "embedding service returned {}: {}",
                status, text
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Embedding(format!("malformed response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(ExtractError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }

        Ok(result.embeddings)
    }

    /// Check if the embedding service is healthy.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        info!(texts = texts.len(), "Requesting embeddings");

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch(batch).await?;
            debug!(batch_size = batch.len(), "Batch embedded");
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpEmbeddingClient::new("http://localhost:3018/").unwrap();
        assert_eq!(client.batch_size, 50);
        assert_eq!(client.base_url, "http://localhost:3018");
    }

    #[test]
    fn test_batch_size_config() {
        let client = HttpEmbeddingClient::new("http://localhost:3018")
            .unwrap()
            .with_batch_size(0);
        assert_eq!(client.batch_size, 1);
    }

    #[tokio::test]
    async fn test_empty_input_needs_no_request() {
        let client = HttpEmbeddingClient::new("http://127.0.0.1:9").unwrap();
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_embedding_error() {
        let client = HttpEmbeddingClient::new("http://127.0.0.1:9").unwrap();
        let err = client.embed(&["text".to_string()]).await.unwrap_err();
        assert!(matches!(err, ExtractError::Embedding(_)));
        assert!(!client.health_check().await);
    }
}
