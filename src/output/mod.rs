//! Embedding and completion providers.

mod embedding_client;
mod llm_client;
mod trigram_embedder;

pub use embedding_client::{EmbeddingProvider, HttpEmbeddingClient};
pub use llm_client::{LlmClient, LlmRequest, OllamaClient};
pub use trigram_embedder::{TrigramEmbedder, DEFAULT_TRIGRAM_DIMENSIONS};
