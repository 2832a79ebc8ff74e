//! Writes knowledge items into a vector store.
//!
//! Each item is chunked, every chunk is embedded, and the chunks are stored
//! as `"<item id>_chunk_<index>"`. Updating an item deletes all of its
//! chunks before re-adding, so a shorter file leaves no stale chunks.

use std::sync::Arc;

use tracing::{debug, info};

use super::store::{ChunkMetadata, SearchHit, VectorRecord, VectorStore};
use crate::chunkers::Chunker;
use crate::error::{ExtractError, Result};
use crate::output::EmbeddingProvider;
use crate::types::KnowledgeItem;

/// Storage collaborator for knowledge items.
pub struct KnowledgeIndexer {
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    max_chunk_size: usize,
}

impl KnowledgeIndexer {
    /// Create a new indexer.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            max_chunk_size,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Chunk, embed and store an item. Returns the number of chunks written.
    pub async fn add_item(&self, item: &KnowledgeItem) -> Result<usize> {
        let chunks = self.chunker.chunk(&item.content, self.max_chunk_size)?;
        let embeddings = self.embedder.embed(&chunks).await?;

        if embeddings.len() != chunks.len() {
            return Err(ExtractError::Embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        let total_chunks = chunks.len();
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| VectorRecord {
                id: chunk_id(&item.id, index),
                text,
                embedding,
                metadata: ChunkMetadata {
                    original_id: item.id.clone(),
                    chunk_index: index,
                    total_chunks,
                    title: item.title.clone(),
                    item: item.metadata.clone(),
                },
            })
            .collect();

        self.store.upsert(records).await?;

        info!(id = %item.id, chunks = total_chunks, "Indexed knowledge item");
        Ok(total_chunks)
    }

    /// Replace an item: delete its chunks, then add it again.
    pub async fn update_item(&self, item: &KnowledgeItem) -> Result<usize> {
        let removed = self.store.delete_by_original_id(&item.id).await?;
        debug!(id = %item.id, removed, "Removed previous chunks");
        self.add_item(item).await
    }

    /// Remove every chunk of an item. Returns the number removed.
    pub async fn remove_item(&self, item_id: &str) -> Result<usize> {
        let removed = self.store.delete_by_original_id(item_id).await?;
        info!(id = %item_id, removed, "Removed knowledge item");
        Ok(removed)
    }

    /// Embed a query and return the closest chunks.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let mut embeddings = self.embedder.embed(&[query.to_string()]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| ExtractError::Embedding("no embedding for query".to_string()))?;

        self.store.search(&embedding, top_k).await
    }
}

/// Store key of the `index`th chunk of an item.
pub fn chunk_id(item_id: &str, index: usize) -> String {
    format!("{}_chunk_{}", item_id, index)
}
