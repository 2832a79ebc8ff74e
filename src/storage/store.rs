//! Vector store abstraction and an in-memory implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ExtractError, Result};
use crate::types::KnowledgeMetadata;

/// Metadata stored with every chunk record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Id of the knowledge item the chunk belongs to
    pub original_id: String,

    /// Position of the chunk within its item
    pub chunk_index: usize,

    /// Number of chunks the item was split into
    pub total_chunks: usize,

    /// Title of the parent item
    pub title: String,

    #[serde(flatten)]
    pub item: KnowledgeMetadata,
}

/// One chunk with its embedding, keyed `"<item id>_chunk_<index>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Storage for embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Delete every record belonging to the given item; returns how many.
    async fn delete_by_original_id(&self, original_id: &str) -> Result<usize>;

    /// Return the `top_k` records most similar to `embedding`.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;
}

/// Vector store held in process memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<BTreeMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.read().await.get(id).cloned()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn delete_by_original_id(&self, original_id: &str) -> Result<usize> {
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|_, record| record.metadata.original_id != original_id);
        Ok(before - stored.len())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let stored = self.records.read().await;

        let mut hits = Vec::with_capacity(stored.len());
        for record in stored.values() {
            if record.embedding.len() != embedding.len() {
                return Err(ExtractError::Store(format!(
                    "dimension mismatch for {}: stored {}, query {}",
                    record.id,
                    record.embedding.len(),
                    embedding.len()
                )));
            }
            hits.push(SearchHit {
                id: record.id.clone(),
                score: cosine_similarity(&record.embedding, embedding),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            });
        }

        // Records are visited in id order, so ties stay deterministic.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
