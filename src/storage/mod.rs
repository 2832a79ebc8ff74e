//! Chunk storage and retrieval.

mod indexer;
mod store;

pub use indexer::{chunk_id, KnowledgeIndexer};
pub use store::{cosine_similarity, ChunkMetadata, InMemoryVectorStore, SearchHit, VectorRecord, VectorStore};
