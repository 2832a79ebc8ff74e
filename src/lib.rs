//! Repository Knowledge Library
//!
//! Turns repository files into searchable knowledge items for RAG pipelines.
//! Each eligible file is analyzed (language, framework, dependencies,
//! functions, classes, summary, complexity), rendered into a self-describing
//! document, split into line-aligned chunks and indexed for retrieval.

pub mod analysis;
pub mod answer;
pub mod api;
pub mod batch;
pub mod chunkers;
pub mod error;
pub mod extractor;
pub mod jobs;
pub mod output;
pub mod processing;
pub mod sources;
pub mod storage;
pub mod types;

pub use analysis::ContentAnalyzer;
pub use answer::{Answer, QuestionAnswerer};
pub use batch::{BatchConfig, BatchExtractor, BatchResult};
pub use chunkers::{Chunker, LineChunker};
pub use error::{ExtractError, Result};
pub use extractor::{content_hash, knowledge_id, KnowledgeExtractor};
pub use processing::{Language, PatternMatcher};
pub use storage::KnowledgeIndexer;
pub use types::{ContentAnalysis, ExtractionConfig, FileInfo, KnowledgeItem, KnowledgeMetadata};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::types::*;
    pub use crate::analysis::ContentAnalyzer;
    pub use crate::chunkers::{Chunker, LineChunker};
    pub use crate::extractor::{content_hash, knowledge_id, KnowledgeExtractor};
    pub use crate::output::EmbeddingProvider;
    pub use crate::processing::PatternMatcher;
    pub use crate::storage::{KnowledgeIndexer, VectorStore};
    pub use crate::batch::*;
}

/// Default soft maximum chunk size in characters
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Summaries are cut to this many characters
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Default number of search results
pub const DEFAULT_SEARCH_TOP_K: usize = 5;

/// Maximum content size for single-pass processing (10MB)
pub const DEFAULT_MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024;
