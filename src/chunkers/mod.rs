//! Chunking strategies for knowledge item content.

mod base;
mod line_chunker;

pub use base::Chunker;
pub use line_chunker::LineChunker;
