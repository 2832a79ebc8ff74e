//! Core types for the knowledge pipeline.

mod config;
mod knowledge;
mod source;

pub use config::{CommentMarkers, ExtractionConfig, LanguageConfig, ServiceConfig};
pub use knowledge::{ContentAnalysis, KnowledgeItem, KnowledgeMetadata};
pub use source::{
    FileInfo, IngestJobStatus, IngestJobStatusResponse, StartIngestJobRequest,
    StartIngestJobResponse,
};
