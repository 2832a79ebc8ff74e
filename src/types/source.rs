//! Source file types and ingestion job request/response definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file handed to the extractor by a sourcing collaborator
/// (GitHub sync, local scan, file watcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Repository identifier (e.g. "owner/name" or a local label)
    pub repository: String,

    /// Path relative to the repository root, `/`-separated
    pub file_path: String,

    /// Raw text content
    pub content: String,

    /// When the file was last modified at its source
    pub last_modified: DateTime<Utc>,
}

impl FileInfo {
    /// Create a new file description.
    pub fn new(
        repository: impl Into<String>,
        file_path: impl Into<String>,
        content: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            repository: repository.into(),
            file_path: file_path.into(),
            content: content.into(),
            last_modified,
        }
    }
}

/// Request to start an ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartIngestJobRequest {
    /// Files to extract and index
    pub files: Vec<FileInfo>,
}

/// Response when starting an ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartIngestJobResponse {
    /// ID of the created job
    pub job_id: Uuid,

    /// Whether the job was accepted
    pub accepted: bool,

    /// Number of files queued
    pub files_count: usize,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestJobStatus {
    /// Job is queued but not started
    Pending,
    /// Job is currently running
    Running,
    /// Job completed successfully
    Completed,
    /// Job failed
    Failed,
}

/// Response with job status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJobStatusResponse {
    /// ID of the job
    pub job_id: Uuid,

    /// Current status
    pub status: IngestJobStatus,

    /// Total files submitted
    pub total_files: usize,

    /// Files looked at so far
    pub processed_files: usize,

    /// Files that were not eligible for extraction
    pub skipped_files: usize,

    /// Knowledge items written to the index
    pub items_indexed: usize,

    /// Chunks written to the index
    pub chunks_indexed: usize,

    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the job started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
