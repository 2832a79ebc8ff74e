//! Job store for tracking ingestion job status.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{IngestJobStatus, IngestJobStatusResponse};

/// In-memory job store for tracking ingestion jobs.
pub struct JobStore {
    jobs: HashMap<Uuid, JobRecord>,
}

/// Progress counters reported by the processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobProgress {
    pub processed_files: usize,
    pub skipped_files: usize,
    pub items_indexed: usize,
    pub chunks_indexed: usize,
}

/// Internal record for tracking a job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: IngestJobStatus,
    pub total_files: usize,
    pub progress: JobProgress,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new job record.
    pub fn new(job_id: Uuid, total_files: usize) -> Self {
        Self {
            job_id,
            status: IngestJobStatus::Pending,
            total_files,
            progress: JobProgress::default(),
            error: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn start(&mut self) {
        self.status = IngestJobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = IngestJobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.status = IngestJobStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    /// Convert to response type.
    pub fn to_response(&self) -> IngestJobStatusResponse {
        IngestJobStatusResponse {
            job_id: self.job_id,
            status: self.status,
            total_files: self.total_files,
            processed_files: self.progress.processed_files,
            skipped_files: self.progress.skipped_files,
            items_indexed: self.progress.items_indexed,
            chunks_indexed: self.progress.chunks_indexed,
            error: self.error.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

impl JobStore {
    /// Create a new job store.
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    /// Create a new job and return its ID.
    ///
    /// Finished jobs past the retention window are dropped first.
    pub fn create_job(&mut self, total_files: usize) -> Uuid {
        self.cleanup_old_jobs();
        let job_id = Uuid::new_v4();
        self.jobs.insert(job_id, JobRecord::new(job_id, total_files));
        job_id
    }

    pub fn get_job(&self, job_id: Uuid) -> Option<&JobRecord> {
        self.jobs.get(&job_id)
    }

    pub fn start_job(&mut self, job_id: Uuid) -> bool {
        self.with_job(job_id, JobRecord::start)
    }

    pub fn update_job_progress(&mut self, job_id: Uuid, progress: JobProgress) -> bool {
        self.with_job(job_id, |job| job.progress = progress)
    }

    pub fn complete_job(&mut self, job_id: Uuid) -> bool {
        self.with_job(job_id, JobRecord::complete)
    }

    pub fn fail_job(&mut self, job_id: Uuid, error: String) -> bool {
        self.with_job(job_id, |job| job.fail(error))
    }

    /// Get job status as response.
    pub fn get_job_status(&self, job_id: Uuid) -> Option<IngestJobStatusResponse> {
        self.jobs.get(&job_id).map(|j| j.to_response())
    }

    /// Clean up finished jobs older than one hour.
    pub fn cleanup_old_jobs(&mut self) {
        let cutoff = Utc::now() - chrono::Duration::hours(1);
        self.jobs.retain(|_, job| match job.status {
            IngestJobStatus::Completed | IngestJobStatus::Failed => {
                job.completed_at.map_or(true, |t| t > cutoff)
            }
            _ => true,
        });
    }

    /// Get count of jobs by status.
    pub fn get_job_counts(&self) -> HashMap<IngestJobStatus, usize> {
        let mut counts = HashMap::new();
        for job in self.jobs.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }

    fn with_job(&mut self, job_id: Uuid, f: impl FnOnce(&mut JobRecord)) -> bool {
        match self.jobs.get_mut(&job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
