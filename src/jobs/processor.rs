//! Job processor for background ingestion.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::store::{JobProgress, JobStore};
use crate::batch::BatchExtractor;
use crate::storage::KnowledgeIndexer;
use crate::types::FileInfo;

/// Extracts submitted files and writes the resulting items to the index.
pub struct IngestJobProcessor {
    batch: Arc<BatchExtractor>,
    indexer: Arc<KnowledgeIndexer>,
}

impl IngestJobProcessor {
    /// Create a new job processor.
    pub fn new(batch: Arc<BatchExtractor>, indexer: Arc<KnowledgeIndexer>) -> Self {
        Self { batch, indexer }
    }

    /// Process an ingestion job.
    ///
    /// Items are indexed with update semantics, so re-ingesting a file
    /// replaces its previous chunks. An item that fails to index does not
    /// stop the others; the job is marked failed afterwards.
    pub async fn process_job(&self, job_id: Uuid, files: Vec<FileInfo>, job_store: Arc<RwLock<JobStore>>) {
        info!(job_id = %job_id, files = files.len(), "Starting job processing");

        job_store.write().await.start_job(job_id);

        let (items, batch_result) = self.batch.extract_all(&files);

        let mut progress = JobProgress {
            processed_files: batch_result.skipped,
            skipped_files: batch_result.skipped,
            ..Default::default()
        };
        job_store.write().await.update_job_progress(job_id, progress);

        let mut failures = 0;
        let mut first_error = None;

        for item in &items {
            match self.indexer.update_item(item).await {
                Ok(chunks) => {
                    progress.items_indexed += 1;
                    progress.chunks_indexed += chunks;
                }
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        item_id = %item.id,
                        error = %e,
                        "Failed to index item, continuing with others"
                    );
                    failures += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }

            progress.processed_files += 1;
            job_store.write().await.update_job_progress(job_id, progress);
        }

        let mut store = job_store.write().await;
        match first_error {
            Some(e) => {
                error!(job_id = %job_id, failures, "Job finished with indexing failures");
                store.fail_job(
                    job_id,
                    format!("{} of {} items failed to index: {}", failures, items.len(), e),
                );
            }
            None => {
                info!(
                    job_id = %job_id,
                    items_indexed = progress.items_indexed,
                    chunks_indexed = progress.chunks_indexed,
                    skipped = progress.skipped_files,
                    "Job processing complete"
                );
                store.complete_job(job_id);
            }
        }
    }
}
