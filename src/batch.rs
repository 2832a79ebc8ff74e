//! Batch extraction over many files.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::extractor::KnowledgeExtractor;
use crate::types::{FileInfo, KnowledgeItem};

/// Configuration for batch extraction.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Files larger than this (bytes) are skipped
    pub max_content_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_content_size: crate::DEFAULT_MAX_CONTENT_SIZE,
        }
    }
}

/// Result of batch extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub extracted: usize,
    pub skipped: usize,
    /// Paths skipped, with the reason
    pub skipped_files: Vec<SkippedFile>,
}

/// A file that produced no knowledge item.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Runs the extractor over a set of files.
pub struct BatchExtractor {
    extractor: Arc<KnowledgeExtractor>,
    config: BatchConfig,
}

impl BatchExtractor {
    /// Create a new batch extractor.
    pub fn new(extractor: Arc<KnowledgeExtractor>, config: BatchConfig) -> Self {
        Self { extractor, config }
    }

    /// Extract every eligible file, preserving input order.
    pub fn extract_all(&self, files: &[FileInfo]) -> (Vec<KnowledgeItem>, BatchResult) {
        let mut items = Vec::with_capacity(files.len());
        let mut result = BatchResult {
            total_files: files.len(),
            ..Default::default()
        };

        info!(total_files = files.len(), "Starting batch extraction");

        for file in files {
            if file.content.len() > self.config.max_content_size {
                debug!(
                    path = %file.file_path,
                    content_size = file.content.len(),
                    "Content exceeds max size, skipping"
                );
                result.skip(&file.file_path, "content too large");
                continue;
            }

            match self.extractor.extract(file) {
                Some(item) => {
                    items.push(item);
                    result.extracted += 1;
                }
                None => result.skip(&file.file_path, "not eligible"),
            }
        }

        info!(
            extracted = result.extracted,
            skipped = result.skipped,
            "Batch extraction complete"
        );

        (items, result)
    }
}

impl BatchResult {
    fn skip(&mut self, path: &str, reason: &str) {
        self.skipped += 1;
        self.skipped_files.push(SkippedFile {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }
}
