//! Ingestion job processing module.

mod processor;
mod store;

pub use processor::IngestJobProcessor;
pub use store::{JobProgress, JobRecord, JobStore};
