//! HTTP surface.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

pub use handlers::AppState;

/// Build the application routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Single-file extraction
        .route("/extract", post(handlers::extract))
        // Ingestion jobs
        .route("/ingest/jobs", post(handlers::start_ingest_job))
        .route("/ingest/jobs/:job_id", get(handlers::get_job_status))
        .route("/ingest/local", post(handlers::ingest_local))
        // Index maintenance and retrieval
        .route("/items/:item_id", delete(handlers::remove_item))
        .route("/search", post(handlers::search))
        .route("/ask", post(handlers::ask))
        // Sources
        .route("/webhooks/github", post(handlers::github_webhook))
        .with_state(state)
}
