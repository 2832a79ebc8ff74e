//! Error types for the knowledge pipeline.

use thiserror::Error;

/// Errors raised by the pipeline and its storage collaborators.
///
/// Ineligible files and unusual content are not errors: extraction returns
/// `None` or an analysis with empty fields instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A caller broke an operation's precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedding provider failed or returned malformed output.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector store rejected an operation.
    #[error("vector store error: {0}")]
    Store(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request touches something the service may not expose.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A collaborator is not configured.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The LLM service failed or returned malformed output.
    #[error("llm request failed: {0}")]
    Llm(String),

    /// The GitHub API failed.
    #[error("github request failed: {0}")]
    GitHub(String),

    /// A directory watch could not be set up.
    #[error("watch error: {0}")]
    Watch(String),

    /// A webhook payload did not carry a valid signature.
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
