//! Knowledge item and analysis definitions.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of statically analysing one file's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// File-type tag the analysis was run for
    pub language: String,

    /// First framework whose signature matched
    pub framework: Option<String>,

    /// Imported modules, each listed once
    pub dependencies: Vec<String>,

    /// Exported symbol names in match order
    pub exports: Vec<String>,

    /// Function names in match order
    pub functions: Vec<String>,

    /// Class names in match order
    pub classes: Vec<String>,

    /// First detected function
    pub main_function: Option<String>,

    /// First detected class
    pub main_class: Option<String>,

    /// Short description, at most 200 characters
    pub summary: String,

    /// Branching-token count
    pub complexity: usize,
}

/// A file turned into a storable unit of knowledge.
///
/// Items are never partially built and never mutated once built. The `id`
/// depends only on repository and path, so a re-extracted file replaces
/// its previous version in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Deterministic identifier derived from repository and path
    pub id: String,

    /// Display title
    pub title: String,

    /// Formatted body: header block followed by the original file text
    pub content: String,

    /// Descriptive metadata
    pub metadata: KnowledgeMetadata,
}

/// Metadata stored alongside a knowledge item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeMetadata {
    /// Repository identifier
    pub repository: String,

    /// Path relative to the repository root
    pub path: String,

    /// File-type tag resolved from the extension
    pub file_type: String,

    /// When the source file was last modified
    pub last_modified: DateTime<Utc>,

    /// SHA-256 of the raw file content, hex encoded
    pub content_hash: String,

    /// Search tags
    pub tags: BTreeSet<String>,

    /// Language tag
    pub language: String,

    /// Detected framework
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// Imported modules
    pub dependencies: Vec<String>,
}

impl KnowledgeItem {
    /// Check whether the item carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.contains(tag)
    }
}
