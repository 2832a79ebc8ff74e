//! Knowledge item construction.
//!
//! Turns a [`FileInfo`] into a [`KnowledgeItem`]: gates the path, resolves the
//! file type, runs the analyzer, then derives id, title, tags and the
//! formatted content body.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::analysis::ContentAnalyzer;
use crate::processing::{Language, PatternMatcher};
use crate::types::{ContentAnalysis, ExtractionConfig, FileInfo, KnowledgeItem, KnowledgeMetadata};

/// Path substrings that each contribute a tag of the same name.
const PATH_TAGS: &[&str] = &[
    "test",
    "api",
    "component",
    "util",
    "config",
    "service",
    "model",
    "controller",
];

/// Dependency substrings that each contribute a tag of the same name.
const DEPENDENCY_TAGS: &[&str] = &["react", "express", "typescript"];

const COMPLEX_THRESHOLD: usize = 10;
const SIMPLE_THRESHOLD: usize = 3;

/// Builds knowledge items from source files.
#[derive(Debug, Clone)]
pub struct KnowledgeExtractor {
    matcher: PatternMatcher,
    analyzer: ContentAnalyzer,
}

impl Default for KnowledgeExtractor {
    fn default() -> Self {
        Self::new(Arc::new(ExtractionConfig::default()))
    }
}

impl KnowledgeExtractor {
    /// Create an extractor from the shared extraction configuration.
    pub fn new(config: Arc<ExtractionConfig>) -> Self {
        Self {
            matcher: PatternMatcher::new(&config),
            analyzer: ContentAnalyzer::new(config),
        }
    }

    /// Check whether a path passes the include/exclude patterns.
    pub fn is_eligible(&self, path: &str) -> bool {
        self.matcher.is_eligible(path)
    }

    /// The pattern matcher gating extraction.
    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Build a knowledge item, or `None` when the path is not eligible.
    pub fn extract(&self, file: &FileInfo) -> Option<KnowledgeItem> {
        if !self.matcher.is_eligible(&file.file_path) {
            debug!(
                repository = %file.repository,
                path = %file.file_path,
                "Skipping ineligible file"
            );
            return None;
        }

        let content_hash = content_hash(&file.content);
        let file_type = Language::from_path(&file.file_path);
        let analysis = self.analyzer.analyze(&file.content, file_type.as_str());

        let item = KnowledgeItem {
            id: knowledge_id(&file.repository, &file.file_path),
            title: build_title(&file.file_path, &analysis),
            content: format_content(&file.file_path, &file.content, &analysis),
            metadata: KnowledgeMetadata {
                repository: file.repository.clone(),
                path: file.file_path.clone(),
                file_type: file_type.as_str().to_string(),
                last_modified: file.last_modified,
                content_hash,
                tags: build_tags(&file.file_path, &analysis),
                language: analysis.language.clone(),
                framework: analysis.framework.clone(),
                dependencies: analysis.dependencies.clone(),
            },
        };

        debug!(
            id = %item.id,
            file_type = %item.metadata.file_type,
            complexity = analysis.complexity,
            tags = item.metadata.tags.len(),
            "Extracted knowledge item"
        );

        Some(item)
    }
}

/// Derive the stable id of a (repository, path) pair.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`.
pub fn knowledge_id(repository: &str, path: &str) -> String {
    format!("{}_{}", sanitize(repository), sanitize(path))
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// SHA-256 of the raw content, lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Main function, else main class, else up to two exports, else basename.
fn build_title(path: &str, analysis: &ContentAnalysis) -> String {
    let name = basename(path);

    if let Some(function) = &analysis.main_function {
        format!("{} - {}", name, function)
    } else if let Some(class) = &analysis.main_class {
        format!("{} - {}", name, class)
    } else if !analysis.exports.is_empty() {
        let exports: Vec<&str> = analysis.exports.iter().take(2).map(String::as_str).collect();
        format!("{} - {}", name, exports.join(", "))
    } else {
        name.to_string()
    }
}

fn build_tags(path: &str, analysis: &ContentAnalysis) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    for keyword in PATH_TAGS {
        if path.contains(keyword) {
            tags.insert(keyword.to_string());
        }
    }

    tags.insert(analysis.language.clone());

    if let Some(framework) = &analysis.framework {
        tags.insert(framework.to_lowercase());
    }

    if !analysis.functions.is_empty() {
        tags.insert("functions".to_string());
    }
    if !analysis.classes.is_empty() {
        tags.insert("classes".to_string());
    }

    // 4..=10 gets neither tag
    if analysis.complexity > COMPLEX_THRESHOLD {
        tags.insert("complex".to_string());
    } else if analysis.complexity <= SIMPLE_THRESHOLD {
        tags.insert("simple".to_string());
    }

    for keyword in DEPENDENCY_TAGS {
        if analysis.dependencies.iter().any(|dep| dep.contains(keyword)) {
            tags.insert(keyword.to_string());
        }
    }

    tags
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None".to_string()
    } else {
        values.join(", ")
    }
}

fn format_content(path: &str, raw: &str, analysis: &ContentAnalysis) -> String {
    format!(
        "File: {path}\n\
         Language: {language}\n\
         Framework: {framework}\n\
         Summary: {summary}\n\
         \n\
         Dependencies: {dependencies}\n\
         Functions: {functions}\n\
         Classes: {classes}\n\
         Complexity: {complexity}\n\
         \n\
         Content:\n\
         {raw}",
        path = path,
        language = analysis.language,
        framework = analysis.framework.as_deref().unwrap_or("None"),
        summary = analysis.summary,
        dependencies = list_or_none(&analysis.dependencies),
        functions = list_or_none(&analysis.functions),
        classes = list_or_none(&analysis.classes),
        complexity = analysis.complexity,
        raw = raw,
    )
}
