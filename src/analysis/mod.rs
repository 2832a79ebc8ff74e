//! Content analysis for knowledge extraction.
//!
//! This module provides:
//! - Framework detection from ordered signature tables
//! - Dependency, export, function and class extraction
//! - Comment-based summaries and a branch-count complexity score

pub mod analyzer;
pub mod patterns;

pub use analyzer::{
    complexity_score, detect_framework, extract_classes, extract_dependencies, extract_exports,
    extract_functions, extract_summary, ContentAnalyzer,
};
