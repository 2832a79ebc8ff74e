//! Processing module for path gating and file-type resolution.
//!
//! This module provides:
//! - Include/exclude glob matching for repository paths
//! - Binary content detection
//! - File-type resolution from extensions

pub mod filter;
pub mod language;

pub use filter::{is_binary_content, PatternMatcher};
pub use language::Language;
