//! Path eligibility filtering.
//!
//! Decides whether a repository path should be extracted, using the
//! include/exclude glob lists from [`ExtractionConfig`], and flags content
//! that looks binary.

use regex::Regex;
use tracing::warn;

use crate::types::ExtractionConfig;

/// A glob pattern compiled to a regular expression.
#[derive(Debug, Clone)]
struct CompiledPattern {
    glob: String,
    regex: Regex,
}

/// Include/exclude glob matcher.
///
/// Globs are a deliberate simplification of shell globbing:
/// - `**` matches any sequence of characters, separators included
/// - `*` matches any sequence within one path segment
/// - `?` matches exactly one character
///
/// A pattern only has to match a suffix of the path, so `node_modules/**`
/// also rejects `web/node_modules/react/index.js`.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    include: Vec<CompiledPattern>,
    exclude: Vec<CompiledPattern>,
}

impl PatternMatcher {
    /// Compile the pattern lists from the given configuration.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            include: compile_all(&config.include_patterns),
            exclude: compile_all(&config.exclude_patterns),
        }
    }

    /// Create a matcher with the default pattern lists.
    pub fn with_defaults() -> Self {
        Self::new(&ExtractionConfig::default())
    }

    /// Check whether a path should be extracted.
    ///
    /// Exclusion is checked first and always wins; a path matching no
    /// include pattern is rejected.
    pub fn is_eligible(&self, path: &str) -> bool {
        if self.excluded_by(path).is_some() {
            return false;
        }

        self.include.iter().any(|p| p.regex.is_match(path))
    }

    /// Return the first exclude pattern matching the path, if any.
    pub fn excluded_by(&self, path: &str) -> Option<&str> {
        self.exclude
            .iter()
            .find(|p| p.regex.is_match(path))
            .map(|p| p.glob.as_str())
    }

    /// Whether every path under directory `dir` is excluded.
    ///
    /// Only `.../**` patterns are consulted: if `dir/` matches one, any
    /// `dir/<rest>` matches it too.
    pub fn excludes_directory(&self, dir: &str) -> bool {
        let dir = format!("{}/", dir.trim_end_matches('/'));
        self.exclude
            .iter()
            .any(|p| p.glob.ends_with("/**") && p.regex.is_match(&dir))
    }

    /// Number of usable include and exclude patterns.
    pub fn pattern_counts(&self) -> (usize, usize) {
        (self.include.len(), self.exclude.len())
    }
}

fn compile_all(globs: &[String]) -> Vec<CompiledPattern> {
    globs
        .iter()
        .filter_map(|glob| match Regex::new(&glob_to_regex(glob)) {
            Ok(regex) => Some(CompiledPattern {
                glob: glob.clone(),
                regex,
            }),
            Err(e) => {
                warn!(pattern = %glob, error = %e, "Skipping invalid glob pattern");
                None
            }
        })
        .collect()
}

/// Translate a glob into a regex anchored at the end of the path.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    out.push('$');
    out
}

/// Check if content appears to be binary.
pub fn is_binary_content(content: &[u8], sample_size: usize) -> bool {
    let sample = &content[..content.len().min(sample_size)];

    // Null bytes are a strong indicator
    if sample.contains(&0) {
        return true;
    }

    let non_printable = sample
        .iter()
        .filter(|&&b| b < 32 && !matches!(b, 9 | 10 | 13)) // tab, newline, carriage return
        .count();

    !sample.is_empty() && (non_printable as f64 / sample.len() as f64) > 0.1
}
