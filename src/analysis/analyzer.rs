//! Static, regex-driven analysis of file text.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use super::patterns::{
    BLOCK_COMMENT_PATTERN, BRANCH_PATTERN, CLASS_PATTERN, DEPENDENCY_PATTERNS, EXPORT_PATTERN,
    FRAMEWORK_SIGNATURES, JS_FUNCTION_PATTERN, LOGICAL_OPERATOR_PATTERN, PYTHON_FUNCTION_PATTERN,
};
use crate::types::{ContentAnalysis, ExtractionConfig, LanguageConfig};
use crate::SUMMARY_MAX_CHARS;

/// Number of leading lines used when a file has no comments to summarise.
const FALLBACK_SUMMARY_LINES: usize = 3;

/// `#` words that start C preprocessor lines rather than comments.
const PREPROCESSOR_DIRECTIVES: &[&str] = &[
    "include", "define", "undef", "if", "ifdef", "ifndef", "elif", "else", "endif", "pragma", "import",
    "error",
];

/// Analyzer producing a [`ContentAnalysis`] for a file's text.
///
/// Analysis is total: nothing here fails, missing constructs simply leave
/// the corresponding fields empty.
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    config: Arc<ExtractionConfig>,
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(ExtractionConfig::default()))
    }
}

impl ContentAnalyzer {
    /// Create an analyzer bound to the shared extraction configuration.
    pub fn new(config: Arc<ExtractionConfig>) -> Self {
        Self { config }
    }

    /// Language metadata registered under the given file-type tag.
    pub fn language_config(&self, file_type: &str) -> Option<&LanguageConfig> {
        self.config.languages.get(file_type)
    }

    /// Analyze content previously resolved to `file_type`.
    pub fn analyze(&self, content: &str, file_type: &str) -> ContentAnalysis {
        let functions = extract_functions(content);
        let classes = extract_classes(content);

        ContentAnalysis {
            language: file_type.to_string(),
            framework: detect_framework(content).map(String::from),
            dependencies: extract_dependencies(content),
            exports: extract_exports(content),
            main_function: functions.first().cloned(),
            main_class: classes.first().cloned(),
            functions,
            classes,
            summary: extract_summary(content),
            complexity: complexity_score(content),
        }
    }
}

/// Return the first framework, in table order, with a matching signature.
pub fn detect_framework(content: &str) -> Option<&'static str> {
    FRAMEWORK_SIGNATURES
        .iter()
        .find(|(_, signatures)| signatures.iter().any(|sig| sig.is_match(content)))
        .map(|(name, _)| *name)
}

/// Collect imported modules from all import families, each listed once.
pub fn extract_dependencies(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dependencies = Vec::new();

    for (_, family) in DEPENDENCY_PATTERNS.iter() {
        for pattern in family {
            for name in captured_names(pattern, content) {
                if seen.insert(name.clone()) {
                    dependencies.push(name);
                }
            }
        }
    }

    dependencies
}

/// Collect exported names. Repeated exports are kept.
pub fn extract_exports(content: &str) -> Vec<String> {
    captured_names(&EXPORT_PATTERN, content)
}

/// Collect function names: JavaScript forms first, then Python `def`.
pub fn extract_functions(content: &str) -> Vec<String> {
    let mut functions = captured_names(&JS_FUNCTION_PATTERN, content);
    functions.extend(captured_names(&PYTHON_FUNCTION_PATTERN, content));
    functions
}

/// Collect class names.
///
/// The JS/TS pass and the Python pass share one pattern, so every class
/// appears twice. Callers may rely on the first entry being the first class.
pub fn extract_classes(content: &str) -> Vec<String> {
    let mut classes = captured_names(&CLASS_PATTERN, content);
    classes.extend(captured_names(&CLASS_PATTERN, content));
    classes
}

/// Summarise a file from its comments or, failing that, its first lines.
pub fn extract_summary(content: &str) -> String {
    let summary = block_comment_summary(content)
        .or_else(|| line_comment_summary(content))
        .unwrap_or_else(|| {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(FALLBACK_SUMMARY_LINES)
                .collect::<Vec<_>>()
                .join(" ")
        });

    truncate_chars(&summary, SUMMARY_MAX_CHARS)
}

/// Count branching keywords followed by `(` and every `&&` / `||`.
pub fn complexity_score(content: &str) -> usize {
    BRANCH_PATTERN.find_iter(content).count() + LOGICAL_OPERATOR_PATTERN.find_iter(content).count()
}

/// For every match, take the first capture group that participated.
fn captured_names(pattern: &Regex, content: &str) -> Vec<String> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .find(|s| !s.is_empty())
                .map(String::from)
        })
        .collect()
}

fn block_comment_summary(content: &str) -> Option<String> {
    let body = BLOCK_COMMENT_PATTERN.captures(content)?.get(1)?.as_str();

    let text = body
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!text.is_empty()).then_some(text)
}

fn line_comment_summary(content: &str) -> Option<String> {
    let mut parts = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Shebang
        if index == 0 && line.starts_with("#!") {
            continue;
        }

        let text = if let Some(rest) = line.strip_prefix("//") {
            rest.trim_start_matches('/')
        } else if is_hash_comment(line) {
            line.trim_start_matches('#')
        } else {
            break;
        };

        let text = text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
    }

    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Lines starting with `#` are comments, except attributes (`#[`),
/// shebangs and C preprocessor directives.
fn is_hash_comment(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('#') else {
        return false;
    };
    if rest.starts_with('[') || rest.starts_with('!') {
        return false;
    }

    let word: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    !PREPROCESSOR_DIRECTIVES.contains(&word.as_str())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
