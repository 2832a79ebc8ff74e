//! Configuration types for extraction and the service around it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_SEARCH_TOP_K};

/// Process-wide extraction configuration.
///
/// Built once at startup and shared read-only by the pattern matcher and
/// the extractor. Exclude patterns always take precedence over includes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Glob patterns a path must match to be extracted.
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,

    /// Glob patterns that reject a path outright.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Per-language metadata, keyed by language name.
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, LanguageConfig>,
}

/// Descriptive metadata about a language.
///
/// The analyzer does not branch on these markers; they travel with the
/// configuration for callers that want them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub comment_markers: CommentMarkers,
    #[serde(default)]
    pub import_markers: Vec<String>,
    #[serde(default)]
    pub function_markers: Vec<String>,
    #[serde(default)]
    pub class_markers: Vec<String>,
}

/// Comment delimiters for a language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentMarkers {
    pub single_line: Option<String>,
    pub block_start: Option<String>,
    pub block_end: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            include_patterns: default_include_patterns(),
            exclude_patterns: default_exclude_patterns(),
            languages: default_languages(),
        }
    }
}

impl ExtractionConfig {
    /// Load the configuration from a JSON file, or use the defaults.
    ///
    /// `EXTRACT_INCLUDE_PATTERNS` and `EXTRACT_EXCLUDE_PATTERNS`
    /// (comma-separated) replace the respective lists when set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ExtractError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };

        if let Some(patterns) = list_from_env("EXTRACT_INCLUDE_PATTERNS") {
            config.include_patterns = patterns;
        }
        if let Some(patterns) = list_from_env("EXTRACT_EXCLUDE_PATTERNS") {
            config.exclude_patterns = patterns;
        }

        Ok(config)
    }

    /// Replace the include patterns.
    pub fn with_include_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the exclude patterns.
    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }
}

fn list_from_env(key: &str) -> Option<Vec<String>> {
    let raw = std::env::var(key).ok()?;
    let patterns: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();
    (!patterns.is_empty()).then_some(patterns)
}

fn paths_from_env(key: &str) -> Vec<PathBuf> {
    list_from_env(key)
        .unwrap_or_default()
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

fn default_include_patterns() -> Vec<String> {
    [
        "*.js", "*.jsx", "*.ts", "*.tsx", "*.py", "*.java", "*.go", "*.rs",
        "*.rb", "*.php", "*.c", "*.cpp", "*.h", "*.cs", "*.kt", "*.swift",
        "*.scala", "*.vue", "*.md", "*.json", "*.yml", "*.yaml", "*.toml",
        "*.sql", "*.sh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    [
        // Dependencies and VCS
        "node_modules/**",
        ".git/**",
        "__pycache__/**",
        // Build output
        "dist/**",
        "build/**",
        "target/**",
        "coverage/**",
        // Generated
        "*.min.js",
        "*.lock",
        "package-lock.json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn markers(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn c_style_comments() -> CommentMarkers {
    CommentMarkers {
        single_line: Some("//".to_string()),
        block_start: Some("/*".to_string()),
        block_end: Some("*/".to_string()),
    }
}

fn default_languages() -> BTreeMap<String, LanguageConfig> {
    let mut languages = BTreeMap::new();

    languages.insert(
        "javascript".to_string(),
        LanguageConfig {
            extensions: markers(&[".js", ".jsx", ".mjs", ".cjs"]),
            comment_markers: c_style_comments(),
            import_markers: markers(&["import", "require("]),
            function_markers: markers(&["function", "=>"]),
            class_markers: markers(&["class"]),
        },
    );

    languages.insert(
        "typescript".to_string(),
        LanguageConfig {
            extensions: markers(&[".ts", ".tsx"]),
            comment_markers: c_style_comments(),
            import_markers: markers(&["import"]),
            function_markers: markers(&["function", "=>"]),
            class_markers: markers(&["class", "interface"]),
        },
    );

    languages.insert(
        "python".to_string(),
        LanguageConfig {
            extensions: markers(&[".py"]),
            comment_markers: CommentMarkers {
                single_line: Some("#".to_string()),
                block_start: Some("\"\"\"".to_string()),
                block_end: Some("\"\"\"".to_string()),
            },
            import_markers: markers(&["import", "from"]),
            function_markers: markers(&["def"]),
            class_markers: markers(&["class"]),
        },
    );

    languages.insert(
        "java".to_string(),
        LanguageConfig {
            extensions: markers(&[".java"]),
            comment_markers: c_style_comments(),
            import_markers: markers(&["import"]),
            function_markers: markers(&["public", "private", "protected"]),
            class_markers: markers(&["class", "interface", "enum"]),
        },
    );

    languages.insert(
        "go".to_string(),
        LanguageConfig {
            extensions: markers(&[".go"]),
            comment_markers: c_style_comments(),
            import_markers: markers(&["import"]),
            function_markers: markers(&["func"]),
            class_markers: markers(&["type", "struct"]),
        },
    );

    languages.insert(
        "rust".to_string(),
        LanguageConfig {
            extensions: markers(&[".rs"]),
            comment_markers: c_style_comments(),
            import_markers: markers(&["use", "extern crate"]),
            function_markers: markers(&["fn"]),
            class_markers: markers(&["struct", "enum", "trait", "impl"]),
        },
    );

    languages
}

const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 500;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_LLM_MODEL: &str = "llama3";

/// Settings for the HTTP service and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port the HTTP server listens on
    pub port: u16,

    /// URL of the embedding service
    pub embedding_service_url: Option<String>,

    /// Soft maximum chunk size in characters
    pub max_chunk_size: usize,

    /// Optional JSON file holding an `ExtractionConfig`
    pub extraction_config_path: Option<String>,

    /// Shared secret for GitHub webhook signatures
    pub github_webhook_secret: Option<String>,

    /// Number of results returned by search when not specified
    pub search_top_k: usize,

    /// Repository name used for local directory scans
    pub default_repository: String,

    /// Directories `/ingest/local` may read from; empty disables it
    pub local_source_roots: Vec<PathBuf>,

    /// Directories watched for changes
    pub watch_paths: Vec<PathBuf>,

    /// Quiet period before a burst of file events is ingested
    pub watch_debounce_ms: u64,

    /// Base URL of the GitHub REST API
    pub github_api_url: String,

    /// Token for fetching file contents from GitHub
    pub github_token: Option<String>,

    /// URL of the LLM service answering questions
    pub llm_service_url: Option<String>,

    /// Model name passed to the LLM service
    pub llm_model: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3017,
            embedding_service_url: None,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            extraction_config_path: None,
            github_webhook_secret: None,
            search_top_k: DEFAULT_SEARCH_TOP_K,
            default_repository: "local".to_string(),
            local_source_roots: Vec::new(),
            watch_paths: Vec::new(),
            watch_debounce_ms: DEFAULT_WATCH_DEBOUNCE_MS,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_token: None,
            llm_service_url: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3017),
            embedding_service_url: std::env::var("EMBEDDING_SERVICE_URL").ok(),
            max_chunk_size: std::env::var("MAX_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&size| size > 0)
                .unwrap_or(DEFAULT_MAX_CHUNK_SIZE),
            extraction_config_path: std::env::var("EXTRACTION_CONFIG_PATH").ok(),
            github_webhook_secret: std::env::var("GITHUB_WEBHOOK_SECRET").ok(),
            search_top_k: std::env::var("SEARCH_TOP_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SEARCH_TOP_K),
            default_repository: std::env::var("DEFAULT_REPOSITORY")
                .unwrap_or_else(|_| "local".to_string()),
            local_source_roots: paths_from_env("LOCAL_SOURCE_ROOTS"),
            watch_paths: paths_from_env("WATCH_PATHS"),
            watch_debounce_ms: std::env::var("WATCH_DEBOUNCE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WATCH_DEBOUNCE_MS),
            github_api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string()),
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            llm_service_url: std::env::var("LLM_SERVICE_URL").ok(),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
        }
    }

    /// Settings that leave the service less protected or less capable
    /// than a full deployment.
    pub fn startup_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.github_webhook_secret.is_none() {
            warnings.push("GITHUB_WEBHOOK_SECRET not set, webhook deliveries are accepted without authentication");
        }
        if self.local_source_roots.is_empty() {
            warnings.push("LOCAL_SOURCE_ROOTS not set, local directory ingestion is disabled");
        }
        warnings
    }
}
