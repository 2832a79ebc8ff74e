//! File-type resolution from extensions.
//!
//! The resolved tag is used as the language of a knowledge item. Unknown
//! extensions resolve to [`Language::Unknown`] instead of failing.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// File types known to the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    // Programming languages
    JavaScript,
    TypeScript,
    Python,
    Java,
    Go,
    Rust,
    Ruby,
    Php,
    C,
    Cpp,
    CSharp,
    Kotlin,
    Swift,
    Scala,
    Vue,

    // Markup/Config
    Html,
    Css,
    Markdown,
    Json,
    Yaml,
    Toml,
    Xml,

    // Shell/Script
    Shell,
    Sql,

    // Unknown/Plain text
    Unknown,
}

impl Language {
    /// Resolve the file type of a path from its extension.
    pub fn from_path(path: &str) -> Self {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Resolve a file type from an extension, with or without the dot.
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "py" | "pyi" => Language::Python,
            "java" => Language::Java,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "cs" => Language::CSharp,
            "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            "scala" => Language::Scala,
            "vue" => Language::Vue,
            "html" | "htm" => Language::Html,
            "css" | "scss" | "less" => Language::Css,
            "md" | "markdown" => Language::Markdown,
            "json" => Language::Json,
            "yml" | "yaml" => Language::Yaml,
            "toml" => Language::Toml,
            "xml" => Language::Xml,
            "sh" | "bash" | "zsh" => Language::Shell,
            "sql" => Language::Sql,
            _ => Language::Unknown,
        }
    }

    /// Get the file-type tag for this language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Scala => "scala",
            Language::Vue => "vue",
            Language::Html => "html",
            Language::Css => "css",
            Language::Markdown => "markdown",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Xml => "xml",
            Language::Shell => "shell",
            Language::Sql => "sql",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
