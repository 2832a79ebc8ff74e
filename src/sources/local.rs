//! Local directory scanning.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ExtractError, Result};
use crate::processing::{is_binary_content, PatternMatcher};
use crate::types::FileInfo;

/// Bytes sampled when checking for binary content.
const BINARY_SAMPLE_SIZE: usize = 8192;

/// Resolve a requested scan path to a directory inside one of `roots`.
///
/// Both sides are canonicalized first, so `..` segments and symlinks cannot
/// escape a root. No roots means local scanning is disabled.
pub fn resolve_within_roots(requested: &Path, roots: &[PathBuf]) -> Result<PathBuf> {
    if roots.is_empty() {
        return Err(ExtractError::Forbidden(
            "local scanning is disabled, no source roots configured".to_string(),
        ));
    }

    let resolved = requested.canonicalize().map_err(|e| {
        ExtractError::InvalidArgument(format!("cannot resolve {}: {}", requested.display(), e))
    })?;

    let allowed = roots
        .iter()
        .filter_map(|root| root.canonicalize().ok())
        .any(|root| resolved.starts_with(&root));

    if !allowed {
        return Err(ExtractError::Forbidden(format!(
            "{} is outside the configured source roots",
            requested.display()
        )));
    }

    Ok(resolved)
}

/// Walk `root` and return every eligible text file as a [`FileInfo`].
///
/// Paths are matched relative to `root` with `/` separators. Binary,
/// non-UTF-8 and unreadable files are skipped, as are directories excluded
/// by a `dir/**` pattern. Results are ordered by path.
pub fn scan_directory(root: &Path, repository: &str, matcher: &PatternMatcher) -> Result<Vec<FileInfo>> {
    if !root.is_dir() {
        return Err(ExtractError::InvalidArgument(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !matcher.excludes_directory(&relative_path(root, entry.path()))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative_path(root, entry.path());
        if !matcher.is_eligible(&rel) {
            continue;
        }

        let Some(content) = read_text_file(entry.path(), &rel) else {
            continue;
        };

        let last_modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|| Utc::now());

        files.push(FileInfo::new(repository, rel, content, last_modified));
    }

    info!(root = %root.display(), files = files.len(), "Scanned directory");
    Ok(files)
}

/// Read a file as UTF-8 text, or `None` when it is unreadable, binary or
/// not valid UTF-8.
pub(crate) fn read_text_file(path: &Path, rel: &str) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %rel, error = %e, "Skipping unreadable file");
            return None;
        }
    };

    if is_binary_content(&bytes, BINARY_SAMPLE_SIZE) {
        debug!(path = %rel, "Skipping binary file");
        return None;
    }

    match String::from_utf8(bytes) {
        Ok(content) => Some(content),
        Err(_) => {
            debug!(path = %rel, "Skipping non-UTF-8 file");
            None
        }
    }
}

/// `path` relative to `root`, `/`-separated.
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractionConfig;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_applies_matcher_on_relative_paths() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.js", b"export const a = 1;");
        write(dir.path(), "src/lib/util.py", b"def util():\n    pass\n");
        write(dir.path(), "node_modules/react/index.js", b"module.exports = {};");
        write(dir.path(), "README.md", b"# Title\n");
        write(dir.path(), "logo.png", b"\x89PNG\r\n\x1a\n\x00\x00");

        let files = scan_directory(dir.path(), "local", &PatternMatcher::with_defaults()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.file_path.as_str()).collect();

        assert_eq!(paths, vec!["README.md", "src/app.js", "src/lib/util.py"]);
        assert!(files.iter().all(|f| f.repository == "local"));
        assert_eq!(files[1].content, "export const a = 1;");
    }

    #[test]
    fn test_scan_agrees_with_matcher_for_single_char_patterns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/x.js", b"const x = 1;");
        write(dir.path(), "ab", b"excluded file");

        let config = ExtractionConfig::default()
            .with_include_patterns(["*.js", "ab"])
            .with_exclude_patterns(["a?"]);
        let matcher = PatternMatcher::new(&config);
        assert!(matcher.is_eligible("a/x.js"));

        let files = scan_directory(dir.path(), "r", &matcher).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a/x.js"]);
    }

    #[test]
    fn test_scan_skips_binary_and_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "data.json", b"{\"a\": 1}\x00\x00\x00");
        write(dir.path(), "notes.md", b"caf\xe9 au lait");
        write(dir.path(), "ok.md", b"fine");

        let files = scan_directory(dir.path(), "r", &PatternMatcher::with_defaults()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_path, "ok.md");
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_text_file(&dir.path().join("vanished.md"), "vanished.md"), None);
        // A directory cannot be read as a file either.
        assert_eq!(read_text_file(dir.path(), "."), None);
        write(dir.path(), "ok.md", b"fine");
        assert_eq!(read_text_file(&dir.path().join("ok.md"), "ok.md").as_deref(), Some("fine"));
    }

    #[test]
    fn test_scan_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = scan_directory(&missing, "r", &PatternMatcher::with_defaults()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidArgument(_)));
    }

    #[test]
    fn test_resolve_within_roots() {
        let allowed = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        fs::create_dir_all(allowed.path().join("repo")).unwrap();
        let roots = vec![allowed.path().to_path_buf()];

        let inside = resolve_within_roots(&allowed.path().join("repo"), &roots).unwrap();
        assert!(inside.ends_with("repo"));

        let escape = allowed.path().join("repo/../..").join(other.path().file_name().unwrap());
        assert!(matches!(
            resolve_within_roots(&escape, &roots),
            Err(ExtractError::Forbidden(_))
        ));
        assert!(matches!(
            resolve_within_roots(other.path(), &roots),
            Err(ExtractError::Forbidden(_))
        ));
        assert!(matches!(
            resolve_within_roots(other.path(), &[]),
            Err(ExtractError::Forbidden(_))
        ));
    }
}
