//! Filesystem watching for local source roots.
//!
//! Raw notify events are collected until the tree has been quiet for the
//! debounce interval, then turned into one [`WatchBatch`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::local::{read_text_file, relative_path};
use crate::error::{ExtractError, Result};
use crate::processing::PatternMatcher;
use crate::types::FileInfo;

/// Changes observed under a watched root during one quiet period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchBatch {
    pub repository: String,

    /// Eligible files that exist and were created or modified
    pub upserts: Vec<FileInfo>,

    /// Relative paths of eligible files that no longer exist
    pub removals: Vec<String>,
}

impl WatchBatch {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

/// A running watch. Dropping it stops the underlying watcher.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    pub batches: mpsc::Receiver<WatchBatch>,
}

impl DirectoryWatcher {
    /// Canonical path of the watched root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Start watching `root` recursively.
///
/// Must be called from within a Tokio runtime.
pub fn watch_directory(
    root: &Path,
    repository: &str,
    matcher: PatternMatcher,
    debounce: Duration,
) -> Result<DirectoryWatcher> {
    let root = root
        .canonicalize()
        .map_err(|e| ExtractError::Watch(format!("cannot resolve {}: {}", root.display(), e)))?;

    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for path in event.paths {
                let _ = raw_tx.send(path);
            }
        }
        Err(e) => warn!(error = %e, "Watch error"),
    })
    .map_err(|e| ExtractError::Watch(e.to_string()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| ExtractError::Watch(format!("cannot watch {}: {}", root.display(), e)))?;

    let (tx, rx) = mpsc::channel(16);
    let task_root = root.clone();
    let repository = repository.to_string();
    tokio::spawn(async move {
        while let Some(first) = raw_rx.recv().await {
            let mut pending = BTreeSet::from([first]);
            while let Ok(Some(path)) = tokio::time::timeout(debounce, raw_rx.recv()).await {
                pending.insert(path);
            }

            let batch = batch_from_paths(&task_root, &repository, &matcher, pending);
            if batch.is_empty() {
                continue;
            }
            debug!(upserts = batch.upserts.len(), removals = batch.removals.len(), "Watch batch ready");
            if tx.send(batch).await.is_err() {
                break;
            }
        }
        debug!(root = %task_root.display(), "Watch task stopped");
    });

    info!(root = %root.display(), debounce_ms = debounce.as_millis() as u64, "Watching directory");
    Ok(DirectoryWatcher {
        _watcher: watcher,
        root,
        batches: rx,
    })
}

/// Classify changed paths under `root` into upserts and removals.
///
/// Paths outside `root`, directories and ineligible files are ignored.
/// Unreadable or binary files are skipped like in a scan.
pub fn batch_from_paths(
    root: &Path,
    repository: &str,
    matcher: &PatternMatcher,
    paths: impl IntoIterator<Item = PathBuf>,
) -> WatchBatch {
    let mut batch = WatchBatch {
        repository: repository.to_string(),
        ..Default::default()
    };

    let unique: BTreeSet<PathBuf> = paths.into_iter().collect();
    for path in unique {
        if !path.starts_with(root) || path == root {
            continue;
        }
        let rel = relative_path(root, &path);
        if !matcher.is_eligible(&rel) {
            continue;
        }

        if path.is_file() {
            let Some(content) = read_text_file(&path, &rel) else {
                continue;
            };
            let last_modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            batch.upserts.push(FileInfo::new(repository, rel, content, last_modified));
        } else if !path.exists() {
            batch.removals.push(rel);
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_batch_classifies_changed_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/app.js"), "const a = 1;").unwrap();
        fs::write(root.join("logo.png"), b"\x89PNG\r\n\x1a\n\x00").unwrap();

        let batch = batch_from_paths(
            &root,
            "local",
            &PatternMatcher::with_defaults(),
            vec![
                root.join("src/app.js"),
                root.join("src/app.js"),
                root.join("src/gone.py"),
                root.join("src"),
                root.join("logo.png"),
                root.join("node_modules/x/index.js"),
                PathBuf::from("/elsewhere/file.js"),
            ],
        );

        assert_eq!(batch.repository, "local");
        assert_eq!(batch.upserts.len(), 1);
        assert_eq!(batch.upserts[0].file_path, "src/app.js");
        assert_eq!(batch.upserts[0].content, "const a = 1;");
        assert_eq!(batch.removals, vec!["src/gone.py".to_string()]);
    }

    #[test]
    fn test_batch_of_ignored_paths_is_empty() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let batch = batch_from_paths(&root, "local", &PatternMatcher::with_defaults(), vec![root.clone()]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_watch_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();

        let result = watch_directory(
            &dir.path().join("missing"),
            "local",
            PatternMatcher::with_defaults(),
            Duration::from_millis(50),
        );
        assert!(matches!(result, Err(ExtractError::Watch(_))));
    }

    async fn next_batch_matching(watcher: &mut DirectoryWatcher, accept: impl Fn(&WatchBatch) -> bool) -> WatchBatch {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let batch = watcher.batches.recv().await.expect("watch channel closed");
                if accept(&batch) {
                    return batch;
                }
            }
        })
        .await
        .expect("no matching watch batch within 5s")
    }

    #[tokio::test]
    async fn test_watcher_reports_writes_and_deletes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let mut watcher = watch_directory(
            dir.path(),
            "local",
            PatternMatcher::with_defaults(),
            Duration::from_millis(100),
        )
        .unwrap();
        let file = watcher.root().join("src/app.js");

        fs::write(&file, "export const a = 1;").unwrap();
        let batch = next_batch_matching(&mut watcher, |b| b.upserts.iter().any(|f| f.file_path == "src/app.js")).await;
        assert_eq!(batch.upserts[0].content, "export const a = 1;");

        fs::remove_file(&file).unwrap();
        let batch = next_batch_matching(&mut watcher, |b| b.removals.contains(&"src/app.js".to_string())).await;
        assert!(batch.upserts.is_empty());
    }
}
