//! Where files come from: local directories, filesystem watches and GitHub
//! push webhooks.

pub mod github;
pub mod local;
pub mod watch;

pub use github::{verify_signature, ChangeSet, GitHubClient, PushEvent};
pub use local::{resolve_within_roots, scan_directory};
pub use watch::{watch_directory, DirectoryWatcher, WatchBatch};
