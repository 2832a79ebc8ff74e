//! GitHub push webhooks.
//!
//! Verifies `X-Hub-Signature-256` and turns a push event into the set of
//! paths to re-extract and the set of paths to drop from the index. File
//! contents are not part of the payload; [`GitHubClient`] fetches them
//! through the contents API.

use std::collections::BTreeMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::extractor::knowledge_id;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Header naming the event type.
pub const EVENT_HEADER: &str = "x-github-event";

/// Check a `sha256=<hex>` signature over the raw request body.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> Result<()> {
    let hex_digest = signature
        .strip_prefix("sha256=")
        .ok_or(ExtractError::InvalidSignature)?;
    let expected = hex::decode(hex_digest).map_err(|_| ExtractError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExtractError::Config(format!("webhook secret: {}", e)))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| ExtractError::InvalidSignature)
}

/// Compute the `sha256=<hex>` signature for a payload.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExtractError::Config(format!("webhook secret: {}", e)))?;
    mac.update(payload);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// The parts of a push event payload we use.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    /// Commit the branch points at after the push
    #[serde(default)]
    pub after: String,
    pub repository: Repository,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl PushEvent {
    /// Parse a push event from the raw body.
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Branch name when the push targets `refs/heads/*`.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/heads/")
    }

    /// Revision to read file contents at: the pushed head commit, falling
    /// back to the ref for deletions and payloads without one.
    pub fn content_ref(&self) -> &str {
        if self.after.is_empty() || self.after.bytes().all(|b| b == b'0') {
            &self.git_ref
        } else {
            &self.after
        }
    }

    /// Net effect of all commits, applied in order.
    ///
    /// A path removed and later re-added ends up as an upsert, and a path
    /// added and later removed ends up as a removal.
    pub fn change_set(&self) -> ChangeSet {
        let mut latest: BTreeMap<&str, bool> = BTreeMap::new();
        for commit in &self.commits {
            for path in commit.added.iter().chain(&commit.modified) {
                latest.insert(path.as_str(), true);
            }
            for path in &commit.removed {
                latest.insert(path.as_str(), false);
            }
        }

        let (upserts, removals): (Vec<_>, Vec<_>) = latest.into_iter().partition(|(_, keep)| *keep);

        ChangeSet {
            repository: self.repository.full_name.clone(),
            upserts: upserts.into_iter().map(|(p, _)| p.to_string()).collect(),
            removals: removals.into_iter().map(|(p, _)| p.to_string()).collect(),
        }
    }
}

/// Paths touched by a push, grouped by what the index should do with them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub repository: String,
    /// Added or modified paths, sorted
    pub upserts: Vec<String>,
    /// Deleted paths, sorted
    pub removals: Vec<String>,
}

impl ChangeSet {
    /// Knowledge ids of the removed paths.
    pub fn removal_ids(&self) -> Vec<String> {
        self.removals
            .iter()
            .map(|path| knowledge_id(&self.repository, path))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

/// Client for the GitHub contents API.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for `api_url` (e.g. `https://api.github.com`).
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("repo-knowledge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractError::GitHub(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetch the raw text of `path` at `git_ref`; `None` when it does not
    /// exist there.
    pub async fn fetch_file(&self, repository: &str, path: &str, git_ref: &str) -> Result<Option<String>> {
        let url = format!("{}/repos/{}/contents/{}", self.api_url, repository, path);

        let mut request = self
            .client
            .get(&url)
            .query(&[("ref", git_ref)])
            .header(header::ACCEPT, "application/vnd.github.raw");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExtractError::GitHub(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(repository, path, git_ref, "File not found at ref");
                Ok(None)
            }
            status if status.is_success() => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| ExtractError::GitHub(format!("failed to read body: {}", e)))?;
                Ok(Some(text))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ExtractError::GitHub(format!(
                    "contents API returned {} for {}: {}",
                    status, path, body
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PUSH: &str = r#"{
        "ref": "refs/heads/main",
        "repository": { "full_name": "acme/web" },
        "commits": [
            { "added": ["src/new.ts"], "modified": ["README.md"], "removed": ["src/old.js"] },
            { "added": ["src/old.js"], "modified": [], "removed": ["src/new.ts", "docs/gone.md"] }
        ]
    }"#;

    #[test]
    fn test_signature_round_trip() {
        let signature = sign_payload("s3cret", PUSH.as_bytes()).unwrap();
        assert!(signature.starts_with("sha256="));
        assert!(verify_signature("s3cret", PUSH.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let signature = sign_payload("s3cret", b"payload").unwrap();

        assert!(matches!(
            verify_signature("other", b"payload", &signature),
            Err(ExtractError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature("s3cret", b"payload!", &signature),
            Err(ExtractError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature("s3cret", b"payload", "sha1=abcd"),
            Err(ExtractError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature("s3cret", b"payload", "sha256=zz"),
            Err(ExtractError::InvalidSignature)
        ));
    }

    #[test]
    fn test_change_set_uses_last_action_per_path() {
        let event = PushEvent::from_slice(PUSH.as_bytes()).unwrap();
        let changes = event.change_set();

        assert_eq!(event.branch(), Some("main"));
        assert_eq!(changes.repository, "acme/web");
        assert_eq!(changes.upserts, vec!["README.md", "src/old.js"]);
        assert_eq!(changes.removals, vec!["docs/gone.md", "src/new.ts"]);
        assert_eq!(changes.removal_ids(), vec!["acme_web_docs_gone_md", "acme_web_src_new_ts"]);
    }

    #[test]
    fn test_event_without_commits() {
        let event = PushEvent::from_slice(br#"{"ref":"refs/tags/v1","repository":{"full_name":"a/b"}}"#).unwrap();
        assert_eq!(event.branch(), None);
        assert_eq!(event.content_ref(), "refs/tags/v1");
        assert!(event.change_set().is_empty());
    }

    #[test]
    fn test_content_ref_prefers_head_commit() {
        let event = PushEvent::from_slice(
            br#"{"ref":"refs/heads/main","after":"abc123","repository":{"full_name":"a/b"}}"#,
        )
        .unwrap();
        assert_eq!(event.content_ref(), "abc123");

        let deleted = PushEvent::from_slice(
            br#"{"ref":"refs/heads/gone","after":"0000000000","repository":{"full_name":"a/b"}}"#,
        )
        .unwrap();
        assert_eq!(deleted.content_ref(), "refs/heads/gone");
    }

    #[tokio::test]
    async fn test_fetch_file_from_contents_api() {
        let api = testing::spawn_contents_api(vec![("acme/web", "src/app.js", "abc123", "const NEW = 2;")]).await;
        let client = GitHubClient::new(&api, Some("token".to_string())).unwrap();

        let found = client.fetch_file("acme/web", "src/app.js", "abc123").await.unwrap();
        assert_eq!(found.as_deref(), Some("const NEW = 2;"));

        let missing = client.fetch_file("acme/web", "src/app.js", "other").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_fetch_file_unreachable_api() {
        let client = GitHubClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.fetch_file("a/b", "x.js", "main").await.unwrap_err();
        assert!(matches!(err, ExtractError::GitHub(_)));
    }
}
