//! HTTP request handlers for the knowledge service.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::answer::{Answer, QuestionAnswerer};
use crate::batch::{BatchConfig, BatchExtractor};
use crate::chunkers::{Chunker, LineChunker};
use crate::error::{ExtractError, Result};
use crate::extractor::{knowledge_id, KnowledgeExtractor};
use crate::jobs::{IngestJobProcessor, JobStore};
use crate::output::{EmbeddingProvider, LlmClient, OllamaClient};
use crate::sources::{self, github, GitHubClient, PushEvent, WatchBatch};
use crate::storage::{KnowledgeIndexer, SearchHit, VectorStore};
use crate::types::{
    ExtractionConfig, FileInfo, IngestJobStatus, KnowledgeItem, ServiceConfig, StartIngestJobRequest,
    StartIngestJobResponse,
};

/// Application state shared across handlers.
pub struct AppState {
    pub extractor: Arc<KnowledgeExtractor>,
    pub batch: Arc<BatchExtractor>,
    pub chunker: Arc<dyn Chunker>,
    pub indexer: Arc<KnowledgeIndexer>,
    pub embedder_name: String,
    pub github: Arc<GitHubClient>,
    pub answerer: Option<Arc<QuestionAnswerer>>,
    pub job_store: Arc<RwLock<JobStore>>,
    pub config: ServiceConfig,
}

impl AppState {
    /// Wire the pipeline together.
    pub fn new(
        config: ServiceConfig,
        extraction: ExtractionConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let extractor = Arc::new(KnowledgeExtractor::new(Arc::new(extraction)));
        let chunker: Arc<dyn Chunker> = Arc::new(LineChunker::new());
        let embedder_name = embedder.name().to_string();
        let indexer = Arc::new(KnowledgeIndexer::new(chunker.clone(), embedder, store, config.max_chunk_size));
        let github = GitHubClient::new(&config.github_api_url, config.github_token.clone())?;

        let answerer = match &config.llm_service_url {
            Some(url) => {
                let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(url)?);
                Some(Arc::new(QuestionAnswerer::new(indexer.clone(), llm, config.llm_model.clone())))
            }
            None => None,
        };

        Ok(Self {
            batch: Arc::new(BatchExtractor::new(extractor.clone(), BatchConfig::default())),
            extractor,
            chunker,
            indexer,
            embedder_name,
            github: Arc::new(github),
            answerer,
            job_store: Arc::new(RwLock::new(JobStore::new())),
            config,
        })
    }

    /// Answer questions with `llm` instead of the configured service.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.answerer = Some(Arc::new(QuestionAnswerer::new(
            self.indexer.clone(),
            llm,
            self.config.llm_model.clone(),
        )));
        self
    }

    /// Apply changes seen by a directory watch: drop removed files from the
    /// index and ingest the rest as a job.
    pub async fn apply_watch_batch(&self, batch: WatchBatch) -> Result<Option<Uuid>> {
        for path in &batch.removals {
            self.indexer
                .remove_item(&knowledge_id(&batch.repository, path))
                .await?;
        }

        if batch.upserts.is_empty() {
            return Ok(None);
        }

        info!(
            repository = %batch.repository,
            upserts = batch.upserts.len(),
            removals = batch.removals.len(),
            "Applying watched changes"
        );
        Ok(Some(self.spawn_ingest_job(batch.upserts).await))
    }

    /// Register a job for `files` and process it in the background.
    async fn spawn_ingest_job(&self, files: Vec<FileInfo>) -> Uuid {
        let job_id = self.job_store.write().await.create_job(files.len());

        let processor = IngestJobProcessor::new(self.batch.clone(), self.indexer.clone());
        let job_store = self.job_store.clone();
        tokio::spawn(async move {
            processor.process_job(job_id, files, job_store).await;
        });

        job_id
    }
}

/// Error body returned by every handler.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler error mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        let status = match &err {
            ExtractError::InvalidArgument(_) | ExtractError::Json(_) => StatusCode::BAD_REQUEST,
            ExtractError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ExtractError::Forbidden(_) => StatusCode::FORBIDDEN,
            ExtractError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExtractError::Embedding(_) | ExtractError::Llm(_) | ExtractError::GitHub(_) => {
                StatusCode::BAD_GATEWAY
            }
            ExtractError::Store(_)
            | ExtractError::Config(_)
            | ExtractError::Watch(_)
            | ExtractError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    embedder: String,
    chunker: String,
    llm_configured: bool,
    indexed_chunks: usize,
    jobs: HashMap<IngestJobStatus, usize>,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let indexed_chunks = state.indexer.store().count().await?;
    let jobs = state.job_store.read().await.get_job_counts();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embedder: state.embedder_name.clone(),
        chunker: state.chunker.name().to_string(),
        llm_configured: state.answerer.is_some(),
        indexed_chunks,
        jobs,
    }))
}

/// Extract request. Repository defaults to the configured one.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub repository: Option<String>,
    pub file_path: String,
    pub content: String,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<KnowledgeItem>,
    pub chunks: Vec<String>,
}

/// Extract and chunk a single file without indexing it.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<ExtractResponse> {
    let file = FileInfo::new(
        request
            .repository
            .unwrap_or_else(|| state.config.default_repository.clone()),
        request.file_path,
        request.content,
        request.last_modified.unwrap_or_else(Utc::now),
    );

    let Some(item) = state.extractor.extract(&file) else {
        return Ok(Json(ExtractResponse {
            eligible: false,
            item: None,
            chunks: Vec::new(),
        }));
    };

    let chunks = state.chunker.chunk(&item.content, state.config.max_chunk_size)?;

    Ok(Json(ExtractResponse {
        eligible: true,
        item: Some(item),
        chunks,
    }))
}

/// Start an ingestion job.
pub async fn start_ingest_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartIngestJobRequest>,
) -> Json<StartIngestJobResponse> {
    let files_count = request.files.len();

    if files_count == 0 {
        return Json(StartIngestJobResponse {
            job_id: Uuid::nil(),
            accepted: false,
            files_count: 0,
            message: Some("No files provided".to_string()),
        });
    }

    info!(files = files_count, "Received ingest job request");

    let job_id = state.spawn_ingest_job(request.files).await;

    Json(StartIngestJobResponse {
        job_id,
        accepted: true,
        files_count,
        message: None,
    })
}

/// Get job status.
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> std::result::Result<impl IntoResponse, StatusCode> {
    let store = state.job_store.read().await;

    match store.get_job_status(job_id) {
        Some(status) => Ok(Json(status)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Local scan request.
#[derive(Debug, Deserialize)]
pub struct IngestLocalRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub repository: Option<String>,
}

/// Scan a local directory and ingest every eligible file.
///
/// The path must resolve inside one of the configured source roots.
pub async fn ingest_local(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestLocalRequest>,
) -> ApiResult<StartIngestJobResponse> {
    let repository = request
        .repository
        .unwrap_or_else(|| state.config.default_repository.clone());

    let extractor = state.extractor.clone();
    let requested = request.path.clone();
    let roots = state.config.local_source_roots.clone();
    let files = tokio::task::spawn_blocking(move || {
        let root = sources::resolve_within_roots(&requested, &roots)?;
        sources::scan_directory(&root, &repository, extractor.matcher())
    })
    .await
    .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    let files_count = files.len();
    info!(path = %request.path.display(), files = files_count, "Scanned local directory");

    if files_count == 0 {
        return Ok(Json(StartIngestJobResponse {
            job_id: Uuid::nil(),
            accepted: false,
            files_count: 0,
            message: Some("No eligible files found".to_string()),
        }));
    }

    let job_id = state.spawn_ingest_job(files).await;

    Ok(Json(StartIngestJobResponse {
        job_id,
        accepted: true,
        files_count,
        message: None,
    }))
}

#[derive(Debug, Serialize)]
pub struct RemoveItemResponse {
    pub item_id: String,
    pub removed_chunks: usize,
}

/// Remove an item's chunks from the index.
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> ApiResult<RemoveItemResponse> {
    let removed_chunks = state.indexer.remove_item(&item_id).await?;
    if removed_chunks == 0 {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no indexed item {}", item_id),
        ));
    }

    Ok(Json(RemoveItemResponse {
        item_id,
        removed_chunks,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Semantic search over indexed chunks.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    if request.query.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "query must not be empty"));
    }

    let top_k = request.top_k.unwrap_or(state.config.search_top_k);
    let results = state.indexer.search(&request.query, top_k).await?;

    Ok(Json(SearchResponse {
        query: request.query,
        results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Answer a question from the indexed knowledge.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Answer> {
    let answerer = state
        .answerer
        .as_ref()
        .ok_or_else(|| ExtractError::Unavailable("no LLM service configured".to_string()))?;

    let top_k = request.top_k.unwrap_or(state.config.search_top_k);
    Ok(Json(answerer.ask(&request.question, top_k).await?))
}

#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub removed_items: usize,
    pub removed_chunks: usize,
    /// Eligible added or modified paths
    pub upserts: Vec<String>,
    /// Paths whose content was fetched and queued
    pub fetched: usize,
    /// Paths that could not be fetched at the pushed commit
    pub fetch_failures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

/// Receive a GitHub webhook delivery.
///
/// Removed files are dropped from the index right away. Added and modified
/// files are fetched at the pushed commit and ingested as a job.
pub async fn github_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookResponse> {
    if let Some(secret) = &state.config.github_webhook_secret {
        let signature = headers
            .get(github::SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ExtractError::InvalidSignature)?;
        github::verify_signature(secret, &body, signature)?;
    }

    let event = headers
        .get(github::EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    if event != "push" {
        info!(event = %event, "Ignoring webhook event");
        return Ok(Json(WebhookResponse {
            event,
            ..Default::default()
        }));
    }

    let push = PushEvent::from_slice(&body)?;
    let changes = push.change_set();

    let removals = join_all(
        changes
            .removal_ids()
            .into_iter()
            .map(|id| {
                let indexer = state.indexer.clone();
                async move { indexer.remove_item(&id).await }
            }),
    )
    .await;

    let mut removed_items = 0;
    let mut removed_chunks = 0;
    for removed in removals {
        let chunks = removed?;
        if chunks > 0 {
            removed_items += 1;
            removed_chunks += chunks;
        }
    }

    let upserts: Vec<String> = changes
        .upserts
        .iter()
        .filter(|path| state.extractor.is_eligible(path))
        .cloned()
        .collect();

    let git_ref = push.content_ref();
    let contents = join_all(
        upserts
            .iter()
            .map(|path| state.github.fetch_file(&changes.repository, path, git_ref)),
    )
    .await;

    let mut files = Vec::new();
    let mut fetch_failures = Vec::new();
    for (path, content) in upserts.iter().zip(contents) {
        match content {
            Ok(Some(content)) => {
                files.push(FileInfo::new(&changes.repository, path, content, Utc::now()));
            }
            Ok(None) => {
                warn!(path = %path, git_ref, "File not found at pushed ref");
                fetch_failures.push(path.clone());
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to fetch file content");
                fetch_failures.push(path.clone());
            }
        }
    }

    let fetched = files.len();
    let job_id = if files.is_empty() {
        None
    } else {
        Some(state.spawn_ingest_job(files).await)
    };

    info!(
        repository = %changes.repository,
        removed_items,
        upserts = upserts.len(),
        fetched,
        "Processed push event"
    );

    Ok(Json(WebhookResponse {
        event,
        repository: Some(changes.repository),
        branch: push.branch().map(str::to_string),
        removed_items,
        removed_chunks,
        upserts,
        fetched,
        fetch_failures,
        job_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::output::{LlmRequest, TrigramEmbedder};
    use crate::sources::github::testing::spawn_contents_api;
    use crate::storage::{chunk_id, InMemoryVectorStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app_state(config: ServiceConfig, store: Arc<InMemoryVectorStore>) -> AppState {
        AppState::new(config, ExtractionConfig::default(), Arc::new(TrigramEmbedder::new(64)), store).unwrap()
    }

    fn state(config: ServiceConfig) -> Arc<AppState> {
        Arc::new(app_state(config, Arc::new(InMemoryVectorStore::new())))
    }

    /// Answers every prompt with its line count.
    struct LineCountLlm;

    #[async_trait]
    impl LlmClient for LineCountLlm {
        fn name(&self) -> &str {
            "line-count"
        }

        async fn complete(&self, request: &LlmRequest) -> Result<String> {
            Ok(format!("{} lines", request.prompt.lines().count()))
        }
    }

    async fn wait_for_job(state: &AppState, job_id: Uuid) -> IngestJobStatus {
        for _ in 0..250 {
            let status = state.job_store.read().await.get_job_status(job_id).unwrap().status;
            if matches!(status, IngestJobStatus::Completed | IngestJobStatus::Failed) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    fn signed_push(secret: &str, payload: &Value) -> Request<Body> {
        let payload = payload.to_string();
        let signature = github::sign_payload(secret, payload.as_bytes()).unwrap();
        Request::post("/webhooks/github")
            .header("x-github-event", "push")
            .header("x-hub-signature-256", signature)
            .body(Body::from(payload))
            .unwrap()
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(state(ServiceConfig::default()), Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["embedder"], "trigram");
        assert_eq!(body["chunker"], "line");
        assert_eq!(body["llm_configured"], false);
        assert_eq!(body["indexed_chunks"], 0);
        assert_eq!(body["jobs"], json!({}));
    }

    #[tokio::test]
    async fn test_health_reports_job_counts() {
        let state = state(ServiceConfig::default());
        let job_id = state
            .spawn_ingest_job(vec![FileInfo::new("acme/web", "src/a.js", "const a = 1;", Utc::now())])
            .await;
        wait_for_job(&state, job_id).await;

        let (_, body) = send(state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(body["jobs"]["completed"], 1);
        assert_eq!(body["indexed_chunks"], 1);
    }

    #[tokio::test]
    async fn test_extract_returns_item_and_chunks() {
        let request = post_json(
            "/extract",
            json!({
                "repository": "acme/web",
                "file_path": "src/login.js",
                "content": "// Handles user login\nfunction login(u){ if(u){return true;} }"
            }),
        );

        let (status, body) = send(state(ServiceConfig::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["eligible"], true);
        assert_eq!(body["item"]["id"], "acme_web_src_login_js");
        assert_eq!(body["chunks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_extract_ineligible_path() {
        let request = post_json(
            "/extract",
            json!({ "file_path": "node_modules/foo/bar.js", "content": "x" }),
        );

        let (status, body) = send(state(ServiceConfig::default()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["eligible"], false);
        assert!(body.get("item").is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let uri = format!("/ingest/jobs/{}", Uuid::new_v4());
        let (status, _) = send(state(ServiceConfig::default()), Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_job_not_accepted() {
        let (status, body) = send(state(ServiceConfig::default()), post_json("/ingest/jobs", json!({ "files": [] }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], false);
    }

    #[tokio::test]
    async fn test_search_and_remove_indexed_item() {
        let state = state(ServiceConfig::default());
        let item = state
            .extractor
            .extract(&FileInfo::new("acme/web", "src/auth.ts", "export function authenticate() {}", Utc::now()))
            .unwrap();
        state.indexer.add_item(&item).await.unwrap();

        let (status, body) = send(state.clone(), post_json("/search", json!({ "query": "authenticate" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["metadata"]["original_id"], "acme_web_src_auth_ts");

        let delete = Request::delete("/items/acme_web_src_auth_ts").body(Body::empty()).unwrap();
        let (status, body) = send(state.clone(), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed_chunks"], 1);

        let delete = Request::delete("/items/acme_web_src_auth_ts").body(Body::empty()).unwrap();
        let (status, _) = send(state, delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_search_query_rejected() {
        let (status, body) = send(state(ServiceConfig::default()), post_json("/search", json!({ "query": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "query must not be empty");
    }

    #[tokio::test]
    async fn test_webhook_requires_valid_signature() {
        let config = ServiceConfig {
            github_webhook_secret: Some("s3cret".to_string()),
            ..Default::default()
        };
        let request = Request::post("/webhooks/github")
            .header("x-github-event", "push")
            .header("x-hub-signature-256", "sha256=00")
            .body(Body::from("{}"))
            .unwrap();

        let (status, _) = send(state(config), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_push_removes_deleted_files() {
        let api = spawn_contents_api(vec![("acme/web", "src/new.js", "c0ffee", "export const n = 1;")]).await;
        let config = ServiceConfig {
            github_webhook_secret: Some("s3cret".to_string()),
            github_api_url: api,
            ..Default::default()
        };
        let state = state(config);
        let item = state
            .extractor
            .extract(&FileInfo::new("acme/web", "src/old.js", "const old = 1;", Utc::now()))
            .unwrap();
        state.indexer.add_item(&item).await.unwrap();

        let payload = json!({
            "ref": "refs/heads/main",
            "after": "c0ffee",
            "repository": { "full_name": "acme/web" },
            "commits": [{
                "added": ["src/new.js", "node_modules/x/index.js"],
                "modified": [],
                "removed": ["src/old.js"]
            }]
        });

        let (status, body) = send(state.clone(), signed_push("s3cret", &payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branch"], "main");
        assert_eq!(body["removed_items"], 1);
        assert_eq!(body["upserts"], json!(["src/new.js"]));
        assert_eq!(body["fetched"], 1);

        let job_id: Uuid = serde_json::from_value(body["job_id"].clone()).unwrap();
        assert_eq!(wait_for_job(&state, job_id).await, IngestJobStatus::Completed);
        assert_eq!(state.indexer.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_webhook_push_reindexes_modified_content() {
        let api = spawn_contents_api(vec![
            ("acme/web", "src/app.js", "5e1f", "const NEW = 2;"),
            ("acme/web", "src/app.js", "main", "const STALE = 0;"),
        ])
        .await;
        let config = ServiceConfig {
            github_webhook_secret: Some("s3cret".to_string()),
            github_api_url: api,
            ..Default::default()
        };
        let store = Arc::new(InMemoryVectorStore::new());
        let state = Arc::new(app_state(config, store.clone()));
        let item = state
            .extractor
            .extract(&FileInfo::new("acme/web", "src/app.js", "const OLD = 1;", Utc::now()))
            .unwrap();
        state.indexer.add_item(&item).await.unwrap();

        let payload = json!({
            "ref": "refs/heads/main",
            "after": "5e1f",
            "repository": { "full_name": "acme/web" },
            "commits": [{ "added": ["src/missing.js"], "modified": ["src/app.js"], "removed": [] }]
        });

        let (status, body) = send(state.clone(), signed_push("s3cret", &payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fetched"], 1);
        assert_eq!(body["fetch_failures"], json!(["src/missing.js"]));

        let job_id: Uuid = serde_json::from_value(body["job_id"].clone()).unwrap();
        assert_eq!(wait_for_job(&state, job_id).await, IngestJobStatus::Completed);

        let record = store.get(&chunk_id("acme_web_src_app_js", 0)).await.unwrap();
        assert!(record.text.contains("const NEW = 2;"));
        assert!(!record.text.contains("OLD"));
        assert!(!record.text.contains("STALE"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_local_confined_to_source_roots() {
        let allowed = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::create_dir_all(allowed.path().join("repo/src")).unwrap();
        fs::write(allowed.path().join("repo/src/app.js"), "const a = 1;").unwrap();
        fs::write(outside.path().join("credentials.yml"), "token: secret").unwrap();

        let config = ServiceConfig {
            local_source_roots: vec![allowed.path().to_path_buf()],
            ..Default::default()
        };
        let state = state(config);

        let request = post_json("/ingest/local", json!({ "path": outside.path() }));
        let (status, _) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let escape = allowed.path().join("repo/../..").join(outside.path().file_name().unwrap());
        let (status, _) = send(state.clone(), post_json("/ingest/local", json!({ "path": escape }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let request = post_json("/ingest/local", json!({ "path": allowed.path().join("repo"), "repository": "local" }));
        let (status, body) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], true);
        assert_eq!(body["files_count"], 1);
    }

    #[tokio::test]
    async fn test_ingest_local_disabled_without_roots() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.js"), "const a = 1;").unwrap();

        let request = post_json("/ingest/local", json!({ "path": dir.path() }));
        let (status, body) = send(state(ServiceConfig::default()), request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("no source roots"));
    }

    #[tokio::test]
    async fn test_ask_uses_configured_llm() {
        let state = Arc::new(app_state(ServiceConfig::default(), Arc::new(InMemoryVectorStore::new())).with_llm(Arc::new(LineCountLlm)));
        let item = state
            .extractor
            .extract(&FileInfo::new("acme/web", "src/auth.ts", "export function authenticate() {}", Utc::now()))
            .unwrap();
        state.indexer.add_item(&item).await.unwrap();

        let (status, body) = send(state, post_json("/ask", json!({ "question": "how do users authenticate?" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "how do users authenticate?");
        assert!(body["answer"].as_str().unwrap().ends_with(" lines"));
        assert_eq!(body["sources"][0]["id"], "acme_web_src_auth_ts");
        assert_eq!(body["sources"][0]["path"], "src/auth.ts");
    }

    #[tokio::test]
    async fn test_ask_without_llm_is_unavailable() {
        let (status, _) = send(state(ServiceConfig::default()), post_json("/ask", json!({ "question": "why?" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_watch_batch_removes_and_ingests() {
        let state = state(ServiceConfig::default());
        let gone = state
            .extractor
            .extract(&FileInfo::new("local", "src/gone.js", "const gone = 1;", Utc::now()))
            .unwrap();
        state.indexer.add_item(&gone).await.unwrap();

        let batch = WatchBatch {
            repository: "local".to_string(),
            upserts: vec![FileInfo::new("local", "src/new.js", "const fresh = 1;", Utc::now())],
            removals: vec!["src/gone.js".to_string()],
        };
        let job_id = state.apply_watch_batch(batch).await.unwrap().unwrap();

        assert_eq!(wait_for_job(&state, job_id).await, IngestJobStatus::Completed);
        let hits = state.indexer.search("fresh", 5).await.unwrap();
        assert!(hits.iter().all(|h| h.metadata.original_id == "local_src_new_js"));
        assert_eq!(state.indexer.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_webhook_ping_is_ignored() {
        let request = Request::post("/webhooks/github")
            .header("x-github-event", "ping")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(state(ServiceConfig::default()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event"], "ping");
        assert_eq!(body["removed_items"], 0);
    }
}
