//! GitHub Contents API store
//!
//! - `GET  {base}/repos/{owner}/{repo}/contents/{path}` returns the file as
//!   base64 together with its blob SHA
//! - `PUT` on the same URL with `{message, content, sha?, branch?}` commits a
//!   new version; the SHA must match the current blob or GitHub refuses

use super::{ContentStore, Credentials, RemoteResource, VersionTag};
use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Repository coordinates for the GitHub store
#[derive(Debug, Clone)]
pub struct GitHubStoreConfig {
    /// API root, `https://api.github.com` unless using GitHub Enterprise
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    /// Branch to read and commit on; the repository default when `None`
    pub branch: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GitHubStoreConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: None,
            timeout_secs: 30,
        }
    }
}

/// Content store backed by a GitHub repository
pub struct GitHubContentStore {
    client: Client,
    config: GitHubStoreConfig,
}

impl GitHubContentStore {
    /// Create a store for the configured repository
    pub fn new(config: GitHubStoreConfig) -> TrackerResult<Self> {
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(TrackerError::Config(
                "github.owner and github.repo must be set".into(),
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("mangafetch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GitHubStoreConfig {
        &self.config
    }

    /// Contents API URL for a repository path
    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            encoded.join("/")
        )
    }
}

#[async_trait]
impl ContentStore for GitHubContentStore {
    fn name(&self) -> &str {
        "github"
    }

    async fn get(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> TrackerResult<Option<RemoteResource>> {
        let mut request = self
            .client
            .get(self.contents_url(path))
            .bearer_auth(credentials.token())
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(branch) = &self.config.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        if status == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            tracing::warn!(path, status, "GitHub contents read failed");
            return Err(TrackerError::from_read_status(path, status));
        }

        let file: ContentsResponse =
            response
                .json()
                .await
                .map_err(|e| TrackerError::MalformedRemoteState {
                    path: path.to_string(),
                    reason: format!("not a file response: {}", e),
                })?;

        if file.encoding.as_deref().is_some_and(|enc| enc != "base64") {
            return Err(TrackerError::MalformedRemoteState {
                path: path.to_string(),
                reason: format!(
                    "unsupported encoding {:?} (file too large for the contents API?)",
                    file.encoding
                ),
            });
        }

        // GitHub wraps the base64 payload at 60 columns
        let packed: String = file
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let content = STANDARD
            .decode(packed)
            .map_err(|e| TrackerError::MalformedRemoteState {
                path: path.to_string(),
                reason: format!("invalid base64 content: {}", e),
            })?;

        tracing::debug!(path, sha = %file.sha, bytes = content.len(), "Read GitHub file");

        Ok(Some(RemoteResource {
            path: path.to_string(),
            content,
            version: VersionTag::new(file.sha),
        }))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        message: &str,
        credentials: &Credentials,
    ) -> TrackerResult<VersionTag> {
        let body = PutRequest {
            message,
            content: STANDARD.encode(content),
            sha: expected.map(VersionTag::as_str),
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(credentials.token())
            .header("Accept", "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GitHubErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            tracing::warn!(path, status, message = %message, "GitHub contents write failed");
            // A create that lost the race to another creator is refused with 422
            if expected.is_none() && status == 422 && message.contains("sha") {
                return Err(TrackerError::VersionConflict {
                    path: path.to_string(),
                });
            }
            return Err(TrackerError::from_write_status(path, status, message));
        }

        let committed: PutResponse = response.json().await?;
        Ok(VersionTag::new(committed.content.sha))
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{update_remote_json_array, MalformedPolicy};
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TOKEN: &str = "ghp_test";

    /// Minimal stand-in for the Contents API: files keyed by path, SHA = revision
    #[derive(Default)]
    struct FakeRepo {
        files: HashMap<String, (Vec<u8>, String)>,
        revision: u64,
    }

    type Shared = Arc<Mutex<FakeRepo>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TOKEN))
            .unwrap_or(false)
    }

    async fn get_file(
        State(repo): State<Shared>,
        Path((_owner, _repo, path)): Path<(String, String, String)>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"})));
        }
        if path == "boom.json" {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "boom"})));
        }

        let repo = repo.lock().unwrap();
        match repo.files.get(&path) {
            Some((content, sha)) => {
                let encoded = STANDARD.encode(content);
                let wrapped: Vec<String> = encoded
                    .as_bytes()
                    .chunks(60)
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect();
                (
                    StatusCode::OK,
                    Json(json!({
                        "sha": sha,
                        "encoding": "base64",
                        "content": wrapped.join("\n"),
                    })),
                )
            }
            None => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))),
        }
    }

    async fn put_file(
        State(repo): State<Shared>,
        Path((_owner, _repo, path)): Path<(String, String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"})));
        }

        let content = match body["content"].as_str().map(|c| STANDARD.decode(c)) {
            Some(Ok(content)) => content,
            _ => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": "content is not valid Base64"})),
                )
            }
        };

        let mut repo = repo.lock().unwrap();
        let current = repo.files.get(&path).map(|(_, sha)| sha.clone());
        let given = body["sha"].as_str().map(str::to_string);
        match (&current, &given) {
            (Some(_), None) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": "\"sha\" wasn't supplied."})),
                )
            }
            (Some(cur), Some(sha)) if cur != sha => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({"message": format!("{} does not match {}", path, sha)})),
                )
            }
            _ => {}
        }

        repo.revision += 1;
        let sha = format!("sha{}", repo.revision);
        repo.files.insert(path, (content, sha.clone()));
        let status = if current.is_some() {
            StatusCode::OK
        } else {
            StatusCode::CREATED
        };
        (status, Json(json!({"content": {"sha": sha}, "commit": {"sha": "c"}})))
    }

    async fn spawn_fake_github() -> (GitHubContentStore, Shared) {
        let repo: Shared = Arc::new(Mutex::new(FakeRepo::default()));
        let router = Router::new()
            .route(
                "/repos/:owner/:repo/contents/*path",
                get(get_file).put(put_file),
            )
            .with_state(Arc::clone(&repo));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let store = GitHubContentStore::new(GitHubStoreConfig {
            api_base: format!("http://{}", addr),
            owner: "reader".into(),
            repo: "manga-tracker".into(),
            branch: None,
            timeout_secs: 5,
        })
        .unwrap();

        (store, repo)
    }

    #[test]
    fn test_requires_repository() {
        let result = GitHubContentStore::new(GitHubStoreConfig::default());
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_contents_url() {
        let store = GitHubContentStore::new(GitHubStoreConfig {
            api_base: "https://api.github.com/".into(),
            owner: "reader".into(),
            repo: "manga-tracker".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            store.contents_url("/data/read status.json"),
            "https://api.github.com/repos/reader/manga-tracker/contents/data/read%20status.json"
        );
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let (store, _repo) = spawn_fake_github().await;
        let read = store
            .get("data/manga_sources.json", &Credentials::new(TOKEN))
            .await
            .unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let (store, _repo) = spawn_fake_github().await;
        let creds = Credentials::new(TOKEN);
        let payload = "[\n  {\n    \"id\": 1,\n    \"name\": \"A fairly long manga title to force wrapping\"\n  }\n]\n";

        let version = store
            .put("data/manga_sources.json", payload.as_bytes(), None, "Add manga: A", &creds)
            .await
            .unwrap();

        let resource = store
            .get("data/manga_sources.json", &creds)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resource.version, version);
        assert_eq!(resource.content, payload.as_bytes());
    }

    #[tokio::test]
    async fn test_stale_sha_is_version_conflict() {
        let (store, _repo) = spawn_fake_github().await;
        let creds = Credentials::new(TOKEN);
        let v1 = store.put("a.json", b"[]", None, "m", &creds).await.unwrap();
        store.put("a.json", b"[1]", Some(&v1), "m", &creds).await.unwrap();

        let err = store
            .put("a.json", b"[2]", Some(&v1), "m", &creds)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("conflict"));
    }

    #[tokio::test]
    async fn test_concurrent_create_is_version_conflict() {
        let (store, _repo) = spawn_fake_github().await;
        let creds = Credentials::new(TOKEN);
        let path = "data/read_status.json";

        assert!(store.get(path, &creds).await.unwrap().is_none());
        assert!(store.get(path, &creds).await.unwrap().is_none());

        store.put(path, b"{}", None, "first", &creds).await.unwrap();
        let err = store
            .put(path, b"{\"1\":true}", None, "second", &creds)
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_bad_token() {
        let (store, _repo) = spawn_fake_github().await;
        let bad = Credentials::new("nope");

        let read = store.get("a.json", &bad).await.unwrap_err();
        assert!(matches!(read, TrackerError::RemoteRead { status: 401, .. }));
        assert!(read.requires_new_credentials());

        let write = store.put("a.json", b"[]", None, "m", &bad).await.unwrap_err();
        assert!(matches!(write, TrackerError::Credential(_)));
    }

    #[tokio::test]
    async fn test_server_error_on_read() {
        let (store, _repo) = spawn_fake_github().await;
        let err = store
            .get("boom.json", &Credentials::new(TOKEN))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::RemoteRead { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_update_protocol_end_to_end() {
        let (store, repo) = spawn_fake_github().await;
        let creds = Credentials::new(TOKEN);

        for name in ["A", "B"] {
            update_remote_json_array(
                &store,
                "data/manga_sources.json",
                MalformedPolicy::Abort,
                &format!("Add manga: {}", name),
                &creds,
                |items| {
                    items.push(json!({"name": name}));
                    Ok(())
                },
            )
            .await
            .unwrap();
        }

        let repo = repo.lock().unwrap();
        let (content, sha) = repo.files.get("data/manga_sources.json").unwrap();
        let value: Value = serde_json::from_slice(content).unwrap();
        assert_eq!(value, json!([{"name": "A"}, {"name": "B"}]));
        assert_eq!(sha, "sha2");
    }
}
