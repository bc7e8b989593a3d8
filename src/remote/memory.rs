//! In-process content store
//!
//! Versions are a per-store counter rendered as `v<n>`. A write must name the
//! current version of an existing file and no version for a new one, exactly
//! like the GitHub store; anything else is a conflict.

use super::{ContentStore, Credentials, RemoteResource, VersionTag};
use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, (Vec<u8>, VersionTag)>,
    next_version: u64,
    commits: Vec<String>,
}

/// Versioned store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    required_token: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request whose token differs from `token`
    pub fn with_required_token(mut self, token: impl Into<String>) -> Self {
        self.required_token = Some(token.into());
        self
    }

    /// Store `content` at `path` without any version check
    pub fn seed(&self, path: &str, content: impl Into<Vec<u8>>) -> VersionTag {
        let mut inner = self.lock();
        let version = inner.bump();
        inner
            .files
            .insert(path.to_string(), (content.into(), version.clone()));
        version
    }

    /// Current content of `path`
    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|(content, _)| content.clone())
    }

    /// Current version of `path`
    pub fn version(&self, path: &str) -> Option<VersionTag> {
        self.lock().files.get(path).map(|(_, version)| version.clone())
    }

    /// Commit messages of successful writes, oldest first
    pub fn commits(&self) -> Vec<String> {
        self.lock().commits.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn authorized(&self, credentials: &Credentials) -> bool {
        match &self.required_token {
            Some(token) => credentials.token() == token,
            None => true,
        }
    }
}

impl Inner {
    fn bump(&mut self) -> VersionTag {
        self.next_version += 1;
        VersionTag::new(format!("v{}", self.next_version))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> TrackerResult<Option<RemoteResource>> {
        if !self.authorized(credentials) {
            return Err(TrackerError::from_read_status(path, 401));
        }

        Ok(self.lock().files.get(path).map(|(content, version)| RemoteResource {
            path: path.to_string(),
            content: content.clone(),
            version: version.clone(),
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
        if !self.authorized(credentials) {
            return Err(TrackerError::from_write_status(path, 401, "Bad credentials".into()));
        }

        let mut inner = self.lock();
        let current = inner.files.get(path).map(|(_, version)| version);
        if current != expected {
            return Err(TrackerError::from_write_status(
                path,
                409,
                format!("{} does not match {:?}", path, expected),
            ));
        }

        let version = inner.bump();
        inner
            .files
            .insert(path.to_string(), (content.to_vec(), version.clone()));
        inner.commits.push(message.to_string());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_update() {
        let store = MemoryStore::new();
        let creds = Credentials::new("t");

        assert!(store.get("a.json", &creds).await.unwrap().is_none());

        let v1 = store.put("a.json", b"[]", None, "create", &creds).await.unwrap();
        let v2 = store
            .put("a.json", b"[1]", Some(&v1), "update", &creds)
            .await
            .unwrap();
        assert_ne!(v1, v2);

        let resource = store.get("a.json", &creds).await.unwrap().unwrap();
        assert_eq!(resource.content, b"[1]");
        assert_eq!(resource.version, v2);
        assert_eq!(store.commits(), vec!["create", "update"]);
    }

    #[tokio::test]
    async fn test_stale_or_missing_version_conflicts() {
        let store = MemoryStore::new();
        let creds = Credentials::new("t");
        let v1 = store.seed("a.json", "[]");
        store.put("a.json", b"[1]", Some(&v1), "m", &creds).await.unwrap();

        let stale = store.put("a.json", b"[2]", Some(&v1), "m", &creds).await;
        assert!(matches!(stale, Err(TrackerError::VersionConflict { .. })));

        let blind = store.put("a.json", b"[2]", None, "m", &creds).await;
        assert!(matches!(blind, Err(TrackerError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_required_token() {
        let store = MemoryStore::new().with_required_token("good");

        let read = store.get("a.json", &Credentials::new("bad")).await;
        assert!(matches!(read, Err(TrackerError::RemoteRead { status: 401, .. })));

        let write = store
            .put("a.json", b"[]", None, "m", &Credentials::new("bad"))
            .await;
        assert!(matches!(write, Err(TrackerError::Credential(_))));
    }
}
