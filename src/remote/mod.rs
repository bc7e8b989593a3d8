//! Remote Versioned Store
//!
//! Remote state lives in files of a GitHub repository, addressed by path and
//! versioned by the blob SHA GitHub returns with every read. Writes carry the
//! SHA they expect to replace; the remote rejects the write when the file has
//! moved on since.
//!
//! - [`ContentStore`]: the get/put seam
//! - [`GitHubContentStore`]: the GitHub Contents API implementation
//! - [`MemoryStore`]: an in-process implementation with the same semantics
//! - [`update_remote_json`]: the optimistic read-modify-write protocol

mod github;
mod memory;
mod update;

pub use github::{GitHubContentStore, GitHubStoreConfig};
pub use memory::MemoryStore;
pub use update::{
    encode_pretty, read_remote_json, update_remote_json, update_remote_json_array, JsonShape,
    MalformedPolicy, UpdateOutcome,
};

use crate::error::TrackerResult;
use async_trait::async_trait;

/// Opaque version identifier of a remote file's exact content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote file as last read
#[derive(Debug, Clone)]
pub struct RemoteResource {
    pub path: String,
    pub content: Vec<u8>,
    pub version: VersionTag,
}

/// Bearer token for the remote store
///
/// The token is only ever sent as the `Authorization` header and never
/// appears in `Debug` output or logs.
#[derive(Clone, Default)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &if self.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

/// A store of versioned files
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Read a file. `Ok(None)` means the file does not exist.
    async fn get(&self, path: &str, credentials: &Credentials)
        -> TrackerResult<Option<RemoteResource>>;

    /// Write a file, returning its new version
    ///
    /// `expected` must be the version observed by the latest read of `path`,
    /// or `None` to create a file that does not exist yet.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        expected: Option<&VersionTag>,
        message: &str,
        credentials: &Credentials,
    ) -> TrackerResult<VersionTag>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new("  ghp_secret  ");
        assert_eq!(creds.token(), "ghp_secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));

        assert!(Credentials::new("   ").is_empty());
    }
}
