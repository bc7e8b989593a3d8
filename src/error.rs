//! Tracker error types
//!
//! One taxonomy for every failure the tracker can surface. Transport status
//! codes are mapped onto it in exactly one place: [`TrackerError::from_read_status`]
//! and [`TrackerError::from_write_status`].

use thiserror::Error;

/// Errors that can occur while loading, rendering or committing tracker data
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Reading a remote resource failed with something other than not-found
    #[error("Remote read failed with status {status} for {path}")]
    RemoteRead { path: String, status: u16 },

    /// Writing a remote resource failed with an unclassified status
    #[error("Remote write failed with status {status} for {path}")]
    RemoteWrite { path: String, status: u16 },

    /// The remote resource exists but does not hold JSON of the expected shape
    #[error("Malformed remote state in {path}: {reason}")]
    MalformedRemoteState { path: String, reason: String },

    /// The remote resource changed between our read and our write
    #[error("Version conflict on {path}: the file changed since it was read. Refresh and retry")]
    VersionConflict { path: String },

    /// Missing, invalid or under-privileged credentials
    #[error("Credential error: {0}. Re-enter your GitHub token")]
    Credential(String),

    /// The remote refused the payload (encoding or size)
    #[error("Payload rejected for {path}: {message}")]
    PayloadRejected { path: String, message: String },

    /// Cached or fetched JSON could not be parsed
    #[error("Local parse error: {0}")]
    LocalParse(String),

    /// Network failure before any status code was received
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input rejected before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration is incomplete
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Classify a non-success, non-404 status returned by a read
    pub fn from_read_status(path: &str, status: u16) -> Self {
        TrackerError::RemoteRead {
            path: path.to_string(),
            status,
        }
    }

    /// Classify a non-success status returned by a write
    pub fn from_write_status(path: &str, status: u16, message: String) -> Self {
        match status {
            409 | 412 => TrackerError::VersionConflict {
                path: path.to_string(),
            },
            401 | 403 => TrackerError::Credential(format!(
                "GitHub rejected the token for {} ({})",
                path, status
            )),
            422 => TrackerError::PayloadRejected {
                path: path.to_string(),
                message,
            },
            _ => TrackerError::RemoteWrite {
                path: path.to_string(),
                status,
            },
        }
    }

    /// Whether the user must supply new credentials before retrying
    pub fn requires_new_credentials(&self) -> bool {
        match self {
            TrackerError::Credential(_) => true,
            TrackerError::RemoteRead { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }

    /// Whether the user must refresh before retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, TrackerError::VersionConflict { .. })
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::LocalParse(err.to_string())
    }
}

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_status_mapping() {
        let path = "data/read_status.json";
        assert!(matches!(
            TrackerError::from_write_status(path, 409, String::new()),
            TrackerError::VersionConflict { .. }
        ));
        assert!(matches!(
            TrackerError::from_write_status(path, 401, String::new()),
            TrackerError::Credential(_)
        ));
        assert!(matches!(
            TrackerError::from_write_status(path, 403, String::new()),
            TrackerError::Credential(_)
        ));
        assert!(matches!(
            TrackerError::from_write_status(path, 422, "too big".into()),
            TrackerError::PayloadRejected { .. }
        ));
        assert!(matches!(
            TrackerError::from_write_status(path, 500, String::new()),
            TrackerError::RemoteWrite { status: 500, .. }
        ));
    }

    #[test]
    fn test_conflict_message_names_conflict() {
        let err = TrackerError::from_write_status("data/read_status.json", 409, String::new());
        assert!(err.to_string().to_lowercase().contains("conflict"));
        assert!(err.is_conflict());
        assert!(!err.requires_new_credentials());
    }

    #[test]
    fn test_read_auth_failure_requires_credentials() {
        let err = TrackerError::from_read_status("data/manga_sources.json", 401);
        assert!(err.requires_new_credentials());
        assert_eq!(
            err.to_string(),
            "Remote read failed with status 401 for data/manga_sources.json"
        );

        let err = TrackerError::from_read_status("data/manga_sources.json", 500);
        assert!(!err.requires_new_credentials());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: TrackerError = json_err.into();
        assert!(matches!(err, TrackerError::LocalParse(_)));
    }
}
