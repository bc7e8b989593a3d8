//! Web Error Types
//!
//! Maps the tracker's error taxonomy onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::TrackerError;

/// Web layer errors
#[derive(Error, Debug)]
pub enum WebError {
    /// Anything the tracker reported
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl WebError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        let err = match self {
            WebError::Tracker(err) => err,
            WebError::Internal(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            WebError::Io(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };

        if err.requires_new_credentials() {
            return (StatusCode::UNAUTHORIZED, "CREDENTIAL_ERROR");
        }

        match err {
            TrackerError::VersionConflict { .. } => (StatusCode::CONFLICT, "VERSION_CONFLICT"),
            TrackerError::PayloadRejected { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PAYLOAD_REJECTED")
            }
            TrackerError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            TrackerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            TrackerError::MalformedRemoteState { .. } => {
                (StatusCode::BAD_GATEWAY, "MALFORMED_REMOTE_STATE")
            }
            TrackerError::RemoteRead { .. } => (StatusCode::BAD_GATEWAY, "REMOTE_READ_ERROR"),
            TrackerError::RemoteWrite { .. } => (StatusCode::BAD_GATEWAY, "REMOTE_WRITE_ERROR"),
            TrackerError::Transport(_) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
            TrackerError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
            TrackerError::LocalParse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LOCAL_STATE_ERROR"),
            TrackerError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            TrackerError::Credential(_) => (StatusCode::UNAUTHORIZED, "CREDENTIAL_ERROR"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request failed"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for web handlers
pub type WebResult<T> = Result<T, WebError>;
