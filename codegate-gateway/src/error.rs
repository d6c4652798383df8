//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use codegate_archive::ArchiveError;
use codegate_sandbox::SandboxError;
use serde_json::json;

/// Errors that can occur during gateway request handling.
///
/// Every variant renders as `{"success": false, "error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The request body is malformed or contains invalid values.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request body exceeds the accepted size.
    #[error("Request body too large")]
    BodyTooLarge,

    /// An artifact name is not a bare file name.
    #[error("invalid filename")]
    InvalidFilename,

    /// No artifact with the requested name exists.
    #[error("file not found")]
    NotFound,

    /// No `Authorization` header was sent.
    #[error("Authorization required")]
    MissingToken,

    /// The bearer token is unknown or expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The admin password did not match.
    #[error("Invalid password")]
    InvalidPassword,

    /// No admin password digest is configured.
    #[error("Admin password not configured")]
    PasswordNotConfigured,

    /// The submission could not be archived; it was not executed.
    #[error("Failed to save run: {0}")]
    Archival(#[source] ArchiveError),

    /// The archive could not be read or modified.
    #[error("{0}")]
    Storage(#[source] ArchiveError),

    /// The sandbox could not be reached or answered garbage.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

impl GatewayError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidFilename => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingToken | Self::InvalidToken | Self::InvalidPassword => StatusCode::UNAUTHORIZED,
            Self::Sandbox(SandboxError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PasswordNotConfigured | Self::Archival(_) | Self::Storage(_) | Self::Sandbox(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ArchiveError> for GatewayError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::InvalidName { .. } => Self::InvalidFilename,
            ArchiveError::NotFound { .. } => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, Json(json!({"success": false, "error": self.to_string()}))).into_response()
    }
}
