//! Request error type.
//!
//! Every handler returns [`AppResult`]; failures are logged and rendered as
//! a plain-text body with the matching status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors a request can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// No live session with this ID.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The SP sent something that is not a usable SAML request.
    #[error("invalid SAML request: {0}")]
    InvalidSamlRequest(String),

    /// The university sent a Response that failed validation.
    #[error("invalid SAML response: {0}")]
    InvalidSamlResponse(String),

    /// University metadata could not be obtained or used.
    #[error("MDQ fetch failed: {0}")]
    MdqFetchFailed(String),

    /// The session has no university selected yet.
    #[error("missing university selection")]
    MissingUniversitySelection,

    /// Anything else.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Creates a session not found error.
    #[must_use]
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidSamlRequest(_) | Self::MissingUniversitySelection => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidSamlResponse(_) | Self::MdqFetchFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Result type for request handlers.
pub type AppResult<T> = Result<T, AppError>;
