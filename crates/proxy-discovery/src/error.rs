//! Metadata retrieval error types.

use thiserror::Error;

/// Errors that can occur while fetching federation metadata.
#[derive(Debug, Error)]
pub enum MdqError {
    /// Transport-level failure talking to the metadata server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server has no metadata for the entity.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The server answered with an unexpected status.
    #[error("Metadata server returned {status} for {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The document could not be read as SAML metadata.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(#[from] proxy_saml::SamlError),

    /// The metadata signature did not verify.
    #[error("Metadata signature invalid: {0}")]
    SignatureInvalid(String),

    /// The server returned metadata for a different entity.
    #[error("Requested {requested} but metadata describes {returned}")]
    EntityMismatch {
        /// The entity ID asked for.
        requested: String,
        /// The entity ID in the returned document.
        returned: String,
    },
}

impl MdqError {
    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Checks if the failure came from the network rather than the document.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::UnexpectedStatus { .. })
    }
}

/// Result type for metadata operations.
pub type MdqResult<T> = Result<T, MdqError>;
