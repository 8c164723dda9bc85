//! Error type for cryptographic operations.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Error type for cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// PEM block missing or malformed.
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Algorithm not supported for this operation.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}
