//! Errors raised while reading, checking or producing SAML messages.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// A request could not be understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A response could not be understood or is not acceptable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The document is not well-formed XML.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// No trusted signature covers what it has to.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Signing failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// A required element or attribute is absent.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// The assertion is malformed or not addressed to us.
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    /// The assertion's conditions exclude this use.
    #[error("assertion conditions not met: {0}")]
    ConditionsNotMet(String),

    /// Past `NotOnOrAfter`.
    #[error("assertion expired")]
    AssertionExpired,

    /// Before `NotBefore`.
    #[error("assertion not yet valid")]
    AssertionNotYetValid,

    /// The audience restriction does not name us.
    #[error("invalid audience: expected {expected}, got {actual}")]
    InvalidAudience {
        /// Our entity ID.
        expected: String,
        /// What the assertion allowed.
        actual: String,
    },

    /// The message came from someone else.
    #[error("invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer {
        /// The entity we sent the user to.
        expected: String,
        /// The issuer in the message.
        actual: String,
    },

    /// The message was meant for another endpoint.
    #[error("invalid destination: expected {expected}, got {actual}")]
    InvalidDestination {
        /// Our endpoint URL.
        expected: String,
        /// The `Destination` or `Recipient` in the message.
        actual: String,
    },

    /// A metadata document could not be used.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Transport encoding was not valid base64.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Redirect payload was not valid DEFLATE.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Key or certificate handling failed.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<proxy_crypto::CryptoError> for SamlError {
    fn from(err: proxy_crypto::CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}
