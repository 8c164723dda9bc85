//! SAML 2.0 protocol support for the discovery proxy.
//!
//! The proxy speaks SAML on two legs: as an identity provider towards
//! service providers and as a service provider towards university IdPs.
//! This crate holds everything both legs share:
//!
//! - [`types`] - Protocol messages with XML parsing and rendering
//! - [`signature`] - Enveloped XML signatures (exclusive c14n, RSA)
//! - [`bindings`] - HTTP-POST and HTTP-Redirect bindings
//! - [`metadata`] - Entity metadata reading and rendering
//! - [`validation`] - Checks applied to responses from university IdPs
//! - [`xml`] - The small DOM the rest of the crate is built on
//! - [`error`] - Error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use proxy_saml::{AuthnRequest, bindings::HttpRedirectBinding};
//!
//! let request = AuthnRequest::parse(&decoded.xml)?;
//! let url = HttpRedirectBinding::encode_request(&outbound.to_xml(), sso_url, Some(&session_id))?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Metadata](https://docs.oasis-open.org/security/saml/v2.0/saml-metadata-2.0-os.pdf)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod error;
pub mod metadata;
pub mod signature;
pub mod types;
pub mod validation;
pub mod xml;

pub use error::{SamlError, SamlResult};
pub use metadata::{EntityDescriptor, IdpMetadataBuilder, SpMetadataBuilder};
pub use signature::{XmlSignatureValidator, XmlSigner};
pub use types::*;
pub use validation::ResponseValidator;
