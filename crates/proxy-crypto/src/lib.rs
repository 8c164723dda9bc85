//! # proxy-crypto
//!
//! Cryptographic primitives for the SAML discovery proxy using aws-lc-rs.
//!
//! SAML federations still sign with RSA PKCS#1 v1.5, mostly over SHA-256.
//! This crate exposes exactly that surface:
//!
//! - Message digests used by XML-DSig references
//! - RSA signing and verification
//! - PEM decoding and X.509 certificate inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod hash;
pub mod pem;
pub mod rsa;
pub mod x509;

pub use error::{CryptoError, CryptoResult};
pub use hash::{sha1_legacy, sha256, sha384, sha512};
pub use pem::{certificate_der_from_pem, pem_to_der, private_key_der_from_pem};
pub use rsa::{rsa_sign, rsa_verify, RsaAlgorithm};
pub use x509::{certificate_public_key, certificate_summary, CertificateSummary};
