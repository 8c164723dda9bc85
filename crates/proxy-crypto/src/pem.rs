//! PEM decoding.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Extracts DER data from the first PEM block with the given label.
#[must_use]
pub fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = start + pem[start..].find(&end)?;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(b64_data)
        .ok()
}

/// Decodes an RSA private key from PKCS#8 (`PRIVATE KEY`) or PKCS#1
/// (`RSA PRIVATE KEY`) PEM.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPem`] if neither block is present.
pub fn private_key_der_from_pem(pem: &str) -> CryptoResult<Vec<u8>> {
    pem_to_der(pem, "PRIVATE KEY")
        .or_else(|| pem_to_der(pem, "RSA PRIVATE KEY"))
        .ok_or_else(|| CryptoError::InvalidPem("no private key block found".to_string()))
}

/// Decodes an X.509 certificate from PEM.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPem`] if no certificate block is present.
pub fn certificate_der_from_pem(pem: &str) -> CryptoResult<Vec<u8>> {
    pem_to_der(pem, "CERTIFICATE")
        .ok_or_else(|| CryptoError::InvalidPem("no certificate block found".to_string()))
}
