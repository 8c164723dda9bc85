//! RSA PKCS#1 v1.5 signatures.
//!
//! These are the signature schemes SAML IdPs and SPs exchange in practice.
//! SHA-1 is accepted for verification only.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};

use crate::error::{CryptoError, CryptoResult};

/// RSA signature algorithms understood by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1. Verification only.
    Rs1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    Rs384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    Rs512,
}

impl RsaAlgorithm {
    /// Returns the JWA-style algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rs1 => "RS1",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        }
    }

    /// Returns the XML-DSig algorithm URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Rs1 => "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
            Self::Rs256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Rs384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Rs512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }

    /// Returns true for SHA-1 based signatures.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Rs1)
    }
}

/// Signs data with an RSA private key.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#1 or PKCS#8)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns an error if the key cannot be parsed, the algorithm is
/// verification-only, or signing fails.
pub fn rsa_sign(key_der: &[u8], data: &[u8], algorithm: RsaAlgorithm) -> CryptoResult<Vec<u8>> {
    let padding = match algorithm {
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
        RsaAlgorithm::Rs1 => {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "{} signing",
                algorithm.name()
            )));
        }
    };

    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];

    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA signature.
///
/// `public_key_der` is a PKCS#1 `RSAPublicKey`, as returned by
/// [`crate::certificate_public_key`]. Returns `false` on any mismatch so
/// callers cannot distinguish a bad key from a bad signature.
#[must_use]
pub fn rsa_verify(public_key_der: &[u8], data: &[u8], sig: &[u8], algorithm: RsaAlgorithm) -> bool {
    let verification_alg: &'static dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Rs1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
    };

    UnparsedPublicKey::new(verification_alg, public_key_der)
        .verify(data, sig)
        .is_ok()
}
