//! Enveloped XML-DSig.
//!
//! The proxy signs its own Responses, Assertions and LogoutResponses and
//! verifies signatures on university Responses and MDQ metadata. Only
//! exclusive c14n is produced or accepted; SHA-1 is refused unless a
//! validator opts in.

mod c14n;
mod signer;
mod validator;

pub use c14n::{canonicalize, canonicalize_with_prefixes};
pub use signer::*;
pub use validator::*;

use proxy_crypto::RsaAlgorithm;

use crate::types::{canonicalization_algorithms, digest_algorithms, signature_algorithms};

/// Finds `uri` in a `(value, uri)` table.
fn lookup<T: Copy>(table: &[(T, &str)], uri: &str) -> Option<T> {
    table
        .iter()
        .find(|(_, known)| *known == uri)
        .map(|(value, _)| *value)
}

/// `SignatureMethod` algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA-SHA256, what the proxy signs with.
    #[default]
    RsaSha256,
    /// RSA-SHA384.
    RsaSha384,
    /// RSA-SHA512.
    RsaSha512,
    /// RSA-SHA1.
    RsaSha1,
}

impl SignatureAlgorithm {
    const URIS: [(Self, &'static str); 4] = [
        (Self::RsaSha256, signature_algorithms::RSA_SHA256),
        (Self::RsaSha384, signature_algorithms::RSA_SHA384),
        (Self::RsaSha512, signature_algorithms::RSA_SHA512),
        (Self::RsaSha1, signature_algorithms::RSA_SHA1),
    ];

    /// The algorithm URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Looks an algorithm up by URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        lookup(&Self::URIS, uri)
    }

    /// The reference digest the proxy pairs with this algorithm when signing.
    #[must_use]
    pub const fn digest(&self) -> DigestAlgorithm {
        match self {
            Self::RsaSha256 => DigestAlgorithm::Sha256,
            Self::RsaSha384 => DigestAlgorithm::Sha384,
            Self::RsaSha512 => DigestAlgorithm::Sha512,
            Self::RsaSha1 => DigestAlgorithm::Sha1,
        }
    }

    /// SHA-1 based.
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }

    pub(crate) const fn rsa(self) -> RsaAlgorithm {
        match self {
            Self::RsaSha256 => RsaAlgorithm::Rs256,
            Self::RsaSha384 => RsaAlgorithm::Rs384,
            Self::RsaSha512 => RsaAlgorithm::Rs512,
            Self::RsaSha1 => RsaAlgorithm::Rs1,
        }
    }
}

/// `DigestMethod` algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    const URIS: [(Self, &'static str); 4] = [
        (Self::Sha1, digest_algorithms::SHA1),
        (Self::Sha256, digest_algorithms::SHA256),
        (Self::Sha384, digest_algorithms::SHA384),
        (Self::Sha512, digest_algorithms::SHA512),
    ];

    /// The algorithm URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => digest_algorithms::SHA1,
            Self::Sha256 => digest_algorithms::SHA256,
            Self::Sha384 => digest_algorithms::SHA384,
            Self::Sha512 => digest_algorithms::SHA512,
        }
    }

    /// Looks an algorithm up by URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        lookup(&Self::URIS, uri)
    }

    /// Hashes canonical bytes.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => proxy_crypto::sha1_legacy(data),
            Self::Sha256 => proxy_crypto::sha256(data),
            Self::Sha384 => proxy_crypto::sha384(data),
            Self::Sha512 => proxy_crypto::sha512(data),
        }
    }
}

/// `CanonicalizationMethod` algorithms that may appear in `SignedInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive c14n; the only one reproduced here.
    #[default]
    ExclusiveC14N,
    /// Exclusive c14n with comments.
    ExclusiveC14NWithComments,
    /// Inclusive c14n 1.0.
    C14N,
    /// Inclusive c14n 1.0 with comments.
    C14NWithComments,
}

impl CanonicalizationAlgorithm {
    const URIS: [(Self, &'static str); 4] = [
        (Self::ExclusiveC14N, canonicalization_algorithms::EXCLUSIVE_C14N),
        (
            Self::ExclusiveC14NWithComments,
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS,
        ),
        (Self::C14N, canonicalization_algorithms::C14N),
        (Self::C14NWithComments, canonicalization_algorithms::C14N_WITH_COMMENTS),
    ];

    /// The algorithm URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
            Self::C14N => canonicalization_algorithms::C14N,
            Self::C14NWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Looks an algorithm up by URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        lookup(&Self::URIS, uri)
    }

    /// Whether [`canonicalize`] produces this form.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::ExclusiveC14N)
    }
}

/// A parsed `<ds:Signature>` with a single reference.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// `SignatureMethod`.
    pub algorithm: SignatureAlgorithm,
    /// `DigestMethod` of the reference.
    pub digest_algorithm: DigestAlgorithm,
    /// `CanonicalizationMethod`.
    pub canonicalization: CanonicalizationAlgorithm,
    /// `Reference/@URI`, e.g. `#_abc`.
    pub reference_uri: String,
    /// Base64 `DigestValue`.
    pub digest_value: String,
    /// Base64 `SignatureValue`.
    pub signature_value: String,
    /// Base64 DER certificate from `KeyInfo`. Informational only; trust comes
    /// from configured certificates.
    pub x509_certificate: Option<String>,
}

impl XmlSignature {
    /// The referenced element ID, without `#`.
    #[must_use]
    pub fn reference_id(&self) -> &str {
        self.reference_uri
            .strip_prefix('#')
            .unwrap_or(&self.reference_uri)
    }
}

/// How the proxy signs.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// Signature algorithm; the digest follows from it.
    pub algorithm: SignatureAlgorithm,
    /// Canonicalization written into `SignedInfo`.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Embed the signing certificate in `KeyInfo`.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self::with_algorithm(SignatureAlgorithm::default())
    }
}

impl SignatureConfig {
    /// Exclusive c14n and an embedded certificate, with the given algorithm.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
            include_certificate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithms_resolve_by_uri() {
        assert_eq!(
            SignatureAlgorithm::from_uri(signature_algorithms::RSA_SHA512),
            Some(SignatureAlgorithm::RsaSha512)
        );
        assert_eq!(
            DigestAlgorithm::from_uri(digest_algorithms::SHA384),
            Some(DigestAlgorithm::Sha384)
        );
        assert_eq!(
            CanonicalizationAlgorithm::from_uri(canonicalization_algorithms::C14N),
            Some(CanonicalizationAlgorithm::C14N)
        );
        assert_eq!(SignatureAlgorithm::from_uri("urn:example:hmac"), None);
    }

    #[test]
    fn uris_match_tables() {
        for (alg, uri) in SignatureAlgorithm::URIS {
            assert_eq!(alg.uri(), uri);
        }
        for (alg, uri) in DigestAlgorithm::URIS {
            assert_eq!(alg.uri(), uri);
        }
        for (alg, uri) in CanonicalizationAlgorithm::URIS {
            assert_eq!(alg.uri(), uri);
        }
    }

    #[test]
    fn sha1_is_deprecated() {
        assert!(SignatureAlgorithm::RsaSha1.is_deprecated());
        assert!(!SignatureAlgorithm::RsaSha256.is_deprecated());
        assert_eq!(SignatureAlgorithm::RsaSha1.digest(), DigestAlgorithm::Sha1);
        assert_eq!(DigestAlgorithm::Sha1.digest(b"x").len(), 20);
        assert_eq!(DigestAlgorithm::Sha512.digest(b"x").len(), 64);
    }

    #[test]
    fn only_exclusive_c14n_is_supported() {
        assert!(CanonicalizationAlgorithm::ExclusiveC14N.is_supported());
        assert!(!CanonicalizationAlgorithm::C14NWithComments.is_supported());
    }

    #[test]
    fn default_config_signs_rsa_sha256_with_certificate() {
        let config = SignatureConfig::default();
        assert_eq!(config.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(config.canonicalization, CanonicalizationAlgorithm::ExclusiveC14N);
        assert!(config.include_certificate);
    }
}
