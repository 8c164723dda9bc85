//! XML Signature validation.
//!
//! Verifies enveloped signatures against a set of trusted certificates.
//! A signature is only ever credited to the element that directly contains
//! it, and only when that element carries the referenced ID.

use std::collections::HashSet;

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::types::{transform_algorithms, XMLDSIG_NS};
use crate::xml::{NamespaceScope, XmlElement};

use super::{
    c14n::canonicalize_with_prefixes, CanonicalizationAlgorithm, DigestAlgorithm,
    SignatureAlgorithm, XmlSignature,
};

/// XML signature validator.
///
/// Validates signatures on SAML documents using configured trusted certificates.
#[derive(Debug, Clone)]
pub struct XmlSignatureValidator {
    /// Trusted certificates for signature validation (DER format).
    trusted_certificates: Vec<Vec<u8>>,
    /// Whether to allow SHA-1 signatures (deprecated but sometimes needed).
    allow_sha1: bool,
}

/// The parts of a `ds:Signature` needed for verification.
struct ParsedSignature<'a> {
    info: XmlSignature,
    signed_info: &'a XmlElement,
    reference_prefixes: Vec<String>,
    signed_info_prefixes: Vec<String>,
}

/// A `ds:Signature` found in a document, with the element it envelopes.
struct EnvelopedSignature<'a> {
    parent: &'a XmlElement,
    parent_scope: NamespaceScope,
    signature: &'a XmlElement,
    signature_scope: NamespaceScope,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted certificates.
    #[must_use]
    pub fn new(trusted_certificates: Vec<Vec<u8>>) -> Self {
        Self {
            trusted_certificates,
            allow_sha1: false,
        }
    }

    /// Creates a validator from PEM-encoded certificates.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let certs = certificates_pem
            .iter()
            .map(|pem| proxy_crypto::certificate_der_from_pem(pem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(certs))
    }

    /// Allows SHA-1 based signatures (not recommended).
    #[must_use]
    pub const fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Validates a document, requiring at least one valid signature.
    ///
    /// Returns the IDs of the elements whose signatures verified.
    pub fn validate(&self, xml: &str) -> SamlResult<Vec<String>> {
        let verified = self.verified_references(xml)?;
        if verified.is_empty() {
            return Err(SamlError::SignatureInvalid(
                "no valid signature found".to_string(),
            ));
        }
        Ok(verified)
    }

    /// Verifies every enveloped signature in the document.
    ///
    /// Returns the IDs of the elements whose signatures verified against a
    /// trusted certificate. Signatures that fail are skipped and logged.
    pub fn verified_references(&self, xml: &str) -> SamlResult<Vec<String>> {
        let root = XmlElement::parse(xml)?;
        Ok(self
            .verified_elements(&root)?
            .into_iter()
            .filter_map(|element| element.id().map(String::from))
            .collect())
    }

    /// Verifies every enveloped signature under `root`.
    ///
    /// Returns the signed elements themselves, so callers read data only
    /// from what was actually covered. A document in which an `ID` value
    /// appears twice is refused outright.
    pub fn verified_elements<'a>(&self, root: &'a XmlElement) -> SamlResult<Vec<&'a XmlElement>> {
        if self.trusted_certificates.is_empty() {
            return Err(SamlError::SignatureInvalid(
                "no trusted certificates configured".to_string(),
            ));
        }
        reject_duplicate_ids(root)?;

        let mut found: Vec<EnvelopedSignature<'a>> = Vec::new();
        root.walk(&NamespaceScope::new(), &mut |element, scope| {
            let child_scope = element.scope_for_children(scope);
            for child in element.elements() {
                if child.local_name() == "Signature"
                    && child.namespace_uri(&child_scope).as_deref() == Some(XMLDSIG_NS)
                {
                    found.push(EnvelopedSignature {
                        parent: element,
                        parent_scope: scope.clone(),
                        signature: child,
                        signature_scope: child_scope.clone(),
                    });
                }
            }
        });

        let mut verified = Vec::new();
        for enveloped in &found {
            match self.verify_enveloped(enveloped) {
                Ok(()) => verified.push(enveloped.parent),
                Err(e) => {
                    tracing::debug!(
                        element = %enveloped.parent.name,
                        error = %e,
                        "signature rejected"
                    );
                }
            }
        }

        Ok(verified)
    }

    /// Validates a detached signature for HTTP-Redirect binding.
    pub fn validate_redirect_binding(
        &self,
        signed_query: &str,
        signature_b64: &str,
        sig_alg: &str,
    ) -> SamlResult<()> {
        let algorithm = SignatureAlgorithm::from_uri(sig_alg).ok_or_else(|| {
            SamlError::SignatureInvalid(format!("Unknown signature algorithm: {sig_alg}"))
        })?;

        if algorithm.is_deprecated() && !self.allow_sha1 {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let signature = decode_base64(signature_b64)?;
        self.verify_with_trusted(signed_query.as_bytes(), &signature, algorithm)
    }

    fn verify_enveloped(&self, enveloped: &EnvelopedSignature<'_>) -> SamlResult<()> {
        let parsed = read_signature(enveloped.signature)?;
        let signature = &parsed.info;

        let reference_id = signature.reference_id();
        if reference_id.is_empty() || !signature.reference_uri.starts_with('#') {
            return Err(SamlError::SignatureInvalid(format!(
                "unsupported reference URI '{}'",
                signature.reference_uri
            )));
        }
        if enveloped.parent.id() != Some(reference_id) {
            return Err(SamlError::SignatureInvalid(format!(
                "signature references '{reference_id}' but is not enveloped by it"
            )));
        }

        if !signature.canonicalization.is_supported() {
            return Err(SamlError::SignatureInvalid(format!(
                "unsupported canonicalization: {}",
                signature.canonicalization.uri()
            )));
        }

        if (signature.algorithm.is_deprecated() || signature.digest_algorithm == DigestAlgorithm::Sha1)
            && !self.allow_sha1
        {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let canonical = canonicalize_with_prefixes(
            enveloped.parent,
            &enveloped.parent_scope,
            &as_strs(&parsed.reference_prefixes),
            &|e| std::ptr::eq(e, enveloped.signature),
        );
        let digest = signature.digest_algorithm.digest(canonical.as_bytes());
        if decode_base64(&signature.digest_value)? != digest {
            return Err(SamlError::SignatureInvalid(
                "digest value mismatch".to_string(),
            ));
        }

        let signed_info_scope = enveloped
            .signature
            .scope_for_children(&enveloped.signature_scope);
        let canonical_signed_info = canonicalize_with_prefixes(
            parsed.signed_info,
            &signed_info_scope,
            &as_strs(&parsed.signed_info_prefixes),
            &|_| false,
        );
        let signature_bytes = decode_base64(&signature.signature_value)?;

        self.verify_with_trusted(
            canonical_signed_info.as_bytes(),
            &signature_bytes,
            signature.algorithm,
        )
    }

    fn verify_with_trusted(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()> {
        for cert_der in &self.trusted_certificates {
            let public_key = match proxy_crypto::certificate_public_key(cert_der) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unusable trusted certificate");
                    continue;
                }
            };
            if proxy_crypto::rsa_verify(&public_key, data, signature, algorithm.rsa()) {
                return Ok(());
            }
        }

        Err(SamlError::SignatureInvalid(
            "Signature verification failed with all trusted certificates".to_string(),
        ))
    }
}

/// Fails when two elements in the document share an `ID` or `Id` value.
fn reject_duplicate_ids(root: &XmlElement) -> SamlResult<()> {
    let mut seen = HashSet::new();
    let mut duplicate = None;
    root.walk(&NamespaceScope::new(), &mut |element, _| {
        for (key, value) in &element.attributes {
            if (key == "ID" || key == "Id") && !seen.insert(value.as_str()) && duplicate.is_none() {
                duplicate = Some(value.clone());
            }
        }
    });
    match duplicate {
        Some(id) => Err(SamlError::SignatureInvalid(format!(
            "ID '{id}' appears more than once"
        ))),
        None => Ok(()),
    }
}

/// Reads the parts of a `ds:Signature` element needed for verification.
fn read_signature(element: &XmlElement) -> SamlResult<ParsedSignature<'_>> {
    let signed_info = element
        .child("SignedInfo")
        .ok_or_else(|| SamlError::MissingElement("SignedInfo".to_string()))?;

    let canonicalization_method = signed_info
        .child("CanonicalizationMethod")
        .ok_or_else(|| SamlError::MissingElement("CanonicalizationMethod".to_string()))?;
    let canonicalization_uri = canonicalization_method
        .attr("Algorithm")
        .ok_or_else(|| SamlError::MissingElement("CanonicalizationMethod".to_string()))?;
    let canonicalization = CanonicalizationAlgorithm::from_uri(canonicalization_uri)
        .ok_or_else(|| {
            SamlError::SignatureInvalid(format!(
                "unknown canonicalization: {canonicalization_uri}"
            ))
        })?;

    let signature_uri = signed_info
        .child("SignatureMethod")
        .and_then(|e| e.attr("Algorithm"))
        .ok_or_else(|| SamlError::MissingElement("SignatureMethod".to_string()))?;
    let algorithm = SignatureAlgorithm::from_uri(signature_uri).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unknown signature algorithm: {signature_uri}"))
    })?;

    let mut references = signed_info.children_named("Reference");
    let reference = references
        .next()
        .ok_or_else(|| SamlError::MissingElement("Reference".to_string()))?;
    if references.next().is_some() {
        return Err(SamlError::SignatureInvalid(
            "multiple references are not supported".to_string(),
        ));
    }

    let mut reference_prefixes = Vec::new();
    if let Some(transforms) = reference.child("Transforms") {
        for transform in transforms.children_named("Transform") {
            let uri = transform.attr("Algorithm").unwrap_or_default();
            let allowed = uri == transform_algorithms::ENVELOPED_SIGNATURE
                || CanonicalizationAlgorithm::from_uri(uri)
                    .is_some_and(|c| c.is_supported());
            if !allowed {
                return Err(SamlError::SignatureInvalid(format!(
                    "unsupported transform: {uri}"
                )));
            }
            reference_prefixes.extend(inclusive_prefixes(transform));
        }
    }

    let digest_uri = reference
        .child("DigestMethod")
        .and_then(|e| e.attr("Algorithm"))
        .ok_or_else(|| SamlError::MissingElement("DigestMethod".to_string()))?;
    let digest_algorithm = DigestAlgorithm::from_uri(digest_uri).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unknown digest algorithm: {digest_uri}"))
    })?;

    let digest_value = reference
        .child("DigestValue")
        .map(XmlElement::text)
        .ok_or_else(|| SamlError::MissingElement("DigestValue".to_string()))?;

    let signature_value = element
        .child("SignatureValue")
        .map(XmlElement::text)
        .ok_or_else(|| SamlError::MissingElement("SignatureValue".to_string()))?;

    let x509_certificate = element
        .child("KeyInfo")
        .and_then(|k| k.descendant("X509Certificate"))
        .map(XmlElement::text);

    Ok(ParsedSignature {
        info: XmlSignature {
            algorithm,
            digest_algorithm,
            canonicalization,
            reference_uri: reference.attr("URI").unwrap_or_default().to_string(),
            digest_value,
            signature_value,
            x509_certificate,
        },
        signed_info,
        reference_prefixes,
        signed_info_prefixes: inclusive_prefixes(canonicalization_method),
    })
}

/// Reads an `InclusiveNamespaces` `PrefixList` from a c14n method element.
fn inclusive_prefixes(method: &XmlElement) -> Vec<String> {
    method
        .child("InclusiveNamespaces")
        .and_then(|e| e.attr("PrefixList"))
        .map(|list| list.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

/// Decodes base64 that may be wrapped across lines.
fn decode_base64(value: &str) -> SamlResult<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SamlError::SignatureInvalid(format!("invalid base64: {e}")))
}
