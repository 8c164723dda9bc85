//! XML Signature creation.
//!
//! Produces enveloped signatures over a single element of a SAML document,
//! identified by its `ID` attribute.

use base64::Engine;

use crate::error::{SamlError, SamlResult};
use crate::types::{transform_algorithms, XMLDSIG_NS};
use crate::xml::{NamespaceScope, XmlElement};

use super::{canonicalize, SignatureConfig};

/// Closing tags recognised when placing the signature after an `Issuer`.
const ISSUER_TAGS: [(&str, &str); 3] = [
    ("<saml:Issuer", "</saml:Issuer>"),
    ("<saml2:Issuer", "</saml2:Issuer>"),
    ("<Issuer", "</Issuer>"),
];

/// XML document signer.
///
/// Signs SAML documents using the configured private key.
#[derive(Clone)]
pub struct XmlSigner {
    /// The private key in DER format.
    private_key_der: Vec<u8>,
    /// The X.509 certificate in DER format (optional).
    certificate_der: Option<Vec<u8>>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl std::fmt::Debug for XmlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlSigner")
            .field("has_certificate", &self.certificate_der.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl XmlSigner {
    /// Creates a new signer with an RSA private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_der` - The private key in DER format (PKCS#1 or PKCS#8)
    /// * `certificate_der` - Optional X.509 certificate in DER format
    #[must_use]
    pub fn new(private_key_der: Vec<u8>, certificate_der: Option<Vec<u8>>) -> Self {
        Self {
            private_key_der,
            certificate_der,
            config: SignatureConfig::default(),
        }
    }

    /// Creates a new signer from PEM-encoded key and certificate.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let private_key_der = proxy_crypto::private_key_der_from_pem(private_key_pem)?;
        let certificate_der = certificate_pem
            .map(proxy_crypto::certificate_der_from_pem)
            .transpose()?;

        Ok(Self::new(private_key_der, certificate_der))
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the signature configuration.
    #[must_use]
    pub const fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// Signs an XML document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The XML document to sign
    /// * `reference_id` - The ID of the element to sign (without the '#' prefix)
    ///
    /// # Returns
    ///
    /// The signed XML document with the `<ds:Signature>` element inserted
    /// after the element's `Issuer`, or as its first child when it has none.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        if !self.config.canonicalization.is_supported() {
            return Err(SamlError::SignatureCreation(format!(
                "unsupported canonicalization: {}",
                self.config.canonicalization.uri()
            )));
        }

        let root = XmlElement::parse(xml)?;
        let (element, scope) = root.find_by_id(reference_id).ok_or_else(|| {
            SamlError::SignatureCreation(format!("element with ID '{reference_id}' not found"))
        })?;

        // Nothing is enveloped yet, so the whole element is digested.
        let canonical_element = canonicalize(element, &scope, &|_| false);
        let digest = self
            .config
            .algorithm
            .digest()
            .digest(canonical_element.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        let signed_info = self.build_signed_info(reference_id, &digest_b64);
        let signed_info_element = XmlElement::parse(&signed_info)?;
        let canonical_signed_info =
            canonicalize(&signed_info_element, &NamespaceScope::new(), &|_| false);

        let signature_value = self.sign_data(canonical_signed_info.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

        let signature_element = self.build_signature_element(&signed_info, &signature_b64);
        let position = find_insert_position(xml, reference_id)?;

        Ok(format!(
            "{}{}{}",
            &xml[..position],
            signature_element,
            &xml[position..]
        ))
    }

    /// Signs an HTTP-Redirect query string.
    ///
    /// `signed_query` must be `SAMLRequest=...[&RelayState=...]&SigAlg=...`
    /// with URL-encoded values. Returns the base64 signature.
    pub fn sign_query(&self, signed_query: &str) -> SamlResult<String> {
        let signature = self.sign_data(signed_query.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signature))
    }

    /// Signs raw data using the configured algorithm.
    fn sign_data(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        proxy_crypto::rsa_sign(&self.private_key_der, data, self.config.algorithm.rsa())
            .map_err(|e| SamlError::SignatureCreation(format!("RSA signing failed: {e}")))
    }

    fn build_signed_info(&self, reference_id: &str, digest_b64: &str) -> String {
        let c14n = self.config.canonicalization.uri();
        format!(
            concat!(
                r#"<ds:SignedInfo xmlns:ds="{ns}">"#,
                r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
                r#"<ds:SignatureMethod Algorithm="{alg}"/>"#,
                r##"<ds:Reference URI="#{id}">"##,
                r#"<ds:Transforms>"#,
                r#"<ds:Transform Algorithm="{enveloped}"/>"#,
                r#"<ds:Transform Algorithm="{c14n}"/>"#,
                r#"</ds:Transforms>"#,
                r#"<ds:DigestMethod Algorithm="{digest}"/>"#,
                r#"<ds:DigestValue>{value}</ds:DigestValue>"#,
                r#"</ds:Reference>"#,
                r#"</ds:SignedInfo>"#
            ),
            ns = XMLDSIG_NS,
            c14n = c14n,
            alg = self.config.algorithm.uri(),
            id = reference_id,
            enveloped = transform_algorithms::ENVELOPED_SIGNATURE,
            digest = self.config.algorithm.digest().uri(),
            value = digest_b64,
        )
    }

    fn build_signature_element(&self, signed_info: &str, signature_b64: &str) -> String {
        let mut signature = format!(
            r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}">{signed_info}<ds:SignatureValue>{signature_b64}</ds:SignatureValue>"#
        );

        if self.config.include_certificate {
            if let Some(cert) = &self.certificate_der {
                let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
                signature.push_str(&format!(
                    "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"
                ));
            }
        }

        signature.push_str("</ds:Signature>");
        signature
    }
}

/// Finds where the signature goes: after the signed element's `Issuer`
/// when that is its first child, otherwise right after its start tag.
fn find_insert_position(xml: &str, reference_id: &str) -> SamlResult<usize> {
    let id_attr = xml
        .find(&format!(" ID=\"{reference_id}\""))
        .or_else(|| xml.find(&format!(" Id=\"{reference_id}\"")))
        .ok_or_else(|| {
            SamlError::SignatureCreation(format!("element with ID '{reference_id}' not found"))
        })?;

    let tag_end = xml[id_attr..]
        .find('>')
        .map(|pos| id_attr + pos + 1)
        .ok_or_else(|| SamlError::SignatureCreation("malformed XML element".to_string()))?;

    if xml[..tag_end].ends_with("/>") {
        return Err(SamlError::SignatureCreation(
            "cannot sign an empty element".to_string(),
        ));
    }

    let rest = &xml[tag_end..];
    let first_child = rest.len() - rest.trim_start().len();
    let after_space = &rest[first_child..];

    for (open, close) in ISSUER_TAGS {
        let is_issuer = after_space
            .strip_prefix(open)
            .and_then(|s| s.chars().next())
            .is_some_and(|c| c == '>' || c.is_whitespace());
        if is_issuer {
            if let Some(pos) = after_space.find(close) {
                return Ok(tag_end + first_child + pos + close.len());
            }
        }
    }

    Ok(tag_end)
}
