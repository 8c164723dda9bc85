//! SAML 2.0 metadata.
//!
//! Reads the `EntityDescriptor` of a university identity provider and
//! renders the proxy's own IdP-facing and SP-facing metadata.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::types::{expect_root, NameIdFormat, SamlBinding, MD_NS, XMLDSIG_NS};
use crate::xml::{escape_attr, escape_text, XmlElement};

const PROTOCOL_SUPPORT: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// A protocol endpoint advertised in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Binding URI.
    pub binding: String,
    /// Endpoint URL.
    pub location: String,
}

impl Endpoint {
    fn from_element(element: &XmlElement) -> Option<Self> {
        Some(Self {
            binding: element.attr("Binding")?.to_string(),
            location: element.attr("Location")?.to_string(),
        })
    }
}

/// A name in a particular language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    /// The `xml:lang` tag, if present.
    pub lang: Option<String>,
    /// The name.
    pub value: String,
}

/// The identity provider role of an entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdpSsoDescriptor {
    /// Single sign-on endpoints.
    pub single_sign_on_services: Vec<Endpoint>,
    /// Single logout endpoints.
    pub single_logout_services: Vec<Endpoint>,
    /// Base64 DER signing certificates.
    pub signing_certificates: Vec<String>,
    /// Supported NameID formats.
    pub name_id_formats: Vec<String>,
    /// Whether the IdP requires signed AuthnRequests.
    pub want_authn_requests_signed: bool,
}

impl IdpSsoDescriptor {
    fn from_element(element: &XmlElement) -> Self {
        let signing_certificates = element
            .children_named("KeyDescriptor")
            .filter(|kd| matches!(kd.attr("use"), None | Some("signing")))
            .flat_map(|kd| kd.descendants_named("X509Certificate"))
            .map(|cert| cert.text().split_whitespace().collect::<String>())
            .filter(|cert| !cert.is_empty())
            .collect();

        Self {
            single_sign_on_services: element
                .children_named("SingleSignOnService")
                .filter_map(Endpoint::from_element)
                .collect(),
            single_logout_services: element
                .children_named("SingleLogoutService")
                .filter_map(Endpoint::from_element)
                .collect(),
            signing_certificates,
            name_id_formats: element
                .children_named("NameIDFormat")
                .map(XmlElement::text)
                .collect(),
            want_authn_requests_signed: element.attr("WantAuthnRequestsSigned") == Some("true"),
        }
    }
}

/// An entity's metadata, as far as the proxy needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// The entity ID.
    pub entity_id: String,
    /// The IdP role, if the entity has one.
    pub idp_sso_descriptor: Option<IdpSsoDescriptor>,
    /// `OrganizationDisplayName` values.
    pub display_names: Vec<LocalizedName>,
}

impl EntityDescriptor {
    /// Parses an `EntityDescriptor` document.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = XmlElement::parse(xml)?;
        expect_root(&root, "EntityDescriptor")?;
        Self::from_element(&root)
    }

    /// Reads an `EntityDescriptor` element.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let entity_id = element
            .attr("entityID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::InvalidMetadata("EntityDescriptor has no entityID".into()))?
            .to_string();

        let display_names = element
            .child("Organization")
            .map(|org| {
                org.children_named("OrganizationDisplayName")
                    .map(|name| LocalizedName {
                        lang: name.attr("xml:lang").map(String::from),
                        value: name.text(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            entity_id,
            idp_sso_descriptor: element
                .child("IDPSSODescriptor")
                .map(IdpSsoDescriptor::from_element),
            display_names,
        })
    }

    /// Returns true if the entity has an IdP role.
    #[must_use]
    pub const fn is_idp(&self) -> bool {
        self.idp_sso_descriptor.is_some()
    }

    /// Returns the SSO endpoint for a binding.
    #[must_use]
    pub fn sso_location(&self, binding: SamlBinding) -> Option<&str> {
        self.idp_sso_descriptor
            .as_ref()?
            .single_sign_on_services
            .iter()
            .find(|endpoint| endpoint.binding == binding.uri())
            .map(|endpoint| endpoint.location.as_str())
    }

    /// Returns the signing certificates as DER.
    pub fn signing_certificates_der(&self) -> SamlResult<Vec<Vec<u8>>> {
        self.idp_sso_descriptor
            .iter()
            .flat_map(|idp| idp.signing_certificates.iter())
            .map(|cert| {
                base64::engine::general_purpose::STANDARD
                    .decode(cert)
                    .map_err(SamlError::from)
            })
            .collect()
    }

    /// English display name, else the first display name, else the entity ID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_names
            .iter()
            .find(|name| name.lang.as_deref() == Some("en"))
            .or_else(|| self.display_names.first())
            .map_or(self.entity_id.as_str(), |name| name.value.as_str())
    }
}

fn key_descriptor(certificate_der: &[u8]) -> String {
    format!(
        r#"<md:KeyDescriptor use="signing"><ds:KeyInfo xmlns:ds="{XMLDSIG_NS}"><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>"#,
        base64::engine::general_purpose::STANDARD.encode(certificate_der)
    )
}

fn endpoint(element: &str, binding: SamlBinding, location: &str) -> String {
    format!(
        r#"<md:{element} Binding="{}" Location="{}"/>"#,
        binding.uri(),
        escape_attr(location)
    )
}

fn name_id_format(format: NameIdFormat) -> String {
    format!(
        "<md:NameIDFormat>{}</md:NameIDFormat>",
        escape_text(format.uri())
    )
}

fn entity_descriptor(entity_id: &str, role: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{MD_NS}" entityID="{}">{role}</md:EntityDescriptor>"#,
        escape_attr(entity_id)
    )
}

/// Renders the metadata SPs use to trust the proxy as their IdP.
#[derive(Debug, Clone)]
pub struct IdpMetadataBuilder {
    entity_id: String,
    sso_url: String,
    slo_url: Option<String>,
    certificate_der: Vec<u8>,
}

impl IdpMetadataBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        sso_url: impl Into<String>,
        certificate_der: Vec<u8>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            sso_url: sso_url.into(),
            slo_url: None,
            certificate_der,
        }
    }

    /// Advertises a single logout endpoint.
    #[must_use]
    pub fn slo_url(mut self, url: impl Into<String>) -> Self {
        self.slo_url = Some(url.into());
        self
    }

    /// Renders the metadata document.
    #[must_use]
    pub fn build(&self) -> String {
        let mut role = format!(
            r#"<md:IDPSSODescriptor WantAuthnRequestsSigned="false" protocolSupportEnumeration="{PROTOCOL_SUPPORT}">"#
        );
        role.push_str(&key_descriptor(&self.certificate_der));
        if let Some(slo) = &self.slo_url {
            role.push_str(&endpoint("SingleLogoutService", SamlBinding::HttpPost, slo));
        }
        role.push_str(&name_id_format(NameIdFormat::Transient));
        role.push_str(&name_id_format(NameIdFormat::Persistent));
        role.push_str(&endpoint(
            "SingleSignOnService",
            SamlBinding::HttpRedirect,
            &self.sso_url,
        ));
        role.push_str(&endpoint(
            "SingleSignOnService",
            SamlBinding::HttpPost,
            &self.sso_url,
        ));
        role.push_str("</md:IDPSSODescriptor>");
        entity_descriptor(&self.entity_id, &role)
    }
}

/// Renders the metadata universities use to trust the proxy as an SP.
#[derive(Debug, Clone)]
pub struct SpMetadataBuilder {
    entity_id: String,
    acs_url: String,
    slo_url: Option<String>,
    certificate_der: Vec<u8>,
}

impl SpMetadataBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        acs_url: impl Into<String>,
        certificate_der: Vec<u8>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            acs_url: acs_url.into(),
            slo_url: None,
            certificate_der,
        }
    }

    /// Advertises a single logout endpoint.
    #[must_use]
    pub fn slo_url(mut self, url: impl Into<String>) -> Self {
        self.slo_url = Some(url.into());
        self
    }

    /// Renders the metadata document.
    #[must_use]
    pub fn build(&self) -> String {
        let mut role = format!(
            r#"<md:SPSSODescriptor AuthnRequestsSigned="true" WantAssertionsSigned="true" protocolSupportEnumeration="{PROTOCOL_SUPPORT}">"#
        );
        role.push_str(&key_descriptor(&self.certificate_der));
        if let Some(slo) = &self.slo_url {
            role.push_str(&endpoint("SingleLogoutService", SamlBinding::HttpPost, slo));
        }
        role.push_str(&name_id_format(NameIdFormat::Transient));
        role.push_str(&format!(
            r#"<md:AssertionConsumerService Binding="{}" Location="{}" index="0" isDefault="true"/>"#,
            SamlBinding::HttpPost.uri(),
            escape_attr(&self.acs_url)
        ));
        role.push_str("</md:SPSSODescriptor>");
        entity_descriptor(&self.entity_id, &role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIVERSITY: &str = r#"<?xml version="1.0"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" entityID="https://idp.example.edu/idp">
  <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:KeyDescriptor use="signing"><ds:KeyInfo><ds:X509Data><ds:X509Certificate>
      QUJD
      REVG
    </ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>
    <md:KeyDescriptor use="encryption"><ds:KeyInfo><ds:X509Data><ds:X509Certificate>WFla</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>
    <md:KeyDescriptor><ds:KeyInfo><ds:X509Data><ds:X509Certificate>R0hJ</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:transient</md:NameIDFormat>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.edu/sso/post"/>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.edu/sso/redirect"/>
    <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.edu/slo"/>
  </md:IDPSSODescriptor>
  <md:Organization>
    <md:OrganizationName xml:lang="en">example</md:OrganizationName>
    <md:OrganizationDisplayName xml:lang="fr">Université Exemple</md:OrganizationDisplayName>
    <md:OrganizationDisplayName xml:lang="en">Example University</md:OrganizationDisplayName>
  </md:Organization>
</md:EntityDescriptor>"#;

    #[test]
    fn parses_university_metadata() {
        let entity = EntityDescriptor::parse(UNIVERSITY).unwrap();
        assert_eq!(entity.entity_id, "https://idp.example.edu/idp");
        assert!(entity.is_idp());
        assert_eq!(
            entity.sso_location(SamlBinding::HttpRedirect),
            Some("https://idp.example.edu/sso/redirect")
        );
        assert_eq!(
            entity.sso_location(SamlBinding::HttpPost),
            Some("https://idp.example.edu/sso/post")
        );

        let idp = entity.idp_sso_descriptor.as_ref().unwrap();
        assert_eq!(idp.signing_certificates, vec!["QUJDREVG", "R0hJ"]);
        assert_eq!(idp.single_logout_services.len(), 1);
        assert_eq!(idp.name_id_formats.len(), 1);
        assert_eq!(entity.signing_certificates_der().unwrap()[0], b"ABCDEF");
    }

    #[test]
    fn display_name_prefers_english() {
        let entity = EntityDescriptor::parse(UNIVERSITY).unwrap();
        assert_eq!(entity.display_name(), "Example University");
    }

    #[test]
    fn display_name_falls_back() {
        let mut entity = EntityDescriptor::parse(UNIVERSITY).unwrap();
        entity.display_names.retain(|n| n.lang.as_deref() != Some("en"));
        assert_eq!(entity.display_name(), "Université Exemple");

        entity.display_names.clear();
        assert_eq!(entity.display_name(), "https://idp.example.edu/idp");
    }

    #[test]
    fn sp_only_entity_has_no_sso() {
        let xml = r#"<EntityDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata" entityID="https://sp.example.com"><SPSSODescriptor/></EntityDescriptor>"#;
        let entity = EntityDescriptor::parse(xml).unwrap();
        assert!(!entity.is_idp());
        assert!(entity.sso_location(SamlBinding::HttpRedirect).is_none());
        assert!(entity.signing_certificates_der().unwrap().is_empty());
    }

    #[test]
    fn missing_entity_id_is_rejected() {
        let xml = r#"<EntityDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata"/>"#;
        assert!(matches!(
            EntityDescriptor::parse(xml),
            Err(SamlError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn idp_metadata_reads_back() {
        let xml = IdpMetadataBuilder::new(
            "https://proxy.example.org",
            "https://proxy.example.org/saml/sso",
            b"cert".to_vec(),
        )
        .slo_url("https://proxy.example.org/saml/slo")
        .build();

        assert!(xml.contains(r#"WantAuthnRequestsSigned="false""#));
        let entity = EntityDescriptor::parse(&xml).unwrap();
        assert_eq!(entity.entity_id, "https://proxy.example.org");
        assert_eq!(
            entity.sso_location(SamlBinding::HttpRedirect),
            Some("https://proxy.example.org/saml/sso")
        );
        assert_eq!(
            entity.sso_location(SamlBinding::HttpPost),
            Some("https://proxy.example.org/saml/sso")
        );
        let idp = entity.idp_sso_descriptor.unwrap();
        assert_eq!(idp.name_id_formats.len(), 2);
        assert_eq!(idp.single_logout_services[0].binding, SamlBinding::HttpPost.uri());
        assert_eq!(entity.display_names.len(), 0);
    }

    #[test]
    fn sp_metadata_advertises_signed_requests() {
        let xml = SpMetadataBuilder::new(
            "https://proxy.example.org",
            "https://proxy.example.org/sp/acs",
            b"cert".to_vec(),
        )
        .slo_url("https://proxy.example.org/sp/slo")
        .build();

        let root = XmlElement::parse(&xml).unwrap();
        let sp = root.child("SPSSODescriptor").unwrap();
        assert_eq!(sp.attr("AuthnRequestsSigned"), Some("true"));
        assert_eq!(sp.attr("WantAssertionsSigned"), Some("true"));
        let acs = sp.child("AssertionConsumerService").unwrap();
        assert_eq!(acs.attr("Location"), Some("https://proxy.example.org/sp/acs"));
        assert_eq!(acs.attr("index"), Some("0"));
        assert_eq!(acs.attr("isDefault"), Some("true"));
        assert_eq!(
            sp.child("NameIDFormat").map(XmlElement::text).as_deref(),
            Some(NameIdFormat::Transient.uri())
        );
    }
}
