//! `samlp:AuthnRequest`.
//!
//! The proxy receives these from service providers and sends its own to
//! the selected university.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

use super::{
    expect_root, generate_id, instant_attr, issuer_of, issuer_xml, open_message, push_attr,
    required_id, NameIdPolicy, SamlBinding, SAML_VERSION,
};

/// An authentication request.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    /// Message ID, echoed as `InResponseTo` by the answer.
    pub id: String,
    /// Protocol version, `2.0`.
    pub version: String,
    /// `IssueInstant`.
    pub issue_instant: DateTime<Utc>,
    /// Requester entity ID; empty when the message carried no `Issuer`.
    pub issuer: String,
    /// Where the requester wants the response delivered.
    pub assertion_consumer_service_url: Option<String>,
    /// Endpoint the request was addressed to.
    pub destination: Option<String>,
    /// Binding URI requested for the response.
    pub protocol_binding: Option<String>,
    /// Requested identifier format.
    pub name_id_policy: Option<NameIdPolicy>,
    /// `ForceAuthn="true"`.
    pub force_authn: bool,
    /// `IsPassive="true"`.
    pub is_passive: bool,
}

impl AuthnRequest {
    /// A fresh request from `issuer` with a generated ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self::with_id(generate_id(), issuer)
    }

    /// A request with a caller-chosen ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            destination: None,
            protocol_binding: None,
            name_id_policy: None,
            force_authn: false,
            is_passive: false,
        }
    }

    /// Sets `AssertionConsumerServiceURL`.
    #[must_use]
    pub fn with_acs_url(self, url: impl Into<String>) -> Self {
        Self {
            assertion_consumer_service_url: Some(url.into()),
            ..self
        }
    }

    /// Sets `Destination`.
    #[must_use]
    pub fn with_destination(self, url: impl Into<String>) -> Self {
        Self {
            destination: Some(url.into()),
            ..self
        }
    }

    /// Asks for the response over `binding`.
    #[must_use]
    pub fn with_binding(self, binding: SamlBinding) -> Self {
        Self {
            protocol_binding: Some(binding.uri().to_string()),
            ..self
        }
    }

    /// Sets the `NameIDPolicy`.
    #[must_use]
    pub fn with_name_id_policy(self, policy: NameIdPolicy) -> Self {
        Self {
            name_id_policy: Some(policy),
            ..self
        }
    }

    /// The requested response binding, when it is one the proxy knows.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding.as_deref().and_then(SamlBinding::from_uri)
    }

    /// Reads a request document.
    ///
    /// Only `ID` is mandatory. A missing issuer reads as the empty string
    /// and a missing `IssueInstant` as now.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = XmlElement::parse(xml)?;
        expect_root(&root, "AuthnRequest")?;
        let flag = |name: &str| root.attr(name) == Some("true");

        Ok(Self {
            id: required_id(&root, SamlError::InvalidRequest)?,
            version: root.attr("Version").unwrap_or(SAML_VERSION).to_string(),
            issue_instant: instant_attr(&root, "IssueInstant")?.unwrap_or_else(Utc::now),
            issuer: issuer_of(&root).unwrap_or_default(),
            assertion_consumer_service_url: root
                .attr("AssertionConsumerServiceURL")
                .map(String::from),
            destination: root.attr("Destination").map(String::from),
            protocol_binding: root.attr("ProtocolBinding").map(String::from),
            name_id_policy: root.child("NameIDPolicy").map(NameIdPolicy::from_element),
            force_authn: flag("ForceAuthn"),
            is_passive: flag("IsPassive"),
        })
    }

    /// Renders the unsigned document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = open_message(
            "AuthnRequest",
            &self.id,
            &self.version,
            &self.issue_instant,
            self.destination.as_deref(),
        );
        push_attr(
            &mut xml,
            "AssertionConsumerServiceURL",
            self.assertion_consumer_service_url.as_deref(),
        );
        push_attr(&mut xml, "ProtocolBinding", self.protocol_binding.as_deref());
        push_attr(&mut xml, "ForceAuthn", self.force_authn.then_some("true"));
        push_attr(&mut xml, "IsPassive", self.is_passive.then_some("true"));
        xml.push('>');
        xml.push_str(&issuer_xml(&self.issuer));
        if let Some(policy) = &self.name_id_policy {
            xml.push_str(&policy.to_xml());
        }
        xml.push_str("</samlp:AuthnRequest>");
        xml
    }
}
