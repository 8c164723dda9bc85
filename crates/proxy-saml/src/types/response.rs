//! `samlp:Response`.
//!
//! Parsed when a university answers the proxy, built when the proxy
//! answers a service provider.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSigner;
use crate::xml::XmlElement;

use super::{
    expect_root, generate_id, instant_attr, issuer_of, issuer_xml, open_message, push_attr,
    required_id, Assertion, Status, SAML_VERSION,
};

/// A protocol response carrying zero or more assertions.
#[derive(Debug, Clone)]
pub struct Response {
    /// Message ID.
    pub id: String,
    /// Protocol version.
    pub version: String,
    /// `IssueInstant`, checked against the allowed issue delay.
    pub issue_instant: DateTime<Utc>,
    /// Issuer entity ID; optional on the response element.
    pub issuer: Option<String>,
    /// ID of the request this answers. Absent for unsolicited responses.
    pub in_response_to: Option<String>,
    /// ACS the response was addressed to.
    pub destination: Option<String>,
    /// Top-level status.
    pub status: Status,
    /// Plain assertions in document order.
    pub assertions: Vec<Assertion>,
}

impl Response {
    /// An empty success response from `issuer`.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: Some(issuer.into()),
            in_response_to: None,
            destination: None,
            status: Status::success(),
            assertions: Vec::new(),
        }
    }

    /// A response with no assertions and a failure `status`.
    #[must_use]
    pub fn error(issuer: impl Into<String>, status: Status) -> Self {
        Self::success(issuer).with_status(status)
    }

    /// Replaces the status.
    #[must_use]
    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    /// Sets `InResponseTo`.
    #[must_use]
    pub fn in_response_to(self, request_id: impl Into<String>) -> Self {
        Self {
            in_response_to: Some(request_id.into()),
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

    /// Appends an assertion.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// True for a top-level `Success` status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The assertion the proxy acts on.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }

    /// Reads a response document.
    ///
    /// `ID`, `IssueInstant` and `Status` are required. A response carrying
    /// an `EncryptedAssertion` is refused since the proxy publishes no
    /// encryption key.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        Self::from_element(&XmlElement::parse(xml)?)
    }

    /// Reads a response from an already parsed `samlp:Response` element.
    pub fn from_element(root: &XmlElement) -> SamlResult<Self> {
        expect_root(root, "Response")?;

        if root.child("EncryptedAssertion").is_some() {
            return Err(SamlError::InvalidResponse(
                "encrypted assertions are not supported".to_string(),
            ));
        }

        let id = required_id(root, SamlError::InvalidResponse)?;
        let Some(issue_instant) = instant_attr(root, "IssueInstant")? else {
            return Err(SamlError::InvalidResponse(format!(
                "Response {id} has no IssueInstant"
            )));
        };
        let Some(status) = root.child("Status").map(Status::from_element) else {
            return Err(SamlError::MissingElement("Status".to_string()));
        };
        let assertions = root
            .children_named("Assertion")
            .map(Assertion::from_element)
            .collect::<SamlResult<Vec<_>>>()?;

        Ok(Self {
            version: root.attr("Version").unwrap_or(SAML_VERSION).to_string(),
            issuer: issuer_of(root),
            in_response_to: root.attr("InResponseTo").map(String::from),
            destination: root.attr("Destination").map(String::from),
            id,
            issue_instant,
            status,
            assertions,
        })
    }

    /// Renders the unsigned document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = open_message(
            "Response",
            &self.id,
            &self.version,
            &self.issue_instant,
            self.destination.as_deref(),
        );
        push_attr(&mut xml, "InResponseTo", self.in_response_to.as_deref());
        xml.push('>');
        if let Some(issuer) = &self.issuer {
            xml.push_str(&issuer_xml(issuer));
        }
        xml.push_str(&self.status.to_xml());
        xml.extend(self.assertions.iter().map(Assertion::to_xml));
        xml.push_str("</samlp:Response>");
        xml
    }

    /// Signs each assertion first, then the response over them, so the outer
    /// signature covers the inner ones.
    pub fn to_signed_xml(&self, signer: &XmlSigner) -> SamlResult<String> {
        let signed = self
            .assertions
            .iter()
            .try_fold(self.to_xml(), |xml, assertion| signer.sign(&xml, &assertion.id))?;
        signer.sign(&signed, &self.id)
    }
}
