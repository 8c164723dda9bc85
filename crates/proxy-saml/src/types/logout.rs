//! Single logout messages.
//!
//! The proxy only answers logout requests; it never starts a logout of its own.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape_text, XmlElement};

use super::{
    expect_root, generate_id, instant_attr, issuer_of, issuer_xml, open_message, push_attr,
    required_id, NameId, Status, SAML_VERSION,
};

/// `samlp:LogoutRequest`.
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    /// Message ID.
    pub id: String,
    /// Protocol version.
    pub version: String,
    /// `IssueInstant`.
    pub issue_instant: DateTime<Utc>,
    /// Requester entity ID; empty when absent.
    pub issuer: String,
    /// Endpoint the request was addressed to.
    pub destination: Option<String>,
    /// Principal being logged out.
    pub name_id: Option<NameId>,
    /// `SessionIndex` values, in order.
    pub session_indexes: Vec<String>,
}

impl LogoutRequest {
    /// A request from `issuer` for `name_id` with a generated ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>, name_id: NameId) -> Self {
        Self {
            id: generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            name_id: Some(name_id),
            session_indexes: Vec::new(),
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

    /// Adds a `SessionIndex`.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Where the answer goes: `Destination` when present, otherwise the
    /// requester's entity ID.
    #[must_use]
    pub fn reply_destination(&self) -> &str {
        self.destination.as_deref().unwrap_or(&self.issuer)
    }

    /// Reads a request document; `ID` is required.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = XmlElement::parse(xml)?;
        expect_root(&root, "LogoutRequest")?;

        Ok(Self {
            id: required_id(&root, SamlError::InvalidRequest)?,
            version: root.attr("Version").unwrap_or(SAML_VERSION).to_string(),
            issue_instant: instant_attr(&root, "IssueInstant")?.unwrap_or_else(Utc::now),
            issuer: issuer_of(&root).unwrap_or_default(),
            destination: root.attr("Destination").map(String::from),
            name_id: root.child("NameID").map(NameId::from_element),
            session_indexes: root
                .children_named("SessionIndex")
                .map(XmlElement::text)
                .collect(),
        })
    }

    /// Renders the unsigned document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = open_message(
            "LogoutRequest",
            &self.id,
            &self.version,
            &self.issue_instant,
            self.destination.as_deref(),
        );
        xml.push('>');
        xml.push_str(&issuer_xml(&self.issuer));
        if let Some(name_id) = &self.name_id {
            xml.push_str(&name_id.to_xml());
        }
        for index in &self.session_indexes {
            xml.push_str("<samlp:SessionIndex>");
            xml.push_str(&escape_text(index));
            xml.push_str("</samlp:SessionIndex>");
        }
        xml.push_str("</samlp:LogoutRequest>");
        xml
    }
}

/// `samlp:LogoutResponse`.
#[derive(Debug, Clone)]
pub struct LogoutResponse {
    /// Message ID, the reference of the proxy's signature.
    pub id: String,
    /// Protocol version.
    pub version: String,
    /// `IssueInstant`.
    pub issue_instant: DateTime<Utc>,
    /// Responder entity ID.
    pub issuer: String,
    /// ID of the answered `LogoutRequest`.
    pub in_response_to: Option<String>,
    /// Where the response is delivered.
    pub destination: Option<String>,
    /// Outcome.
    pub status: Status,
}

impl LogoutResponse {
    /// A `Success` response from `issuer`.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::with_status(issuer, Status::success())
    }

    /// A response from `issuer` carrying `status`.
    #[must_use]
    pub fn with_status(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            status,
        }
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

    /// True for a top-level `Success` status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Reads a response document. `Status` is required; `ID` is not.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = XmlElement::parse(xml)?;
        expect_root(&root, "LogoutResponse")?;
        let status = root
            .child("Status")
            .map(Status::from_element)
            .ok_or_else(|| SamlError::MissingElement("Status".to_string()))?;

        Ok(Self {
            id: root.attr("ID").unwrap_or_default().to_string(),
            version: root.attr("Version").unwrap_or(SAML_VERSION).to_string(),
            issue_instant: instant_attr(&root, "IssueInstant")?.unwrap_or_else(Utc::now),
            issuer: issuer_of(&root).unwrap_or_default(),
            in_response_to: root.attr("InResponseTo").map(String::from),
            destination: root.attr("Destination").map(String::from),
            status,
        })
    }

    /// Renders the unsigned document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = open_message(
            "LogoutResponse",
            &self.id,
            &self.version,
            &self.issue_instant,
            self.destination.as_deref(),
        );
        push_attr(&mut xml, "InResponseTo", self.in_response_to.as_deref());
        xml.push('>');
        xml.push_str(&issuer_xml(&self.issuer));
        xml.push_str(&self.status.to_xml());
        xml.push_str("</samlp:LogoutResponse>");
        xml
    }
}
