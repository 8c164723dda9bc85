//! SAML 2.0 types and data structures.
//!
//! This module contains the SAML messages the proxy exchanges on both legs:
//! requests, responses, assertions and logout messages, each with a parser
//! for inbound XML and a renderer for outbound XML.

mod assertion;
mod authn_request;
mod constants;
mod logout;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use name_id::*;
pub use response::*;
pub use status::*;

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{escape_attr, escape_text, XmlElement};

/// Generates a fresh message ID (an XML NCName).
#[must_use]
pub fn generate_id() -> String {
    format!("_id{}", uuid::Uuid::new_v4())
}

/// Formats a timestamp as a SAML `dateTime`.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format(SAML_DATETIME_FORMAT).to_string()
}

/// Parses a SAML `dateTime`.
pub fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| SamlError::XmlParse(format!("invalid dateTime '{value}': {e}")))
}

/// Reads an optional `dateTime` attribute.
pub(crate) fn instant_attr(
    element: &XmlElement,
    name: &str,
) -> SamlResult<Option<DateTime<Utc>>> {
    element.attr(name).map(parse_instant).transpose()
}

/// Reads the text of the `Issuer` child, if any.
pub(crate) fn issuer_of(element: &XmlElement) -> Option<String> {
    element.child("Issuer").map(XmlElement::text)
}

/// Appends ` name="value"` when a value is present.
pub(crate) fn push_attr(xml: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        xml.push_str(&format!(r#" {name}="{}""#, escape_attr(value)));
    }
}

/// Starts a `samlp:` message element with the attributes every protocol
/// message carries. The start tag is left open for further attributes.
pub(crate) fn open_message(
    local_name: &str,
    id: &str,
    version: &str,
    issue_instant: &DateTime<Utc>,
    destination: Option<&str>,
) -> String {
    let mut xml = format!(
        r#"<samlp:{local_name} xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{}" Version="{}" IssueInstant="{}""#,
        escape_attr(id),
        escape_attr(version),
        format_instant(issue_instant),
    );
    push_attr(&mut xml, "Destination", destination);
    xml
}

/// Renders `<saml:Issuer>`.
pub(crate) fn issuer_xml(issuer: &str) -> String {
    format!("<saml:Issuer>{}</saml:Issuer>", escape_text(issuer))
}

/// The mandatory `ID` attribute; absent or empty is reported via `missing`.
pub(crate) fn required_id(
    element: &XmlElement,
    missing: impl FnOnce(String) -> SamlError,
) -> SamlResult<String> {
    match element.attr("ID") {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(missing(format!("{} has no ID", element.local_name()))),
    }
}

/// Checks the root element's local name.
pub(crate) fn expect_root(element: &XmlElement, local_name: &str) -> SamlResult<()> {
    if element.local_name() == local_name {
        Ok(())
    } else {
        Err(SamlError::XmlParse(format!(
            "expected {local_name}, found {}",
            element.name
        )))
    }
}
