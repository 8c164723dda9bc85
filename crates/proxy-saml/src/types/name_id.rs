//! `NameID` and `NameIDPolicy`.

use crate::xml::{escape_text, XmlElement};

use super::{push_attr, NameIdFormat};

/// The subject identifier.
///
/// `format` is kept as the raw URI so identifiers in formats the proxy has
/// no enum variant for pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    /// Identifier text.
    pub value: String,
    /// `Format` URI.
    pub format: Option<String>,
    /// `NameQualifier`, usually the issuing IdP.
    pub name_qualifier: Option<String>,
    /// `SPNameQualifier`, usually the SP it was issued for.
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// An identifier with no format or qualifiers.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// A transient identifier.
    #[must_use]
    pub fn transient(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Transient)
    }

    /// Replaces the format.
    #[must_use]
    pub fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// The format as a known variant; unknown or absent reads as unspecified.
    #[must_use]
    pub fn parsed_format(&self) -> NameIdFormat {
        self.format
            .as_deref()
            .and_then(NameIdFormat::from_uri)
            .unwrap_or_default()
    }

    /// Reads a `NameID` element.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        let attr = |name: &str| element.attr(name).map(String::from);
        Self {
            value: element.text(),
            format: attr("Format"),
            name_qualifier: attr("NameQualifier"),
            sp_name_qualifier: attr("SPNameQualifier"),
        }
    }

    /// Renders a `saml:NameID` element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<saml:NameID");
        push_attr(&mut xml, "Format", self.format.as_deref());
        push_attr(&mut xml, "NameQualifier", self.name_qualifier.as_deref());
        push_attr(&mut xml, "SPNameQualifier", self.sp_name_qualifier.as_deref());
        xml.push('>');
        xml.push_str(&escape_text(&self.value));
        xml.push_str("</saml:NameID>");
        xml
    }
}

/// What kind of identifier an AuthnRequest asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIdPolicy {
    /// Requested `Format` URI.
    pub format: Option<String>,
    /// Requested `SPNameQualifier`.
    pub sp_name_qualifier: Option<String>,
    /// `AllowCreate`.
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Asks for `format`, without permission to create a new identifier.
    #[must_use]
    pub fn with_format(format: NameIdFormat) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            ..Self::default()
        }
    }

    /// Sets `AllowCreate`.
    #[must_use]
    pub const fn allow_create(mut self, allow: bool) -> Self {
        self.allow_create = allow;
        self
    }

    /// The requested format, if it is one the proxy knows.
    #[must_use]
    pub fn parsed_format(&self) -> Option<NameIdFormat> {
        self.format.as_deref().and_then(NameIdFormat::from_uri)
    }

    /// Reads a `NameIDPolicy` element.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            format: element.attr("Format").map(String::from),
            sp_name_qualifier: element.attr("SPNameQualifier").map(String::from),
            allow_create: matches!(element.attr("AllowCreate"), Some("true" | "1")),
        }
    }

    /// Renders a `samlp:NameIDPolicy` element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<samlp:NameIDPolicy");
        push_attr(&mut xml, "Format", self.format.as_deref());
        push_attr(&mut xml, "SPNameQualifier", self.sp_name_qualifier.as_deref());
        xml.push_str(&format!(r#" AllowCreate="{}"/>"#, self.allow_create));
        xml
    }
}
