//! `samlp:Status`.

use crate::xml::{escape_attr, escape_text, XmlElement};

use super::{status_codes, sub_status_codes};

/// Outcome carried by every protocol response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Top-level code, possibly with a nested sub-code.
    pub status_code: StatusCode,
    /// Free-text `StatusMessage`.
    pub status_message: Option<String>,
}

impl Status {
    fn with_code(status_code: StatusCode, message: Option<String>) -> Self {
        Self {
            status_code,
            status_message: message,
        }
    }

    /// `Success`, no message.
    #[must_use]
    pub fn success() -> Self {
        Self::with_code(StatusCode::new(status_codes::SUCCESS), None)
    }

    /// `Requester`: the request was at fault.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::new(status_codes::REQUESTER), Some(message.into()))
    }

    /// `Responder`: the responder failed.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::new(status_codes::RESPONDER), Some(message.into()))
    }

    /// `Responder` / `AuthnFailed`: the user did not authenticate.
    #[must_use]
    pub fn authn_failed(message: impl Into<String>) -> Self {
        let code = StatusCode {
            value: status_codes::RESPONDER.to_string(),
            sub_code: Some(Box::new(StatusCode::new(sub_status_codes::AUTHN_FAILED))),
        };
        Self::with_code(code, Some(message.into()))
    }

    /// Whether the top-level code is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.value == status_codes::SUCCESS
    }

    /// Reads a `samlp:Status` element. A missing `StatusCode` reads as an
    /// empty, non-success code.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            status_code: element
                .child("StatusCode")
                .map_or_else(|| StatusCode::new(""), StatusCode::from_element),
            status_message: element.child("StatusMessage").map(XmlElement::text),
        }
    }

    /// Renders a `samlp:Status` element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let message = self
            .status_message
            .as_deref()
            .map(|m| format!("<samlp:StatusMessage>{}</samlp:StatusMessage>", escape_text(m)))
            .unwrap_or_default();
        format!("<samlp:Status>{}{message}</samlp:Status>", self.status_code.to_xml())
    }
}

/// A `StatusCode` and its optional nested code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCode {
    /// Code URI.
    pub value: String,
    /// Nested, more specific code.
    pub sub_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// A code without a nested one.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            sub_code: None,
        }
    }

    /// The nested code's URI.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.sub_code.as_deref().map(|sub| sub.value.as_str())
    }

    fn from_element(element: &XmlElement) -> Self {
        Self {
            value: element.attr("Value").unwrap_or_default().to_string(),
            sub_code: element
                .child("StatusCode")
                .map(|nested| Box::new(Self::from_element(nested))),
        }
    }

    fn to_xml(&self) -> String {
        let value = escape_attr(&self.value);
        match &self.sub_code {
            Some(sub) => format!(
                r#"<samlp:StatusCode Value="{value}">{}</samlp:StatusCode>"#,
                sub.to_xml()
            ),
            None => format!(r#"<samlp:StatusCode Value="{value}"/>"#),
        }
    }
}
