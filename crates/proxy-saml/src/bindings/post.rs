//! HTTP-POST binding.
//!
//! Messages travel base64-encoded in a self-submitting HTML form.

use base64::Engine;

use crate::error::SamlResult;

use super::{decode_base64, into_utf8, select_message, DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Renders the auto-submit page that delivers a SAML response to
    /// `destination`.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        AutoPostForm {
            action: destination,
            message_type: SamlMessageType::Response,
            xml,
            relay_state,
        }
        .render()
    }

    /// Decodes a posted `SAMLRequest` or `SAMLResponse` field.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = select_message(saml_request, saml_response)?;

        Ok(DecodedMessage {
            xml: into_utf8(decode_base64(encoded)?)?,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: None,
            sig_alg: None,
        })
    }
}

/// A hidden form posting one SAML message, submitted on load.
struct AutoPostForm<'a> {
    action: &'a str,
    message_type: SamlMessageType,
    xml: &'a str,
    relay_state: Option<&'a str>,
}

impl AutoPostForm<'_> {
    fn render(&self) -> String {
        let mut fields = hidden_input(
            self.message_type.param_name(),
            &base64::engine::general_purpose::STANDARD.encode(self.xml),
        );
        if let Some(relay_state) = self.relay_state {
            fields.push_str(&hidden_input("RelayState", relay_state));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Continue</title></head>
<body onload="document.forms[0].submit()">
<form method="post" action="{action}">
{fields}<noscript><button type="submit">Continue</button></noscript>
</form>
</body>
</html>"#,
            action = html_escape(self.action),
        )
    }
}

fn hidden_input(name: &str, value: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{name}\" value=\"{}\"/>\n",
        html_escape(value)
    )
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(html: &'a str, name: &str) -> &'a str {
        let marker = format!(r#"name="{name}" value=""#);
        let start = html.find(&marker).unwrap() + marker.len();
        let len = html[start..].find('"').unwrap();
        &html[start..start + len]
    }

    #[test]
    fn posted_response_decodes() {
        let xml = r#"<samlp:Response ID="_r"/>"#;
        let html = HttpPostBinding::encode_response(xml, "https://sp.example.com/acs", Some("rs"));

        assert!(html.contains(r#"action="https://sp.example.com/acs""#));
        assert_eq!(field(&html, "RelayState"), "rs");

        let decoded =
            HttpPostBinding::decode(None, Some(field(&html, "SAMLResponse")), Some("rs")).unwrap();
        assert_eq!(decoded.xml, xml);
        assert_eq!(decoded.message_type, SamlMessageType::Response);
        assert_eq!(decoded.relay_state.as_deref(), Some("rs"));
    }

    #[test]
    fn relay_state_is_optional() {
        let html = HttpPostBinding::encode_response("<x/>", "https://sp.example.com/acs", None);
        assert!(!html.contains("RelayState"));
    }

    #[test]
    fn request_field_is_decoded_as_request() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("<samlp:AuthnRequest/>");
        let decoded = HttpPostBinding::decode(Some(&encoded), None, None).unwrap();
        assert_eq!(decoded.message_type, SamlMessageType::Request);
        assert!(HttpPostBinding::decode(None, None, None).is_err());
    }

    #[test]
    fn relay_state_and_destination_are_escaped() {
        let html = HttpPostBinding::encode_response(
            "<x/>",
            r#"https://sp.example.com/acs?a=1&b="2""#,
            Some(r#""><script>alert(1)</script>"#),
        );
        assert!(html.contains(r#"action="https://sp.example.com/acs?a=1&amp;b=&quot;2&quot;""#));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            HttpPostBinding::decode(Some("not base64!"), None, None),
            Err(crate::SamlError::Base64Decode(_))
        ));
    }
}
