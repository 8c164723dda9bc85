//! Message transport.
//!
//! The proxy receives on both HTTP-Redirect and HTTP-POST, sends requests to
//! universities over HTTP-Redirect and delivers responses over HTTP-POST.
//!
//! ```rust,ignore
//! use proxy_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let url = HttpRedirectBinding::encode_signed_request(&request_xml, sso_url, Some(&session_id), &signer)?;
//! let html = HttpPostBinding::encode_response(&response_xml, acs_url, relay_state);
//! ```

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use base64::Engine;

use crate::error::{SamlError, SamlResult};

/// Which of the two SAML message parameters a binding carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// A request message (AuthnRequest or LogoutRequest).
    Request,
    /// A response message (Response or LogoutResponse).
    Response,
}

impl SamlMessageType {
    /// `SAMLRequest` or `SAMLResponse`.
    #[must_use]
    pub const fn param_name(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// A message taken off the wire, with whatever travelled alongside it.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The XML document.
    pub xml: String,
    /// Whether it arrived as `SAMLRequest` or `SAMLResponse`.
    pub message_type: SamlMessageType,
    /// `RelayState`, echoed back untouched.
    pub relay_state: Option<String>,
    /// Redirect binding only: base64 `Signature` parameter.
    pub signature: Option<String>,
    /// Redirect binding only: `SigAlg` parameter.
    pub sig_alg: Option<String>,
}

/// Picks whichever of `SAMLRequest` and `SAMLResponse` is present.
fn select_message<'a>(
    saml_request: Option<&'a str>,
    saml_response: Option<&'a str>,
) -> SamlResult<(&'a str, SamlMessageType)> {
    if let Some(req) = saml_request {
        Ok((req, SamlMessageType::Request))
    } else if let Some(resp) = saml_response {
        Ok((resp, SamlMessageType::Response))
    } else {
        Err(SamlError::InvalidRequest(
            "No SAMLRequest or SAMLResponse parameter".to_string(),
        ))
    }
}

/// Base64-decodes a transported message, tolerating line wrapping.
///
/// A `+` turned into a space by form decoding is restored.
fn decode_base64(encoded: &str) -> SamlResult<Vec<u8>> {
    let cleaned: String = encoded
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('+'),
            c if c.is_ascii_whitespace() => None,
            c => Some(c),
        })
        .collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(cleaned)?)
}

fn into_utf8(bytes: Vec<u8>) -> SamlResult<String> {
    String::from_utf8(bytes)
        .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))
}
