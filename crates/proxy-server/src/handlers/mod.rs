//! HTTP request handlers.

pub mod discovery;
pub mod health;
pub mod idp;
pub mod slo;
pub mod sp;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use proxy_saml::bindings::{DecodedMessage, HttpPostBinding, HttpRedirectBinding};

use crate::error::{AppError, AppResult};

/// Media type for SAML metadata documents.
pub(crate) const SAML_METADATA_CONTENT_TYPE: &str = proxy_discovery::SAML_METADATA_CONTENT_TYPE;

/// Wraps a metadata document in a response.
pub(crate) fn metadata_response(xml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, SAML_METADATA_CONTENT_TYPE)],
        xml,
    )
        .into_response()
}

/// A request message arriving over HTTP-Redirect. Signature parameters are
/// accepted but not checked on the SP leg.
#[derive(Debug, Deserialize)]
pub struct RedirectRequestQuery {
    /// Deflated, base64 request.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    /// Opaque SP state, handed back with the answer.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
    /// Query-string signature.
    #[serde(rename = "Signature")]
    pub signature: Option<String>,
    /// Algorithm URI of `signature`.
    #[serde(rename = "SigAlg")]
    pub sig_alg: Option<String>,
}

impl RedirectRequestQuery {
    pub(crate) fn decode(&self) -> AppResult<DecodedMessage> {
        HttpRedirectBinding::decode(
            Some(required_request(self.saml_request.as_deref())?),
            None,
            self.relay_state.as_deref(),
            self.signature.as_deref(),
            self.sig_alg.as_deref(),
        )
        .map_err(|e| AppError::InvalidSamlRequest(e.to_string()))
    }
}

/// A request message arriving over HTTP-POST.
#[derive(Debug, Deserialize)]
pub struct PostRequestForm {
    /// Base64 request.
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    /// Opaque SP state, handed back with the answer.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

impl PostRequestForm {
    pub(crate) fn decode(&self) -> AppResult<DecodedMessage> {
        let saml_request = required_request(self.saml_request.as_deref())?;
        HttpPostBinding::decode(Some(saml_request), None, self.relay_state.as_deref())
            .map_err(|e| AppError::InvalidSamlRequest(e.to_string()))
    }
}

fn required_request(value: Option<&str>) -> AppResult<&str> {
    value.ok_or_else(|| AppError::InvalidSamlRequest("missing SAMLRequest".to_string()))
}
