//! HTTP-Redirect binding.
//!
//! Messages are DEFLATE-compressed, base64-encoded and carried in the query
//! string. Signatures cover the query parameters rather than the XML.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSigner;

use super::{decode_base64, into_utf8, select_message, DecodedMessage, SamlMessageType};

/// Upper bound on an inflated Redirect-binding message.
const MAX_INFLATED_BYTES: u64 = 256 * 1024;

/// Parameters that take part in a redirect signature, in signing order.
const SIGNED_PARAMS: [&str; 4] = ["SAMLRequest", "SAMLResponse", "RelayState", "SigAlg"];

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Builds the redirect URL carrying an unsigned request.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let query = message_query(xml, relay_state, SamlMessageType::Request)?;
        Ok(append_query(destination, &query))
    }

    /// Builds the redirect URL carrying a request, with `SigAlg` and
    /// `Signature` over the query exactly as it appears in the URL.
    pub fn encode_signed_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        signer: &XmlSigner,
    ) -> SamlResult<String> {
        let mut query = message_query(xml, relay_state, SamlMessageType::Request)?;
        query.push_str("&SigAlg=");
        query.push_str(&urlencoding::encode(signer.config().algorithm.uri()));

        let signature = signer.sign_query(&query)?;
        query.push_str("&Signature=");
        query.push_str(&urlencoding::encode(&signature));

        Ok(append_query(destination, &query))
    }

    /// Decodes a message from already URL-decoded query parameters.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = select_message(saml_request, saml_response)?;
        let compressed = decode_base64(encoded)?;

        Ok(DecodedMessage {
            xml: into_utf8(inflate(&compressed)?)?,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: signature.map(String::from),
            sig_alg: sig_alg.map(String::from),
        })
    }

    /// Decodes the message carried by a full redirect URL.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = parse_url(url)?;
        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        Self::decode(
            param("SAMLRequest").as_deref(),
            param("SAMLResponse").as_deref(),
            param("RelayState").as_deref(),
            param("Signature").as_deref(),
            param("SigAlg").as_deref(),
        )
    }

    /// Rebuilds the octet string a redirect signature was computed over.
    ///
    /// Parameters are taken in their original URL-encoded form, since
    /// re-encoding may not reproduce what the sender signed.
    pub fn extract_signed_query(url: &str) -> SamlResult<String> {
        let parsed = parse_url(url)?;
        let raw: Vec<(&str, &str)> = parsed
            .query()
            .unwrap_or_default()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();

        let parts: Vec<String> = SIGNED_PARAMS
            .iter()
            .filter_map(|name| {
                raw.iter()
                    .find(|(key, _)| key == name)
                    .map(|(key, value)| format!("{key}={value}"))
            })
            .collect();

        if parts.is_empty() {
            return Err(SamlError::InvalidRequest(
                "No SAML parameters found".to_string(),
            ));
        }
        Ok(parts.join("&"))
    }
}

/// `SAMLRequest=...[&RelayState=...]`
fn message_query(
    xml: &str,
    relay_state: Option<&str>,
    message_type: SamlMessageType,
) -> SamlResult<String> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(deflate(xml.as_bytes())?);
    let mut query = format!(
        "{}={}",
        message_type.param_name(),
        urlencoding::encode(&encoded)
    );
    if let Some(relay_state) = relay_state {
        query.push_str("&RelayState=");
        query.push_str(&urlencoding::encode(relay_state));
    }
    Ok(query)
}

fn append_query(destination: &str, query: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!("{destination}{separator}{query}")
}

fn parse_url(url: &str) -> SamlResult<url::Url> {
    url::Url::parse(url).map_err(|e| SamlError::InvalidRequest(format!("Invalid URL: {e}")))
}

/// Raw DEFLATE, no zlib header.
fn deflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(e.to_string()))
}

fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut inflated = Vec::new();
    DeflateDecoder::new(data)
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| SamlError::Deflate(e.to_string()))?;
    if inflated.len() as u64 > MAX_INFLATED_BYTES {
        return Err(SamlError::Deflate(format!(
            "message inflates beyond {MAX_INFLATED_BYTES} bytes"
        )));
    }
    Ok(inflated)
}
