//! Metadata Query Protocol client.
//!
//! Fetches a single entity's metadata from `{base}/entities/{id}`, checks
//! the document signature when a signing certificate is configured, and
//! caches the result.

use std::time::Duration;

use async_trait::async_trait;
use proxy_saml::xml::XmlElement;
use proxy_saml::{EntityDescriptor, SamlError, XmlSignatureValidator};

use crate::cache::MdqCache;
use crate::error::{MdqError, MdqResult};
use crate::provider::MetadataProvider;

/// Media type for SAML metadata documents.
pub const SAML_METADATA_CONTENT_TYPE: &str = "application/samlmetadata+xml";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// MDQ client.
#[derive(Debug, Clone)]
pub struct MdqClient {
    http: reqwest::Client,
    base_url: String,
    validator: Option<XmlSignatureValidator>,
    cache: Option<MdqCache>,
}

impl MdqClient {
    /// Starts building a client for the given MDQ server.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> MdqClientBuilder {
        MdqClientBuilder {
            base_url: base_url.into(),
            cache: None,
            signing_cert: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The URL metadata for `entity_id` is fetched from.
    #[must_use]
    pub fn entity_url(&self, entity_id: &str) -> String {
        format!(
            "{}/entities/{}",
            self.base_url,
            urlencoding::encode(entity_id)
        )
    }

    /// Returns true if fetched metadata is signature-checked.
    #[must_use]
    pub const fn verifies_signatures(&self) -> bool {
        self.validator.is_some()
    }

    async fn download(&self, entity_id: &str) -> MdqResult<String> {
        let url = self.entity_url(entity_id);
        tracing::debug!(%url, "fetching entity metadata");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, SAML_METADATA_CONTENT_TYPE)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MdqError::NotFound(entity_id.to_string()));
        }
        if !status.is_success() {
            return Err(MdqError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.text().await?)
    }

    fn read_descriptor(&self, entity_id: &str, xml: &str) -> MdqResult<EntityDescriptor> {
        let root = XmlElement::parse(xml)?;
        if root.local_name() != "EntityDescriptor" {
            return Err(SamlError::InvalidMetadata(format!(
                "expected EntityDescriptor, found {}",
                root.local_name()
            ))
            .into());
        }

        if let Some(validator) = &self.validator {
            let verified = validator
                .verified_elements(&root)
                .map_err(|e| MdqError::SignatureInvalid(e.to_string()))?;
            if !verified.iter().any(|element| std::ptr::eq(*element, &root)) {
                return Err(MdqError::SignatureInvalid(
                    "signature does not cover the EntityDescriptor".to_string(),
                ));
            }
        }

        let descriptor = EntityDescriptor::from_element(&root)?;
        if descriptor.entity_id != entity_id {
            return Err(MdqError::EntityMismatch {
                requested: entity_id.to_string(),
                returned: descriptor.entity_id,
            });
        }
        Ok(descriptor)
    }
}

#[async_trait]
impl MetadataProvider for MdqClient {
    async fn fetch_entity(&self, entity_id: &str) -> MdqResult<EntityDescriptor> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(entity_id)) {
            tracing::debug!(entity_id, "metadata cache hit");
            return Ok(cached);
        }

        let xml = self.download(entity_id).await?;
        let descriptor = self.read_descriptor(entity_id, &xml)?;

        if let Some(cache) = &self.cache {
            cache.insert(entity_id, descriptor.clone());
        }
        Ok(descriptor)
    }
}

/// Builder for [`MdqClient`].
#[derive(Debug)]
pub struct MdqClientBuilder {
    base_url: String,
    cache: Option<MdqCache>,
    signing_cert: Option<Vec<u8>>,
    timeout: Duration,
}

impl MdqClientBuilder {
    /// Caches fetched metadata.
    #[must_use]
    pub fn cache(mut self, cache: MdqCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Requires metadata to be signed by this certificate (DER).
    #[must_use]
    pub fn signing_cert(mut self, certificate_der: Vec<u8>) -> Self {
        self.signing_cert = Some(certificate_der);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> MdqResult<MdqClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;
        if self.signing_cert.is_none() {
            tracing::warn!(
                base_url = %self.base_url,
                "no MDQ signing certificate configured, metadata will not be verified"
            );
        }
        Ok(MdqClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            validator: self
                .signing_cert
                .map(|cert| XmlSignatureValidator::new(vec![cert])),
            cache: self.cache,
        })
    }
}
