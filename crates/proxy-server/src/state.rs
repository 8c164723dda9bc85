//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use anyhow::Context;
use proxy_discovery::{FederationIndex, MdqCache, MdqClient, MetadataProvider};
use proxy_saml::XmlSigner;
use proxy_session::SessionStore;

use crate::config::ProxyConfig;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Proxy configuration.
    pub config: Arc<ProxyConfig>,

    /// In-flight authentication sessions.
    pub sessions: SessionStore,

    /// Searchable list of federation IdPs.
    pub federation_index: FederationIndex,

    /// Source of per-university metadata.
    pub metadata: Arc<dyn MetadataProvider>,

    /// Signs everything the proxy sends, in both roles.
    pub signer: Arc<XmlSigner>,

    /// The signing certificate (DER), published in both metadata documents.
    pub idp_cert_der: Arc<Vec<u8>>,
}

impl AppState {
    /// Builds the state from configuration, with an MDQ client as the
    /// metadata source.
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let mut mdq = MdqClient::builder(&config.mdq_base_url).cache(MdqCache::default());
        if let Some(path) = &config.mdq_signing_cert_path {
            let pem = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read MDQ signing certificate {path}"))?;
            let der = proxy_crypto::certificate_der_from_pem(&pem)
                .context("failed to parse MDQ signing certificate")?;
            mdq = mdq.signing_cert(der);
        }
        let mdq = mdq.build().context("failed to build MDQ client")?;

        Self::with_provider(config, Arc::new(mdq))
    }

    /// Builds the state with a caller-supplied metadata source.
    pub fn with_provider(
        config: ProxyConfig,
        metadata: Arc<dyn MetadataProvider>,
    ) -> anyhow::Result<Self> {
        let cert_pem = std::fs::read_to_string(&config.idp_cert_path)
            .with_context(|| format!("failed to read IdP certificate {}", config.idp_cert_path))?;
        let key_pem = std::fs::read_to_string(&config.idp_key_path)
            .with_context(|| format!("failed to read IdP private key {}", config.idp_key_path))?;

        let idp_cert_der = proxy_crypto::certificate_der_from_pem(&cert_pem)
            .context("failed to parse IdP certificate")?;
        let signer = XmlSigner::from_pem(&key_pem, Some(&cert_pem))
            .context("failed to load IdP signing key")?;

        let federation_index = FederationIndex::new(&config.federation_aggregate_url)
            .context("failed to build federation index client")?;

        Ok(Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            federation_index,
            metadata,
            signer: Arc::new(signer),
            idp_cert_der: Arc::new(idp_cert_der),
        })
    }

    /// Returns the proxy configuration.
    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
