//! Proxy configuration.
//!
//! Configuration is loaded from environment variables (and `.env`).

use anyhow::Context;

/// Default MDQ server.
pub const DEFAULT_MDQ_BASE_URL: &str = "https://mdq.incommon.org";

/// Proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to.
    pub port: u16,

    /// Public base URL, without a trailing slash.
    pub base_url: String,

    /// The proxy's SAML entity ID, used in both roles.
    pub entity_id: String,

    /// PEM certificate the proxy signs with.
    pub idp_cert_path: String,

    /// PEM private key the proxy signs with.
    pub idp_key_path: String,

    /// MDQ server base URL.
    pub mdq_base_url: String,

    /// PEM certificate that signs MDQ responses. Unset disables verification.
    pub mdq_signing_cert_path: Option<String>,

    /// Metadata aggregate the discovery index is built from.
    pub federation_aggregate_url: String,

    /// Directory served under `/static`.
    pub static_dir: String,

    /// CORS allowed origins (comma-separated in the environment).
    pub cors_origins: Vec<String>,
}

impl ProxyConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let base_url = required("BASE_URL")?.trim_end_matches('/').to_string();
        let entity_id = required("ENTITY_ID")?;
        let idp_cert_path = required("IDP_CERT_PATH")?;
        let idp_key_path = required("IDP_KEY_PATH")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?,
            Err(_) => 8443,
        };

        let mdq_base_url = std::env::var("MDQ_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_MDQ_BASE_URL.to_string());
        let mdq_signing_cert_path = std::env::var("MDQ_SIGNING_CERT_PATH")
            .ok()
            .filter(|path| !path.is_empty());
        let federation_aggregate_url = std::env::var("FEDERATION_AGGREGATE_URL")
            .unwrap_or_else(|_| format!("{mdq_base_url}/entities"));

        let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string());

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            host,
            port,
            base_url,
            entity_id,
            idp_cert_path,
            idp_key_path,
            mdq_base_url,
            mdq_signing_cert_path,
            federation_aggregate_url,
            static_dir,
            cors_origins,
        })
    }

    /// Creates a configuration for testing, signing with the checked-in
    /// fixture key.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "https://proxy.example.org".to_string(),
            entity_id: "https://proxy.example.org/saml".to_string(),
            idp_cert_path: concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../../tests/fixtures/proxy-cert.pem"
            )
            .to_string(),
            idp_key_path: concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../../tests/fixtures/proxy-key.pem"
            )
            .to_string(),
            mdq_base_url: "http://127.0.0.1:1".to_string(),
            mdq_signing_cert_path: None,
            federation_aggregate_url: "http://127.0.0.1:1/entities".to_string(),
            static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }

    /// Address to bind, as `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where SPs send AuthnRequests.
    #[must_use]
    pub fn sso_url(&self) -> String {
        format!("{}/saml/sso", self.base_url)
    }

    /// The IdP-side logout endpoint.
    #[must_use]
    pub fn idp_slo_url(&self) -> String {
        format!("{}/saml/slo", self.base_url)
    }

    /// Where universities post their Responses.
    #[must_use]
    pub fn acs_url(&self) -> String {
        format!("{}/sp/acs", self.base_url)
    }

    /// The SP-side logout endpoint.
    #[must_use]
    pub fn sp_slo_url(&self) -> String {
        format!("{}/sp/slo", self.base_url)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8443,
            base_url: "https://localhost:8443".to_string(),
            entity_id: "https://localhost:8443/saml".to_string(),
            idp_cert_path: "certs/idp-cert.pem".to_string(),
            idp_key_path: "certs/idp-key.pem".to_string(),
            mdq_base_url: DEFAULT_MDQ_BASE_URL.to_string(),
            mdq_signing_cert_path: None,
            federation_aggregate_url: format!("{DEFAULT_MDQ_BASE_URL}/entities"),
            static_dir: "static".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{name} environment variable is required"))
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
