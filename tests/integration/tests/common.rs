//! Common test utilities and fixtures.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use tower::ServiceExt;

use proxy_discovery::{MetadataProvider, StaticMetadataProvider};
use proxy_saml::bindings::HttpRedirectBinding;
use proxy_saml::{
    Assertion, Attribute, AttributeStatement, AuthnContextClass, AuthnRequest, AuthnStatement,
    Conditions, IdpMetadataBuilder, NameId, Response, Subject, SubjectConfirmation,
    SubjectConfirmationData, XmlSigner,
};
use proxy_server::{app, AppState, ProxyConfig};
use proxy_session::SESSION_TTL;

pub const SP_ENTITY_ID: &str = "https://sp.example.com/shibboleth";
pub const SP_ACS_URL: &str = "https://sp.example.com/Shibboleth.sso/SAML2/POST";

pub const UNIVERSITY_ENTITY_ID: &str = "https://idp.example.edu/idp";
pub const UNIVERSITY_SSO_URL: &str = "https://idp.example.edu/idp/profile/SAML2/Redirect/SSO";

pub const PROXY_CERT_PEM: &str = include_str!("../../fixtures/proxy-cert.pem");
pub const UNIVERSITY_KEY_PEM: &str = include_str!("../../fixtures/university-key.pem");
pub const UNIVERSITY_CERT_PEM: &str = include_str!("../../fixtures/university-cert.pem");

/// A response as seen by the browser.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Reads the value of a hidden form input from an auto-submit page.
    pub fn form_value(&self, name: &str) -> Option<String> {
        let marker = format!(r#"name="{name}" value=""#);
        let start = self.body.find(&marker)? + marker.len();
        let end = self.body[start..].find('"')? + start;
        Some(self.body[start..end].replace("&amp;", "&").replace("&quot;", "\""))
    }

    /// Reads the form's action URL.
    pub fn form_action(&self) -> Option<String> {
        let marker = r#"action=""#;
        let start = self.body.find(marker)? + marker.len();
        let end = self.body[start..].find('"')? + start;
        Some(self.body[start..end].to_string())
    }

    /// Base64-decodes a posted SAML message.
    pub fn posted_xml(&self, name: &str) -> anyhow::Result<String> {
        let encoded = self
            .form_value(name)
            .ok_or_else(|| anyhow::anyhow!("no {name} in form"))?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Test environment around an in-process router.
pub struct TestEnv {
    pub state: AppState,
    pub app: Router,
}

impl TestEnv {
    /// Creates an environment whose only known university is the fixture.
    pub fn new() -> anyhow::Result<Self> {
        let provider = StaticMetadataProvider::new().with_metadata_xml(&university_metadata()?)?;
        Self::with_provider(Arc::new(provider))
    }

    /// Creates an environment with a custom metadata source.
    pub fn with_provider(provider: Arc<dyn MetadataProvider>) -> anyhow::Result<Self> {
        init_tracing();
        let state = AppState::with_provider(ProxyConfig::for_testing(), provider)?;
        Ok(Self::from_state(state))
    }

    /// Wraps an already built state.
    pub fn from_state(state: AppState) -> Self {
        Self {
            app: app(state.clone()),
            state,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        self.state.config()
    }

    /// Sends a request through the router.
    pub async fn send(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let location = header_value(&response, header::LOCATION);
        let content_type = header_value(&response, header::CONTENT_TYPE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            location,
            content_type,
            body: String::from_utf8(bytes.to_vec())?,
        })
    }

    pub async fn get(&self, uri: &str) -> anyhow::Result<TestResponse> {
        self.send(Request::get(uri).body(Body::empty())?).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> anyhow::Result<TestResponse> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))?,
        )
        .await
    }

    /// Sends an SP AuthnRequest over the Redirect binding and returns the
    /// proxy session ID from the discovery redirect.
    pub async fn start_session(&self, request_id: &str, relay_state: Option<&str>) -> anyhow::Result<String> {
        let uri = HttpRedirectBinding::encode_request(
            &sp_authn_request(request_id),
            "/saml/sso",
            relay_state,
        )?;
        let response = self.get(&uri).await?;
        anyhow::ensure!(
            response.status == StatusCode::SEE_OTHER,
            "SSO returned {}: {}",
            response.status,
            response.body
        );
        session_from_location(response.location.as_deref(), "/discovery?session=")
    }

    /// Starts a session and selects the fixture university.
    pub async fn select_university(&self, request_id: &str, relay_state: Option<&str>) -> anyhow::Result<String> {
        let session_id = self.start_session(request_id, relay_state).await?;
        let response = self
            .post_form(
                "/discovery",
                &[("session_id", session_id.as_str()), ("entity_id", UNIVERSITY_ENTITY_ID)],
            )
            .await?;
        anyhow::ensure!(response.status == StatusCode::SEE_OTHER, "selection failed");
        Ok(session_id)
    }

    /// Ages a session past [`SESSION_TTL`].
    pub fn expire_session(&self, session_id: &str) -> anyhow::Result<()> {
        let mut session = self
            .state
            .sessions
            .get(session_id)
            .ok_or_else(|| anyhow::anyhow!("no live session {session_id}"))?;
        let ttl = chrono::Duration::from_std(SESSION_TTL)?;
        session.created_at = chrono::Utc::now() - ttl - chrono::Duration::minutes(1);
        self.state.sessions.insert(session_id, session);
        Ok(())
    }

    /// Runs `/sp/initiate` and returns the AuthnRequest sent to the university.
    pub async fn initiate(&self, session_id: &str) -> anyhow::Result<AuthnRequest> {
        let response = self
            .get(&format!("/sp/initiate?session={session_id}"))
            .await?;
        anyhow::ensure!(
            response.status == StatusCode::SEE_OTHER,
            "initiate returned {}: {}",
            response.status,
            response.body
        );
        let location = response
            .location
            .ok_or_else(|| anyhow::anyhow!("initiate did not redirect"))?;
        let decoded = HttpRedirectBinding::decode_url(&location)?;
        Ok(AuthnRequest::parse(&decoded.xml)?)
    }
}

/// An SP's AuthnRequest to the proxy.
pub fn sp_authn_request(request_id: &str) -> String {
    AuthnRequest::with_id(request_id, SP_ENTITY_ID)
        .with_acs_url(SP_ACS_URL)
        .to_xml()
}

/// The fixture university's metadata.
pub fn university_metadata() -> anyhow::Result<String> {
    let cert_der = proxy_crypto::certificate_der_from_pem(UNIVERSITY_CERT_PEM)?;
    Ok(IdpMetadataBuilder::new(UNIVERSITY_ENTITY_ID, UNIVERSITY_SSO_URL, cert_der).build())
}

pub fn university_signer() -> anyhow::Result<XmlSigner> {
    Ok(XmlSigner::from_pem(UNIVERSITY_KEY_PEM, Some(UNIVERSITY_CERT_PEM))?)
}

/// A Response the university would post back to the proxy, base64-encoded.
pub fn university_response(
    config: &ProxyConfig,
    in_response_to: &str,
    signer: &XmlSigner,
) -> anyhow::Result<String> {
    let attributes = AttributeStatement::new()
        .with_attribute(
            Attribute::single("urn:oid:1.3.6.1.4.1.5923.1.1.1.6", "jdoe@example.edu")
                .with_format(Attribute::NAME_FORMAT_URI),
        )
        .with_attribute(
            Attribute::multi(
                "urn:oid:1.3.6.1.4.1.5923.1.1.1.1",
                vec!["member".to_string(), "staff".to_string()],
            )
            .with_format(Attribute::NAME_FORMAT_URI),
        )
        .with_attribute(Attribute::single("urn:oid:1.2.840.113549.1.9.1", "private"))
        .with_attribute(
            Attribute::single("urn:oid:0.9.2342.19200300.100.1.3", "jane.doe@example.edu")
                .with_format(Attribute::NAME_FORMAT_URI),
        );

    let assertion = Assertion::new(UNIVERSITY_ENTITY_ID)
        .with_subject(
            Subject::new(NameId::transient("_u8f3c2a")).with_confirmation(
                SubjectConfirmation::bearer().with_data(SubjectConfirmationData::for_request(
                    in_response_to,
                    config.acs_url(),
                )),
            ),
        )
        .with_conditions(Conditions::with_validity(5).with_audience(&config.entity_id))
        .with_authn_statement(AuthnStatement::new(AuthnContextClass::PasswordProtectedTransport))
        .with_attribute_statement(attributes);

    let xml = Response::success(UNIVERSITY_ENTITY_ID)
        .in_response_to(in_response_to)
        .with_destination(config.acs_url())
        .with_assertion(assertion)
        .to_signed_xml(signer)?;

    Ok(base64::engine::general_purpose::STANDARD.encode(xml))
}

fn session_from_location(location: Option<&str>, prefix: &str) -> anyhow::Result<String> {
    let location = location.ok_or_else(|| anyhow::anyhow!("no Location header"))?;
    location
        .strip_prefix(prefix)
        .map(String::from)
        .ok_or_else(|| anyhow::anyhow!("unexpected redirect: {location}"))
}

fn header_value(response: &axum::response::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("proxy_server=debug,proxy_saml=debug")
        .with_test_writer()
        .try_init();
}
