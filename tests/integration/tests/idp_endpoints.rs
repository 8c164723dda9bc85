//! Proxy-as-IdP endpoints: SSO, metadata and logout.

use axum::http::StatusCode;
use base64::Engine;

use proxy_saml::bindings::HttpRedirectBinding;
use proxy_saml::{EntityDescriptor, LogoutRequest, LogoutResponse, NameId, SamlBinding};

use crate::common::{sp_authn_request, TestEnv, SP_ACS_URL, SP_ENTITY_ID};

#[tokio::test]
async fn sso_redirect_creates_session() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let session_id = env.start_session("_sp_req_1", Some("sp-relay")).await?;

    let session = env
        .state
        .sessions
        .get(&session_id)
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(session.original_request_id, "_sp_req_1");
    assert_eq!(session.sp_acs_url, SP_ACS_URL);
    assert_eq!(session.sp_entity_id, SP_ENTITY_ID);
    assert_eq!(session.relay_state.as_deref(), Some("sp-relay"));
    assert!(session.selected_university.is_none());
    Ok(())
}

#[tokio::test]
async fn sso_post_creates_session() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(sp_authn_request("_sp_req_post"));

    let response = env
        .post_form("/saml/sso", &[("SAMLRequest", encoded.as_str())])
        .await?;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location.unwrap_or_default();
    assert!(location.starts_with("/discovery?session="));
    assert_eq!(env.state.sessions.len(), 1);
    Ok(())
}

#[tokio::test]
async fn sso_without_acs_url_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let xml = proxy_saml::AuthnRequest::with_id("_no_acs", SP_ENTITY_ID).to_xml();
    let uri = HttpRedirectBinding::encode_request(&xml, "/saml/sso", None)?;

    let response = env.get(&uri).await?;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("AssertionConsumerServiceURL"));
    assert!(env.state.sessions.is_empty());
    Ok(())
}

#[tokio::test]
async fn sso_with_garbage_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/saml/sso?SAMLRequest=not-base64!!").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = env.get("/saml/sso").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = env.post_form("/saml/sso", &[("RelayState", "x")]).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn idp_metadata_describes_proxy() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/saml/metadata").await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/samlmetadata+xml")
    );
    let descriptor = EntityDescriptor::parse(&response.body)?;
    assert_eq!(descriptor.entity_id, env.config().entity_id);
    assert_eq!(
        descriptor.sso_location(SamlBinding::HttpRedirect),
        Some(env.config().sso_url().as_str())
    );
    assert_eq!(
        descriptor.sso_location(SamlBinding::HttpPost),
        Some(env.config().sso_url().as_str())
    );
    assert_eq!(
        descriptor.signing_certificates_der()?,
        vec![env.state.idp_cert_der.to_vec()]
    );
    Ok(())
}

#[tokio::test]
async fn slo_post_is_acknowledged() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = LogoutRequest::new(SP_ENTITY_ID, NameId::transient("_t1"))
        .with_destination("https://sp.example.com/Shibboleth.sso/SLO/POST");
    let encoded = base64::engine::general_purpose::STANDARD.encode(request.to_xml());

    let response = env
        .post_form(
            "/saml/slo",
            &[("SAMLRequest", encoded.as_str()), ("RelayState", "slo-relay")],
        )
        .await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.form_action().as_deref(),
        Some("https://sp.example.com/Shibboleth.sso/SLO/POST")
    );
    assert_eq!(response.form_value("RelayState").as_deref(), Some("slo-relay"));

    let logout = LogoutResponse::parse(&response.posted_xml("SAMLResponse")?)?;
    assert!(logout.is_success());
    assert_eq!(logout.in_response_to.as_deref(), Some(request.id.as_str()));
    assert_eq!(logout.issuer, env.config().entity_id);
    Ok(())
}

#[tokio::test]
async fn slo_redirect_replies_to_issuer_without_destination() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = LogoutRequest::new("https://idp.example.edu/idp", NameId::transient("_t2"));
    let uri = HttpRedirectBinding::encode_request(&request.to_xml(), "/sp/slo", None)?;

    let response = env.get(&uri).await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.form_action().as_deref(),
        Some("https://idp.example.edu/idp")
    );
    let logout = LogoutResponse::parse(&response.posted_xml("SAMLResponse")?)?;
    assert_eq!(logout.in_response_to.as_deref(), Some(request.id.as_str()));
    Ok(())
}

#[tokio::test]
async fn slo_with_garbage_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let encoded = base64::engine::general_purpose::STANDARD.encode("<notalogoutrequest/>");

    let response = env
        .post_form("/sp/slo", &[("SAMLRequest", encoded.as_str())])
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn slo_without_destination_or_issuer_is_400() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let request = LogoutRequest::new("", NameId::transient("_t3"));
    let encoded = base64::engine::general_purpose::STANDARD.encode(request.to_xml());

    let response = env
        .post_form("/saml/slo", &[("SAMLRequest", encoded.as_str())])
        .await?;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("neither Destination nor Issuer"));
    Ok(())
}
