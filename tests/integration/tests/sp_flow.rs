//! The university leg: initiate, ACS and the response forwarded to the SP.

use axum::http::StatusCode;
use base64::Engine;

use proxy_saml::bindings::HttpRedirectBinding;
use proxy_saml::{AuthnRequest, ResponseValidator, XmlSignatureValidator, XmlSigner};

use crate::common::{
    university_response, university_signer, TestEnv, PROXY_CERT_PEM, SP_ACS_URL, SP_ENTITY_ID,
    UNIVERSITY_SSO_URL,
};

const PROXY_KEY_PEM: &str = include_str!("../../fixtures/proxy-key.pem");

#[tokio::test]
async fn sp_metadata_describes_acs() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/sp/metadata").await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.content_type.as_deref(),
        Some("application/samlmetadata+xml")
    );
    assert!(response.body.contains("SPSSODescriptor"));
    assert!(response.body.contains(r#"AuthnRequestsSigned="true""#));
    assert!(response.body.contains(&env.config().acs_url()));
    Ok(())
}

#[tokio::test]
async fn initiate_unknown_session_is_404() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/sp/initiate?session=missing").await?;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn initiate_without_selection_is_400() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.start_session("_sp_req", None).await?;

    let response = env
        .get(&format!("/sp/initiate?session={session_id}"))
        .await?;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn initiate_unknown_university_is_502() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.start_session("_sp_req", None).await?;
    env.post_form(
        "/discovery",
        &[
            ("session_id", session_id.as_str()),
            ("entity_id", "https://idp.unknown.edu/idp"),
        ],
    )
    .await?;

    let response = env
        .get(&format!("/sp/initiate?session={session_id}"))
        .await?;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn initiate_sends_signed_request_to_university() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;

    let response = env
        .get(&format!("/sp/initiate?session={session_id}"))
        .await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response
        .location
        .ok_or_else(|| anyhow::anyhow!("no Location"))?;
    assert!(location.starts_with(UNIVERSITY_SSO_URL));

    let decoded = HttpRedirectBinding::decode_url(&location)?;
    assert_eq!(decoded.relay_state.as_deref(), Some(session_id.as_str()));

    let signature = decoded
        .signature
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("request is not signed"))?;
    let sig_alg = decoded
        .sig_alg
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("no SigAlg"))?;
    let signed_query = HttpRedirectBinding::extract_signed_query(&location)?;
    XmlSignatureValidator::from_pem(&[PROXY_CERT_PEM])?
        .validate_redirect_binding(&signed_query, signature, sig_alg)?;

    let request = AuthnRequest::parse(&decoded.xml)?;
    assert_eq!(request.issuer, env.config().entity_id);
    assert_eq!(
        request.assertion_consumer_service_url,
        Some(env.config().acs_url())
    );
    assert_eq!(request.destination.as_deref(), Some(UNIVERSITY_SSO_URL));

    let session = env
        .state
        .sessions
        .get(&session_id)
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(session.proxy_request_id, Some(request.id));
    Ok(())
}

#[tokio::test]
async fn acs_forwards_signed_assertion_to_sp() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req_acs", Some("sp-state")).await?;
    let request = env.initiate(&session_id).await?;
    let saml_response = university_response(env.config(), &request.id, &university_signer()?)?;

    let response = env
        .post_form(
            "/sp/acs",
            &[
                ("SAMLResponse", saml_response.as_str()),
                ("RelayState", session_id.as_str()),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.form_action().as_deref(), Some(SP_ACS_URL));
    assert_eq!(response.form_value("RelayState").as_deref(), Some("sp-state"));

    let proxy_cert = proxy_crypto::certificate_der_from_pem(PROXY_CERT_PEM)?;
    let assertion = ResponseValidator::new(
        SP_ENTITY_ID,
        SP_ACS_URL,
        &env.config().entity_id,
        vec![proxy_cert],
    )
    .accept_request_id("_sp_req_acs")
    .validate(&response.posted_xml("SAMLResponse")?)?;

    assert_eq!(assertion.issuer, env.config().entity_id);
    let name_id = assertion
        .name_id()
        .ok_or_else(|| anyhow::anyhow!("no NameID"))?;
    assert_eq!(name_id.value, "_u8f3c2a");
    assert!(name_id.name_qualifier.is_none());

    let released: Vec<(&str, &[String])> = assertion
        .attributes()
        .map(|a| (a.name.as_str(), a.values.as_slice()))
        .collect();
    assert_eq!(
        released,
        vec![
            (
                "urn:oid:1.3.6.1.4.1.5923.1.1.1.6",
                &["jdoe@example.edu".to_string()][..]
            ),
            ("urn:oid:1.3.6.1.4.1.5923.1.1.1.1", &["member".to_string()][..]),
            (
                "urn:oid:0.9.2342.19200300.100.1.3",
                &["jane.doe@example.edu".to_string()][..]
            ),
        ]
    );
    assert_eq!(
        assertion
            .authn_statement
            .and_then(|s| s.authn_context_class_ref)
            .as_deref(),
        Some("urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport")
    );

    // The session is consumed.
    assert!(env.state.sessions.get(&session_id).is_none());
    Ok(())
}

#[tokio::test]
async fn acs_replay_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    let request = env.initiate(&session_id).await?;
    let saml_response = university_response(env.config(), &request.id, &university_signer()?)?;
    let form = [
        ("SAMLResponse", saml_response.as_str()),
        ("RelayState", session_id.as_str()),
    ];

    assert_eq!(env.post_form("/sp/acs", &form).await?.status, StatusCode::OK);
    assert_eq!(
        env.post_form("/sp/acs", &form).await?.status,
        StatusCode::NOT_FOUND
    );
    Ok(())
}

#[tokio::test]
async fn acs_without_relay_state_is_502() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    let request = env.initiate(&session_id).await?;
    let saml_response = university_response(env.config(), &request.id, &university_signer()?)?;

    let response = env
        .post_form("/sp/acs", &[("SAMLResponse", saml_response.as_str())])
        .await?;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn acs_rejects_response_signed_by_wrong_key() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    let request = env.initiate(&session_id).await?;
    let impostor = XmlSigner::from_pem(PROXY_KEY_PEM, Some(PROXY_CERT_PEM))?;
    let saml_response = university_response(env.config(), &request.id, &impostor)?;

    let response = env
        .post_form(
            "/sp/acs",
            &[
                ("SAMLResponse", saml_response.as_str()),
                ("RelayState", session_id.as_str()),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.form_action().is_none());
    Ok(())
}

#[tokio::test]
async fn acs_rejects_tampered_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    let request = env.initiate(&session_id).await?;
    let saml_response = university_response(env.config(), &request.id, &university_signer()?)?;

    let engine = base64::engine::general_purpose::STANDARD;
    let xml = String::from_utf8(engine.decode(saml_response)?)?;
    let tampered = engine.encode(xml.replace("jdoe@example.edu", "admin@example.edu"));

    let response = env
        .post_form(
            "/sp/acs",
            &[
                ("SAMLResponse", tampered.as_str()),
                ("RelayState", session_id.as_str()),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn acs_rejects_response_to_other_request() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    env.initiate(&session_id).await?;
    let saml_response =
        university_response(env.config(), "_some_other_request", &university_signer()?)?;

    let response = env
        .post_form(
            "/sp/acs",
            &[
                ("SAMLResponse", saml_response.as_str()),
                ("RelayState", session_id.as_str()),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn initiate_expired_session_is_404() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    env.expire_session(&session_id)?;

    let response = env
        .get(&format!("/sp/initiate?session={session_id}"))
        .await?;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn acs_expired_session_is_404() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.select_university("_sp_req", None).await?;
    let request = env.initiate(&session_id).await?;
    let saml_response = university_response(env.config(), &request.id, &university_signer()?)?;
    env.expire_session(&session_id)?;

    let response = env
        .post_form(
            "/sp/acs",
            &[
                ("SAMLResponse", saml_response.as_str()),
                ("RelayState", session_id.as_str()),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.contains("session not found"));
    Ok(())
}
