//! The proxy against a live (mocked) MDQ service and federation aggregate.

use axum::http::StatusCode;
use httpmock::prelude::*;

use proxy_discovery::{EntityEntry, SAML_METADATA_CONTENT_TYPE};
use proxy_server::{AppState, ProxyConfig};

use crate::common::{
    university_metadata, university_response, university_signer, TestEnv, UNIVERSITY_SSO_URL,
};

const AGGREGATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntitiesDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata">
  <md:EntityDescriptor entityID="https://idp.tech.edu/idp"><md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"><md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.tech.edu/sso"/></md:IDPSSODescriptor><md:Organization><md:OrganizationDisplayName xml:lang="en">Tech University</md:OrganizationDisplayName></md:Organization></md:EntityDescriptor>
  <md:EntityDescriptor entityID="https://sp.tech.edu/shibboleth"><md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"><md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp.tech.edu/acs" index="0"/></md:SPSSODescriptor></md:EntityDescriptor>
  <md:EntityDescriptor entityID="https://idp.state.edu/idp"><md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"><md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.state.edu/sso"/></md:IDPSSODescriptor><md:Organization><md:OrganizationDisplayName xml:lang="en">State University</md:OrganizationDisplayName></md:Organization></md:EntityDescriptor>
</md:EntitiesDescriptor>"#;

fn config_for(server: &MockServer) -> ProxyConfig {
    ProxyConfig {
        mdq_base_url: server.base_url(),
        federation_aggregate_url: server.url("/aggregate.xml"),
        ..ProxyConfig::for_testing()
    }
}

#[tokio::test]
async fn login_through_mdq_metadata() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let metadata = university_metadata()?;
    let mdq = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_contains("/entities/")
                .path_contains("idp.example.edu");
            then.status(200)
                .header("content-type", SAML_METADATA_CONTENT_TYPE)
                .body(&metadata);
        })
        .await;

    let env = TestEnv::from_state(AppState::new(config_for(&server))?);
    let session_id = env.select_university("_sp_req_mdq", None).await?;

    let request = env.initiate(&session_id).await?;
    assert_eq!(request.destination.as_deref(), Some(UNIVERSITY_SSO_URL));

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

    // The ACS lookup is served from the cache.
    mdq.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn mdq_outage_is_502() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(500);
        })
        .await;

    let env = TestEnv::from_state(AppState::new(config_for(&server))?);
    let session_id = env.select_university("_sp_req", None).await?;

    let response = env
        .get(&format!("/sp/initiate?session={session_id}"))
        .await?;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn aggregate_refresh_feeds_search() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let aggregate = server
        .mock_async(|when, then| {
            when.method(GET).path("/aggregate.xml");
            then.status(200)
                .header("content-type", SAML_METADATA_CONTENT_TYPE)
                .body(AGGREGATE);
        })
        .await;

    let env = TestEnv::from_state(AppState::new(config_for(&server))?);
    assert_eq!(
        env.get("/health/ready").await?.status,
        StatusCode::SERVICE_UNAVAILABLE
    );

    let loaded = env.state.federation_index.refresh().await?;
    assert_eq!(loaded, 2);
    aggregate.assert_async().await;

    assert_eq!(env.get("/health/ready").await?.status, StatusCode::OK);

    let response = env.get("/api/entities/search?q=UNIVERSITY").await?;
    let results: Vec<EntityEntry> = serde_json::from_str(&response.body)?;
    let names: Vec<&str> = results.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, vec!["State University", "Tech University"]);

    let response = env.get("/api/entities/search?q=state").await?;
    let results: Vec<EntityEntry> = serde_json::from_str(&response.body)?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entity_id, "https://idp.state.edu/idp");
    Ok(())
}
