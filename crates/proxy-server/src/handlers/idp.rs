//! The proxy's IdP role: what Service Providers talk to.

use axum::{
    extract::{Query, State},
    response::{Redirect, Response},
    Form,
};

use proxy_saml::bindings::DecodedMessage;
use proxy_saml::{AuthnRequest, IdpMetadataBuilder};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::{metadata_response, PostRequestForm, RedirectRequestQuery};

/// GET /saml/sso
pub async fn sso_redirect(
    State(state): State<AppState>,
    Query(query): Query<RedirectRequestQuery>,
) -> AppResult<Redirect> {
    let session_id = start_session(&state, query.decode()?)?;
    Ok(Redirect::to(&discovery_location(&session_id)))
}

/// POST /saml/sso
pub async fn sso_post(
    State(state): State<AppState>,
    Form(form): Form<PostRequestForm>,
) -> AppResult<Redirect> {
    let session_id = start_session(&state, form.decode()?)?;
    Ok(Redirect::to(&discovery_location(&session_id)))
}

/// GET /saml/metadata
pub async fn metadata(State(state): State<AppState>) -> Response {
    let config = state.config();
    let xml = IdpMetadataBuilder::new(
        &config.entity_id,
        config.sso_url(),
        state.idp_cert_der.to_vec(),
    )
    .slo_url(config.idp_slo_url())
    .build();
    metadata_response(xml)
}

/// Opens a discovery session for the SP's AuthnRequest. The SP's
/// RelayState rides along in the session until the final POST.
fn start_session(state: &AppState, message: DecodedMessage) -> AppResult<String> {
    let request = AuthnRequest::parse(&message.xml)
        .map_err(|e| AppError::InvalidSamlRequest(format!("failed to parse AuthnRequest: {e}")))?;

    let sp_acs_url = request.assertion_consumer_service_url.clone().ok_or_else(|| {
        AppError::InvalidSamlRequest("AuthnRequest missing AssertionConsumerServiceURL".into())
    })?;

    let session_id = state
        .sessions
        .create(request.id, sp_acs_url, request.issuer.clone(), message.relay_state);

    tracing::info!(
        session_id,
        sp_entity_id = %request.issuer,
        "created session for incoming AuthnRequest"
    );
    Ok(session_id)
}

fn discovery_location(session_id: &str) -> String {
    format!("/discovery?session={}", urlencoding::encode(session_id))
}
