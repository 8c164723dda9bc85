//! Single logout.
//!
//! The proxy keeps no user sessions, so every LogoutRequest is answered
//! with success.

use axum::{
    extract::{Query, State},
    response::Html,
    Form,
};

use proxy_saml::bindings::{DecodedMessage, HttpPostBinding};
use proxy_saml::{LogoutRequest, LogoutResponse};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::{PostRequestForm, RedirectRequestQuery};

/// GET /saml/slo, GET /sp/slo
pub async fn slo_redirect(
    State(state): State<AppState>,
    Query(query): Query<RedirectRequestQuery>,
) -> AppResult<Html<String>> {
    acknowledge_logout(&state, query.decode()?)
}

/// POST /saml/slo, POST /sp/slo
pub async fn slo_post(
    State(state): State<AppState>,
    Form(form): Form<PostRequestForm>,
) -> AppResult<Html<String>> {
    acknowledge_logout(&state, form.decode()?)
}

/// Answers a LogoutRequest with a signed success LogoutResponse, posted back
/// to the requester.
fn acknowledge_logout(state: &AppState, decoded: DecodedMessage) -> AppResult<Html<String>> {
    let request = LogoutRequest::parse(&decoded.xml)
        .map_err(|e| AppError::InvalidSamlRequest(format!("failed to parse LogoutRequest: {e}")))?;

    tracing::info!(
        request_id = %request.id,
        issuer = %request.issuer,
        name_id = request.name_id.as_ref().map(|n| n.value.as_str()),
        "received logout request"
    );

    let destination = request.reply_destination().to_string();
    if destination.is_empty() {
        return Err(AppError::InvalidSamlRequest(
            "LogoutRequest has neither Destination nor Issuer".to_string(),
        ));
    }

    let response = LogoutResponse::success(&state.config.entity_id)
        .in_response_to(&request.id)
        .with_destination(&destination);
    let response_xml = state
        .signer
        .sign(&response.to_xml(), &response.id)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Html(HttpPostBinding::encode_response(
        &response_xml,
        &destination,
        decoded.relay_state.as_deref(),
    )))
}
