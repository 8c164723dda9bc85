//! The proxy's SP role: what university IdPs talk to.

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use proxy_saml::bindings::{HttpPostBinding, HttpRedirectBinding};
use proxy_saml::{
    Assertion, AuthnContextClass, AuthnRequest, AuthnStatement, Conditions, NameId,
    NameIdFormat, NameIdPolicy, Response as SamlResponse, ResponseValidator, SamlBinding,
    SpMetadataBuilder, Subject, SubjectConfirmation, SubjectConfirmationData,
};

use crate::attributes::{attribute_statement, extract_attributes};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

use super::metadata_response;

/// Maximum age of a university Response, in minutes.
const MAX_ISSUE_DELAY_MINUTES: i64 = 5;

/// Lifetime of the assertion sent to the SP, in minutes.
const ASSERTION_VALIDITY_MINUTES: i64 = 5;

/// Query parameters for starting the university leg.
#[derive(Debug, Deserialize)]
pub struct InitiateParams {
    /// Session ID.
    pub session: String,
}

/// Form data posted to the ACS.
#[derive(Debug, Deserialize)]
pub struct AcsForm {
    /// The SAML response (base64-encoded).
    #[serde(rename = "SAMLResponse")]
    pub saml_response: Option<String>,

    /// Relay state; carries the proxy session ID.
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// GET /sp/metadata
pub async fn metadata(State(state): State<AppState>) -> Response {
    let config = state.config();
    let xml = SpMetadataBuilder::new(
        &config.entity_id,
        config.acs_url(),
        state.idp_cert_der.to_vec(),
    )
    .slo_url(config.sp_slo_url())
    .build();
    metadata_response(xml)
}

/// GET /sp/initiate
///
/// Sends the user to the selected university with a signed AuthnRequest.
pub async fn initiate(
    State(state): State<AppState>,
    Query(params): Query<InitiateParams>,
) -> AppResult<Redirect> {
    let session = state
        .sessions
        .get(&params.session)
        .ok_or_else(|| AppError::session_not_found(&params.session))?;
    let university = session
        .selected_university
        .ok_or(AppError::MissingUniversitySelection)?;

    let descriptor = state
        .metadata
        .fetch_entity(&university)
        .await
        .map_err(|e| AppError::MdqFetchFailed(e.to_string()))?;

    let sso_url = descriptor
        .sso_location(SamlBinding::HttpRedirect)
        .ok_or_else(|| {
            AppError::MdqFetchFailed(
                "no HTTP-Redirect SSO endpoint in university metadata".to_string(),
            )
        })?
        .to_string();

    let config = state.config();
    let request = AuthnRequest::new(&config.entity_id)
        .with_acs_url(config.acs_url())
        .with_binding(SamlBinding::HttpPost)
        .with_destination(&sso_url)
        .with_name_id_policy(
            NameIdPolicy::with_format(NameIdFormat::Transient).allow_create(true),
        );

    if !state
        .sessions
        .update_proxy_request_id(&params.session, request.id.clone())
    {
        return Err(AppError::session_not_found(params.session));
    }

    // The session ID rides along as RelayState so the ACS can find it.
    let location = HttpRedirectBinding::encode_signed_request(
        &request.to_xml(),
        &sso_url,
        Some(&params.session),
        &state.signer,
    )
    .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(
        session_id = %params.session,
        university = %university,
        request_id = %request.id,
        "redirecting to university IdP"
    );
    Ok(Redirect::to(&location))
}

/// POST /sp/acs
///
/// Validates the university's Response and forwards a freshly signed one to
/// the original SP.
pub async fn assertion_consumer_service(
    State(state): State<AppState>,
    Form(form): Form<AcsForm>,
) -> AppResult<Response> {
    let session_id = form
        .relay_state
        .as_deref()
        .ok_or_else(|| AppError::InvalidSamlResponse("missing RelayState".to_string()))?;

    // Removed up front so a replayed Response finds nothing.
    let session = state
        .sessions
        .remove(session_id)
        .ok_or_else(|| AppError::session_not_found(session_id))?;

    let university = session
        .selected_university
        .as_deref()
        .ok_or(AppError::MissingUniversitySelection)?;
    let proxy_request_id = session.proxy_request_id.as_deref().ok_or_else(|| {
        AppError::InvalidSamlResponse("no proxy request ID in session".to_string())
    })?;

    let saml_response = form
        .saml_response
        .as_deref()
        .ok_or_else(|| AppError::InvalidSamlResponse("missing SAMLResponse".to_string()))?;
    let decoded = HttpPostBinding::decode(None, Some(saml_response), None)
        .map_err(|e| AppError::InvalidSamlResponse(e.to_string()))?;

    let descriptor = state
        .metadata
        .fetch_entity(university)
        .await
        .map_err(|e| AppError::MdqFetchFailed(e.to_string()))?;
    let certificates = descriptor
        .signing_certificates_der()
        .map_err(|e| AppError::MdqFetchFailed(e.to_string()))?;

    let config = state.config();
    let upstream = ResponseValidator::new(
        &config.entity_id,
        config.acs_url(),
        university,
        certificates,
    )
    .accept_request_id(proxy_request_id)
    .with_max_issue_delay(chrono::Duration::minutes(MAX_ISSUE_DELAY_MINUTES))
    .validate(&decoded.xml)
    .map_err(|e| AppError::InvalidSamlResponse(e.to_string()))?;

    let name_id = upstream.name_id().map_or_else(
        || NameId::new("unknown"),
        |name_id| NameId {
            name_qualifier: None,
            sp_name_qualifier: None,
            ..name_id.clone()
        },
    );
    let attributes = extract_attributes(&upstream);

    let mut authn_statement = AuthnStatement::new(AuthnContextClass::Unspecified);
    if let Some(class_ref) = upstream
        .authn_statement
        .as_ref()
        .and_then(|statement| statement.authn_context_class_ref.as_deref())
    {
        authn_statement = authn_statement.with_class_ref(class_ref);
    }

    let mut assertion = Assertion::new(&config.entity_id)
        .with_subject(
            Subject::new(name_id.clone()).with_confirmation(
                SubjectConfirmation::bearer().with_data(SubjectConfirmationData::for_request(
                    &session.original_request_id,
                    &session.sp_acs_url,
                )),
            ),
        )
        .with_conditions(
            Conditions::with_validity(ASSERTION_VALIDITY_MINUTES)
                .with_audience(&session.sp_entity_id),
        )
        .with_authn_statement(authn_statement);
    if let Some(statement) = attribute_statement(&attributes) {
        assertion = assertion.with_attribute_statement(statement);
    }

    let response_xml = SamlResponse::success(&config.entity_id)
        .in_response_to(&session.original_request_id)
        .with_destination(&session.sp_acs_url)
        .with_assertion(assertion)
        .to_signed_xml(&state.signer)
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(
        session_id,
        sp_entity_id = %session.sp_entity_id,
        university,
        name_id = %name_id.value,
        attribute_count = attributes.len(),
        "forwarding assertion to service provider"
    );

    let html = HttpPostBinding::encode_response(
        &response_xml,
        &session.sp_acs_url,
        session.relay_state.as_deref(),
    );
    Ok(Html(html).into_response())
}
