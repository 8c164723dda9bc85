//! University selection.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;

use proxy_discovery::{EntityEntry, SEARCH_RESULT_LIMIT};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// University selection page template.
#[derive(Template)]
#[template(path = "discovery.html")]
pub struct DiscoveryTemplate {
    /// Session the selection belongs to.
    pub session_id: String,
}

impl IntoResponse for DiscoveryTemplate {
    fn into_response(self) -> Response {
        match self.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to render template");
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Query parameters for the selection page.
#[derive(Debug, Deserialize)]
pub struct DiscoveryParams {
    /// Session ID.
    pub session: String,
}

/// Selection form submission.
#[derive(Debug, Deserialize)]
pub struct DiscoveryForm {
    /// Session ID.
    pub session_id: String,
    /// Chosen university's entity ID.
    #[serde(default)]
    pub entity_id: String,
}

/// Query parameters for entity search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search text.
    #[serde(default)]
    pub q: String,
}

/// GET /discovery
pub async fn discovery_page(
    State(state): State<AppState>,
    Query(params): Query<DiscoveryParams>,
) -> AppResult<DiscoveryTemplate> {
    if state.sessions.get(&params.session).is_none() {
        return Err(AppError::session_not_found(params.session));
    }

    Ok(DiscoveryTemplate {
        session_id: params.session,
    })
}

/// POST /discovery
pub async fn discovery_submit(
    State(state): State<AppState>,
    Form(form): Form<DiscoveryForm>,
) -> AppResult<Redirect> {
    let entity_id = form.entity_id.trim();
    if entity_id.is_empty() {
        return Err(AppError::MissingUniversitySelection);
    }

    if !state.sessions.update_university(&form.session_id, entity_id) {
        return Err(AppError::session_not_found(form.session_id));
    }

    tracing::info!(
        session_id = %form.session_id,
        university = entity_id,
        "university selected"
    );
    Ok(Redirect::to(&format!(
        "/sp/initiate?session={}",
        urlencoding::encode(&form.session_id)
    )))
}

/// GET /api/entities/search
pub async fn search_entities(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<EntityEntry>> {
    Json(
        state
            .federation_index
            .search(&params.q, SEARCH_RESULT_LIMIT)
            .await,
    )
}
