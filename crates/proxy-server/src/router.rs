//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{discovery, health, idp, slo, sp};
use crate::state::AppState;

/// Creates the application router.
///
/// | Method   | Path                    | Handler                          |
/// |----------|-------------------------|----------------------------------|
/// | GET      | `/saml/metadata`        | IdP metadata                     |
/// | GET/POST | `/saml/sso`             | SSO from SPs                     |
/// | GET/POST | `/saml/slo`             | Logout                           |
/// | GET      | `/sp/metadata`          | SP metadata                      |
/// | GET      | `/sp/initiate`          | Start the university leg         |
/// | POST     | `/sp/acs`               | University Response              |
/// | GET/POST | `/sp/slo`               | Logout                           |
/// | GET/POST | `/discovery`            | University selection             |
/// | GET      | `/api/entities/search`  | Entity search                    |
/// | GET      | `/health[/live,/ready]` | Health checks                    |
/// | GET      | `/static/*`             | Static assets                    |
pub fn app(state: AppState) -> Router {
    let idp_routes = Router::new()
        .route("/metadata", get(idp::metadata))
        .route("/sso", get(idp::sso_redirect).post(idp::sso_post))
        .route("/slo", get(slo::slo_redirect).post(slo::slo_post));

    let sp_routes = Router::new()
        .route("/metadata", get(sp::metadata))
        .route("/initiate", get(sp::initiate))
        .route("/acs", axum::routing::post(sp::assertion_consumer_service))
        .route("/slo", get(slo::slo_redirect).post(slo::slo_post));

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check));

    let cors = cors_layer(&state.config.cors_origins);
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .nest("/saml", idp_routes)
        .nest("/sp", sp_routes)
        .route(
            "/discovery",
            get(discovery::discovery_page).post(discovery::discovery_submit),
        )
        .route("/api/entities/search", get(discovery::search_entities))
        .merge(health_routes)
        .with_state(state)
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS configuration; `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
