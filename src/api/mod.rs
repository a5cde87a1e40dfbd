//! HTTP surface next to the WebSocket endpoint: health and API docs.

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "taskboard-hub", description = "Real-time task event distribution hub"),
    paths(handlers::system::health_handler),
    components(schemas(handlers::system::HealthResponse, crate::hub::HubStats)),
    tags((name = "System", description = "Service status"))
)]
pub struct ApiDoc;

/// Builds the router with every HTTP endpoint.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_health() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
