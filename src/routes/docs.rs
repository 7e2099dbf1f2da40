use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Path under which the raw OpenAPI document is served.
const OPENAPI_JSON: &str = "/api-doc/openapi.json";

/// Serve the Swagger UI backed by the generated OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let swagger: Router<SharedState> = SwaggerUi::new("/docs")
        .url(OPENAPI_JSON, ApiDoc::openapi())
        .into();

    swagger.with_state(state)
}
