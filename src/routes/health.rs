use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::{dto::health::HealthResponse, services::health_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "State tree is unreachable", body = HealthResponse)
    )
)]
/// Report backend health, probing the state tree on every call.
pub async fn healthcheck(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let status = health_service::health_status(&state).await;
    // Liveness probes key on the status code, not the body.
    let code = if status.store_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/healthcheck", get(healthcheck))
}
