use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the state tree and report it together with the room count.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.rooms().len();
    match state.tree().health_check().await {
        Ok(()) => HealthResponse::ok(rooms),
        Err(error) => {
            warn!(error = %error, "state tree health check failed");
            HealthResponse::degraded(rooms)
        }
    }
}
