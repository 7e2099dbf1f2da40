use serde::Serialize;
use utoipa::ToSchema;

/// Health summary returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Whether the state tree answered the health probe.
    pub store_reachable: bool,
    /// Number of rooms currently held in memory.
    pub rooms: usize,
}

impl HealthResponse {
    /// Health response for a reachable state tree.
    pub fn ok(rooms: usize) -> Self {
        Self {
            status: "ok".to_owned(),
            store_reachable: true,
            rooms,
        }
    }

    /// Health response when the state tree probe failed.
    pub fn degraded(rooms: usize) -> Self {
        Self {
            status: "degraded".to_owned(),
            store_reachable: false,
            rooms,
        }
    }
}
