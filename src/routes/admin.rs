use std::convert::Infallible;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::Request,
    middleware::{self, Next},
    response::{Response, sse::Sse},
    routing::{get, post},
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::admin::{
        ActionResponse, AdminRoomSnapshot, CreateRoomResponse, NoQuery, RoomListResponse,
        StartSessionResponse,
    },
    error::AppError,
    services::{
        room_service, session_service,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints for creating and driving rooms.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/rooms", get(list_rooms).post(create_room))
        .route("/admin/rooms/{id}", get(get_room))
        .route("/admin/rooms/{id}/start", post(start_session))
        .route("/admin/rooms/{id}/skip", post(skip_question))
        .route("/admin/rooms/{id}/reset", post(reset_session))
        .route("/admin/rooms/{id}/events", get(admin_room_events))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

#[utoipa::path(
    post,
    path = "/admin/rooms",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup")),
    responses((status = 200, description = "Room created", body = CreateRoomResponse))
)]
/// Create a room and open it for participants.
pub async fn create_room(
    State(state): State<SharedState>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    Ok(Json(room_service::create_room(&state).await?))
}

#[utoipa::path(
    get,
    path = "/admin/rooms",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup")),
    responses((status = 200, description = "List known rooms", body = RoomListResponse))
)]
/// Retrieve all rooms known to the system.
pub async fn list_rooms(
    State(state): State<SharedState>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<RoomListResponse>, AppError> {
    Ok(Json(room_service::list_rooms(&state).await?))
}

#[utoipa::path(
    get,
    path = "/admin/rooms/{id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup"),
    ("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Full room state", body = AdminRoomSnapshot),
        (status = 404, description = "Room not found")
    )
)]
/// Retrieve one room with its session, roster, answers, and standings.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<AdminRoomSnapshot>, AppError> {
    Ok(Json(room_service::admin_room_snapshot(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/rooms/{id}/start",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup"),
    ("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Session started", body = StartSessionResponse),
        (status = 400, description = "No questions installed"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Session already started")
    )
)]
/// Start the session of an idle room.
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StartSessionResponse>, AppError> {
    Ok(Json(session_service::start_session(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/rooms/{id}/skip",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup"),
    ("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Question settled", body = ActionResponse),
        (status = 404, description = "Room not found"),
        (status = 409, description = "No question is live")
    )
)]
/// Settle the live question immediately instead of waiting for the clock.
pub async fn skip_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(session_service::skip_question(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/rooms/{id}/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup"),
    ("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Room reset to its lobby state", body = ActionResponse),
        (status = 404, description = "Room not found")
    )
)]
/// Reset a room back to its lobby state.
pub async fn reset_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(session_service::reset_session(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/admin/rooms/{id}/events",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token configured at startup"),
    ("id" = Uuid, Path, description = "Identifier of the room")),
    responses((status = 200, description = "Admin SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream room events plus live answer activity to admin frontends.
pub async fn admin_room_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    info!(room = %id, "new admin SSE connection");
    Ok(sse_service::room_stream(&state, id, StreamKind::Admin).await?)
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    if provided == state.admin_token() {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid admin token".into()))
    }
}
