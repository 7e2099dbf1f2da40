use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::sse::Sse,
    routing::{get, post},
};
use axum_valid::Valid;
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        admin::NoQuery,
        common::SessionSnapshot,
        public::{
            JoinRequest, JoinResponse, LeaderboardResponse, ParticipantsResponse,
            SubmitAnswerRequest, SubmitAnswerResponse,
        },
    },
    error::AppError,
    services::{
        leaderboard_service, participant_service, session_service,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

/// Participant-facing endpoints for joining rooms and playing.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{id}/join", post(join_room))
        .route("/rooms/{id}/answers", post(submit_answer))
        .route("/rooms/{id}/session", get(get_session))
        .route("/rooms/{id}/participants", get(get_participants))
        .route("/rooms/{id}/leaderboard", get(get_leaderboard))
        .route("/rooms/{id}/events", get(room_events))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/join",
    tag = "public",
    params(("id" = Uuid, Path, description = "Identifier of the room to join")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Joined the room", body = JoinResponse),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Session already started")
    )
)]
/// Join a room under a display name, before its session starts.
pub async fn join_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JoinRequest>>,
) -> Result<Json<JoinResponse>, AppError> {
    Ok(Json(
        participant_service::join_room(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/answers",
    tag = "public",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer acknowledged", body = SubmitAnswerResponse),
        (status = 404, description = "Room or participant not found"),
        (status = 409, description = "No live question accepts this answer")
    )
)]
/// Submit an answer for the question currently on the clock.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    Ok(Json(
        participant_service::submit_answer(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/session",
    tag = "public",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Current session state", body = SessionSnapshot),
        (status = 404, description = "Room not found")
    )
)]
/// Return the sanitized session state of a room.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let payload = session_service::session_snapshot(&state, id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/participants",
    tag = "public",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Current roster", body = ParticipantsResponse),
        (status = 404, description = "Room not found")
    )
)]
/// Return the roster of a room, ordered by join time.
pub async fn get_participants(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    let payload = participant_service::read_roster(&state, id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/leaderboard",
    tag = "public",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    responses(
        (status = 200, description = "Ranked standings", body = LeaderboardResponse),
        (status = 404, description = "Room not found")
    )
)]
/// Return the ranked standings of a room.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let payload = leaderboard_service::read_leaderboard(&state, id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/events",
    tag = "public",
    params(("id" = Uuid, Path, description = "Identifier of the room")),
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime room events to participant frontends.
pub async fn room_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    info!(room = %id, "new public SSE connection");
    Ok(sse_service::room_stream(&state, id, StreamKind::Public).await?)
}
