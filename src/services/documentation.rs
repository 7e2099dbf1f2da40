use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Rush Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::join_room,
        crate::routes::public::submit_answer,
        crate::routes::public::get_session,
        crate::routes::public::get_participants,
        crate::routes::public::get_leaderboard,
        crate::routes::public::room_events,
        crate::routes::admin::create_room,
        crate::routes::admin::list_rooms,
        crate::routes::admin::get_room,
        crate::routes::admin::start_session,
        crate::routes::admin::skip_question,
        crate::routes::admin::reset_session,
        crate::routes::admin::admin_room_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::public::JoinRequest,
            crate::dto::public::JoinResponse,
            crate::dto::public::SubmitAnswerRequest,
            crate::dto::public::SubmitAnswerResponse,
            crate::dto::public::ParticipantsResponse,
            crate::dto::public::LeaderboardResponse,
            crate::dto::common::SessionSnapshot,
            crate::dto::admin::CreateRoomResponse,
            crate::dto::admin::RoomListResponse,
            crate::dto::admin::AdminRoomSnapshot,
            crate::dto::admin::StartSessionResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SessionChangedEvent,
            crate::dto::sse::StandingsChangedEvent,
            crate::dto::sse::ParticipantJoinedEvent,
            crate::dto::sse::RoomResetEvent,
            crate::dto::sse::AnswerReceivedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Participant endpoints for joining rooms and answering"),
        (name = "admin", description = "Token-protected room and session management"),
    )
)]
pub struct ApiDoc;
